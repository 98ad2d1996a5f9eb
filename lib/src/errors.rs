use std::fmt;
use std::result::Result as StdResult;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SketchError {
    #[error("failed to load/read/write file: {0:?}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse the fasta/fastq file: {0}")]
    Needletail(#[from] needletail::errors::ParseError),
    #[error("bincode error: {0:?}")]
    Bincode(#[from] bincode::Error),
    #[error("could not start worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("not a sketch file (bad header)")]
    NotASketch,
    #[error("truncated sketch file (ended inside {0})")]
    Truncated(&'static str),
    #[error("unsupported sketch format version {0}")]
    UnsupportedVersion(u32),
    #[error("sketch has invalid parameters: {0}")]
    InvalidParams(String),
    #[error("corrupt sketch file: {0}")]
    CorruptSketch(String),
    #[error("malformed record in {input}: {source}")]
    Malformed {
        input: String,
        source: needletail::errors::ParseError,
    },
    #[error("no input could be sketched ({} failed)", .0.len())]
    NoUsableInput(Vec<UnitFailure>),
    #[error("Sketch error: {0}")]
    Message(String),
}

pub type SketchResult<T> = StdResult<T, SketchError>;

/// An input that was excluded from a sketch because it could not be opened
/// or decoded.
#[derive(Debug)]
pub struct UnitFailure {
    pub input: String,
    pub error: SketchError,
}

impl fmt::Display for UnitFailure {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}: {}", self.input, self.error)
    }
}

#[doc(hidden)]
#[macro_export]
macro_rules! bail {
    ($e:expr) => {
        return Err($crate::errors::SketchError::Message($e.to_owned()));
    };
    ($fmt:expr, $($arg:tt)*) => {
        return Err($crate::errors::SketchError::Message(format!($fmt, $($arg)*)))
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! format_err {
    ($($arg:tt)*) => { $crate::errors::SketchError::Message(format!($($arg)*)) }
}

#[doc(hidden)]
#[macro_export]
macro_rules! config_err {
    ($($arg:tt)*) => { $crate::errors::SketchError::Config(format!($($arg)*)) }
}
