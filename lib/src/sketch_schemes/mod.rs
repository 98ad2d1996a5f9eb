mod hashing;
pub mod kmers;
pub mod mash;
pub mod reads;

use serde::{Deserialize, Serialize};

use crate::errors::{SketchError, SketchResult};
pub use hashing::{hash_kmer, ItemHash, KmerHasher};
pub use kmers::Alphabet;

/// A retained hash and how many times it was observed.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Hash, Serialize)]
pub struct HashEntry {
    pub hash: ItemHash,
    pub count: u32,
}

pub trait SketchScheme: Send {
    fn process(&mut self, seq: &[u8]);
    fn total_bases_and_kmers(&self) -> (u64, u64);

    /// Estimated sequencing depth of the data seen so far, if the scheme
    /// tracks one.
    fn estimated_coverage(&self) -> Option<f64> {
        None
    }

    /// Seals the sketch and returns its entries sorted by hash.
    fn finish(self: Box<Self>) -> Vec<HashEntry>;
}

/// What makes up one sketched unit.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
pub enum SketchMode {
    /// One reference per input file.
    Concatenated,
    /// One reference per sequence record.
    Individual,
    /// One reference per input file of noisy reads; hashes need `min_cov`
    /// observations and a file stops being read at `target_cov`.
    Reads {
        min_cov: u32,
        target_cov: Option<f64>,
    },
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct SketchParams {
    pub kmer_length: u8,
    pub sketch_size: usize,
    pub hash_seed: u64,
    pub alphabet: Alphabet,
    pub canonical: bool,
    pub mode: SketchMode,
    pub warning: f64,
    pub keep_counts: bool,
}

impl Default for SketchParams {
    fn default() -> Self {
        SketchParams {
            kmer_length: 21,
            sketch_size: 1000,
            hash_seed: 42,
            alphabet: Alphabet::Nucleotide,
            canonical: true,
            mode: SketchMode::Concatenated,
            warning: 0.01,
            keep_counts: false,
        }
    }
}

impl SketchParams {
    pub fn k(&self) -> u8 {
        self.kmer_length
    }

    pub fn alphabet_size(&self) -> u32 {
        self.alphabet.size()
    }

    /// Number of distinct k-mers possible for this alphabet and k.
    pub fn kmer_space(&self) -> f64 {
        f64::from(self.alphabet_size()).powi(i32::from(self.kmer_length))
    }

    /// Sequence length above which random k-mer matches become more likely
    /// than `warning`.
    pub fn length_threshold(&self) -> f64 {
        self.warning * self.kmer_space() / (1. - self.warning)
    }

    pub fn is_reads(&self) -> bool {
        matches!(self.mode, SketchMode::Reads { .. })
    }

    pub fn is_individual(&self) -> bool {
        self.mode == SketchMode::Individual
    }

    pub fn target_coverage(&self) -> Option<f64> {
        match self.mode {
            SketchMode::Reads { target_cov, .. } => target_cov,
            _ => None,
        }
    }

    pub fn hasher(&self) -> KmerHasher {
        KmerHasher {
            kmer_length: self.kmer_length,
            alphabet: self.alphabet,
            canonical: self.canonical,
            seed: self.hash_seed,
        }
    }

    pub fn create_sketcher(&self) -> Box<dyn SketchScheme> {
        let sketcher = mash::MashSketcher::new(self.sketch_size, self.hasher());
        match self.mode {
            SketchMode::Reads { min_cov, .. } => Box::new(reads::ReadsSketcher::new(
                sketcher,
                min_cov,
                self.sketch_size,
            )),
            SketchMode::Concatenated | SketchMode::Individual => Box::new(sketcher),
        }
    }

    /// Checks the parameters are internally consistent.
    pub fn validate(&self) -> SketchResult<()> {
        let invalid = |msg: String| Err(SketchError::InvalidParams(msg));
        if self.kmer_length == 0 {
            return invalid("k-mer size must be positive".to_string());
        }
        let max_k = self.alphabet.max_kmer_length();
        if self.kmer_length > max_k {
            return invalid(format!(
                "k-mer size {} is larger than the maximum of {} for {:?}",
                self.kmer_length, max_k, self.alphabet
            ));
        }
        if self.sketch_size == 0 {
            return invalid("sketch size must be positive".to_string());
        }
        if !(0. ..1.).contains(&self.warning) {
            return invalid(format!(
                "warning probability {} is not in [0, 1)",
                self.warning
            ));
        }
        if self.canonical && self.alphabet == Alphabet::Protein {
            return invalid("protein sketches can not be canonical".to_string());
        }
        if let SketchMode::Reads {
            min_cov,
            target_cov,
        } = self.mode
        {
            if min_cov == 0 {
                return invalid("minimum coverage must be at least 1".to_string());
            }
            if let Some(target) = target_cov {
                if !(target > 0.) {
                    return invalid(format!("target coverage {} must be positive", target));
                }
            }
        }
        Ok(())
    }

    /// Return any sketch parameter difference that would make comparisons
    /// between sketches generated by these parameter sets not work.
    pub fn check_compatibility(&self, other: &SketchParams) -> Option<(&str, String, String)> {
        if self.k() != other.k() {
            return Some(("k", self.k().to_string(), other.k().to_string()));
        }
        if self.alphabet != other.alphabet {
            return Some((
                "alphabet",
                self.alphabet.symbols().to_string(),
                other.alphabet.symbols().to_string(),
            ));
        }
        if self.canonical != other.canonical {
            return Some((
                "canonical",
                self.canonical.to_string(),
                other.canonical.to_string(),
            ));
        }
        if self.hash_seed != other.hash_seed {
            return Some((
                "hash seed",
                self.hash_seed.to_string(),
                other.hash_seed.to_string(),
            ));
        }

        None
    }
}
