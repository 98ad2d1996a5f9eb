use std::fs::{File, OpenOptions};
use std::io::{stdin, BufReader, BufWriter, Read, Write};
use std::path::Path;

use log::{debug, info, warn};
use needletail::parse_fastx_reader;
use needletail::parser::FastxReader;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

pub mod errors;
pub mod options;
pub mod serialization;
pub mod sketch_schemes;
pub mod statistics;

use crate::errors::{SketchError, SketchResult, UnitFailure};
use crate::serialization::{
    read_header, read_sketch, write_references, write_sketch, Reference, Sketch,
};
use crate::sketch_schemes::SketchParams;

pub use crate::options::SketchOptions;

// records read ahead and sketched in parallel at a time in individual mode
const RECORD_BATCH_SIZE: usize = 512;

/// (input index, record index) of a sketched unit
type UnitTag = (usize, usize);
type TaggedUnit = (UnitTag, Result<Reference, UnitFailure>);

/// A finished sketch together with the inputs that were left out of it.
#[derive(Debug)]
pub struct SketchOutcome {
    pub sketch: Sketch,
    pub failures: Vec<UnitFailure>,
}

enum UnitError {
    /// The unit is skipped and the rest of the run carries on.
    Unusable(SketchError),
    /// The run stops.
    Fatal(SketchError),
}

impl UnitError {
    fn into_inner(self) -> SketchError {
        match self {
            UnitError::Unusable(e) | UnitError::Fatal(e) => e,
        }
    }
}

fn open_input(input: &str) -> SketchResult<Box<dyn FastxReader>> {
    let reader: Box<dyn Read + Send> = if input == "-" {
        Box::new(stdin())
    } else {
        Box::new(File::open(&Path::new(input))?)
    };
    Ok(parse_fastx_reader(reader)?)
}

fn header_text(id: &[u8]) -> String {
    String::from_utf8_lossy(id).trim().to_string()
}

// first word is the name, the rest of the header the comment
fn split_header(id: &[u8]) -> (String, String) {
    let header = header_text(id);
    match header.find(char::is_whitespace) {
        Some(ix) => (
            header[..ix].to_string(),
            header[ix..].trim_start().to_string(),
        ),
        None => (header, String::new()),
    }
}

fn record_error(input: &str, consumed: usize, source: needletail::errors::ParseError) -> UnitError {
    if consumed == 0 {
        UnitError::Unusable(source.into())
    } else {
        UnitError::Fatal(SketchError::Malformed {
            input: input.to_string(),
            source,
        })
    }
}

fn no_records() -> UnitError {
    UnitError::Unusable(format_err!("no sequence records found"))
}

/// Sketches every record of `fastx` into one reference named `name`.
fn sketch_unit(
    fastx: &mut dyn FastxReader,
    name: &str,
    params: &SketchParams,
) -> Result<Reference, UnitError> {
    let mut sketcher = params.create_sketcher();
    let target_cov = params.target_coverage();
    let mut first_header = String::new();
    let mut n_records = 0;

    while let Some(record) = fastx.next() {
        let record = record.map_err(|e| record_error(name, n_records, e))?;
        if n_records == 0 {
            first_header = header_text(record.id());
        }
        n_records += 1;
        sketcher.process(&record.seq());

        if let (Some(target), Some(coverage)) = (target_cov, sketcher.estimated_coverage()) {
            if coverage >= target {
                info!(
                    "{}: reached target coverage {} after {} records, skipping the rest",
                    name, target, n_records
                );
                break;
            }
        }
    }
    if n_records == 0 {
        return Err(no_records());
    }

    if let Some(coverage) = sketcher.estimated_coverage() {
        info!("{}: estimated coverage {:.3}", name, coverage);
    }
    let comment = if n_records > 1 {
        format!("[{} seqs] {} [...]", n_records, first_header)
    } else {
        first_header
    };
    let totals = sketcher.total_bases_and_kmers();
    let entries = sketcher.finish();
    debug!(
        "{}: {} bases, {} k-mers, {} hashes kept",
        name,
        totals.0,
        totals.1,
        entries.len()
    );
    Ok(Reference::from_entries(
        name.to_string(),
        comment,
        totals,
        entries,
        params.keep_counts,
    ))
}

fn sketch_record(header: &[u8], seq: &[u8], params: &SketchParams) -> Reference {
    let (name, comment) = split_header(header);
    let mut sketcher = params.create_sketcher();
    sketcher.process(seq);
    let totals = sketcher.total_bases_and_kmers();
    Reference::from_entries(name, comment, totals, sketcher.finish(), params.keep_counts)
}

type OwnedRecord = (usize, Vec<u8>, Vec<u8>);

fn read_batch(
    fastx: &mut dyn FastxReader,
    input: &str,
    first_ix: usize,
) -> Result<Vec<OwnedRecord>, UnitError> {
    let mut batch = Vec::with_capacity(RECORD_BATCH_SIZE);
    while batch.len() < RECORD_BATCH_SIZE {
        let record = match fastx.next() {
            Some(record) => record.map_err(|e| record_error(input, first_ix + batch.len(), e))?,
            None => break,
        };
        batch.push((
            first_ix + batch.len(),
            record.id().to_vec(),
            record.seq().into_owned(),
        ));
    }
    if first_ix == 0 && batch.is_empty() {
        return Err(no_records());
    }
    Ok(batch)
}

// every input is handed to a worker of the pool; results keep input order
fn map_inputs<T, F>(pool: &ThreadPool, inputs: &[&str], unit: F) -> SketchResult<Vec<T>>
where
    T: Send,
    F: Fn(usize, &str) -> SketchResult<T> + Sync + Send,
{
    pool.install(|| {
        inputs
            .par_iter()
            .enumerate()
            .map(|(ix, input)| unit(ix, input))
            .collect()
    })
}

fn unusable(file_ix: usize, input: &str, error: SketchError) -> TaggedUnit {
    (
        (file_ix, 0),
        Err(UnitFailure {
            input: input.to_string(),
            error,
        }),
    )
}

// one unit per record of a single input; records are read in batches and each
// batch is sketched on the pool the caller is running on
fn sketch_file_records(
    file_ix: usize,
    input: &str,
    params: &SketchParams,
) -> SketchResult<Vec<TaggedUnit>> {
    let mut fastx = match open_input(input) {
        Ok(fastx) => fastx,
        Err(error) => return Ok(vec![unusable(file_ix, input, error)]),
    };

    let mut units: Vec<TaggedUnit> = Vec::new();
    loop {
        let batch = match read_batch(&mut *fastx, input, units.len()) {
            Ok(batch) => batch,
            Err(UnitError::Unusable(error)) => return Ok(vec![unusable(file_ix, input, error)]),
            Err(UnitError::Fatal(error)) => return Err(error),
        };
        let last_batch = batch.len() < RECORD_BATCH_SIZE;

        let sketched: Vec<TaggedUnit> = batch
            .into_par_iter()
            .map(|(record_ix, header, seq)| {
                ((file_ix, record_ix), Ok(sketch_record(&header, &seq, params)))
            })
            .collect();
        units.extend(sketched);
        if last_batch {
            break;
        }
    }
    debug!("{}: {} records sketched", input, units.len());
    Ok(units)
}

fn sketch_records(
    pool: &ThreadPool,
    inputs: &[&str],
    params: &SketchParams,
) -> SketchResult<Vec<TaggedUnit>> {
    let per_input = map_inputs(pool, inputs, |ix, input| {
        sketch_file_records(ix, input, params)
    })?;
    Ok(per_input.into_iter().flatten().collect())
}

// one unit per input file, each worker reading its own file
fn sketch_inputs(
    pool: &ThreadPool,
    inputs: &[&str],
    params: &SketchParams,
) -> SketchResult<Vec<TaggedUnit>> {
    map_inputs(pool, inputs, |ix, input| {
        let unit = open_input(input)
            .map_err(UnitError::Unusable)
            .and_then(|mut fastx| sketch_unit(&mut *fastx, input, params));
        match unit {
            Ok(reference) => Ok(((ix, 0), Ok(reference))),
            Err(UnitError::Unusable(error)) => Ok(unusable(ix, input, error)),
            Err(UnitError::Fatal(error)) => Err(error),
        }
    })
}

/// Sketches `inputs` (paths, or `-` for standard input) with a pool of
/// `threads` workers.
///
/// Inputs that can't be opened or don't start with a readable record are left
/// out and reported in the outcome; a malformed record further into an input
/// stops the whole run. References come back in input order regardless of
/// the number of threads.
pub fn sketch_files(
    inputs: &[&str],
    params: &SketchParams,
    threads: usize,
) -> SketchResult<SketchOutcome> {
    params.validate()?;
    if threads == 0 {
        return Err(config_err!("thread count must be at least 1"));
    }
    if inputs.is_empty() {
        return Err(config_err!("no inputs to sketch"));
    }
    if inputs.iter().filter(|input| **input == "-").count() > 1 {
        return Err(config_err!("standard input (-) can only be read once"));
    }

    let pool = ThreadPoolBuilder::new().num_threads(threads).build()?;
    let mut units = if params.is_individual() {
        sketch_records(&pool, inputs, params)?
    } else {
        sketch_inputs(&pool, inputs, params)?
    };
    units.sort_by_key(|(tag, _)| *tag);

    let mut sketch = Sketch::new(params.clone());
    let mut failures = Vec::new();
    for (_, unit) in units {
        match unit {
            Ok(reference) => sketch.references.push(reference),
            Err(failure) => {
                warn!("Skipping {}", failure);
                failures.push(failure);
            }
        }
    }
    if sketch.is_empty() {
        return Err(SketchError::NoUsableInput(failures));
    }
    Ok(SketchOutcome { sketch, failures })
}

/// Sketches an already opened FASTA/FASTQ stream as a single reference.
pub fn sketch_stream<'a>(
    reader: Box<dyn Read + Send + 'a>,
    name: &str,
    params: &SketchParams,
) -> SketchResult<Reference> {
    let mut fastx = parse_fastx_reader(reader)?;
    sketch_unit(&mut *fastx, name, params).map_err(UnitError::into_inner)
}

pub fn open_sketch_file(filename: &str) -> SketchResult<Sketch> {
    let file = File::open(filename).map_err(|e| format_err!("Error opening {}: {}", filename, e))?;
    read_sketch(&mut BufReader::new(file))
}

pub fn write_sketch_file(filename: &str, sketch: &Sketch) -> SketchResult<()> {
    let file =
        File::create(filename).map_err(|e| format_err!("Error creating {}: {}", filename, e))?;
    write_sketch(&mut BufWriter::new(file), sketch)
}

/// Adds references to the end of an existing sketch file, which must have
/// been written with exactly the same parameters.
pub fn append_sketch_file(
    filename: &str,
    params: &SketchParams,
    references: &[Reference],
) -> SketchResult<()> {
    let existing = {
        let file = File::open(filename)?;
        read_header(&mut BufReader::new(file))?
    };
    if existing != *params {
        bail!("{} was sketched with different parameters", filename);
    }
    let file = OpenOptions::new().append(true).open(filename)?;
    let mut writer = BufWriter::new(file);
    write_references(&mut writer, references)?;
    writer.flush()?;
    Ok(())
}
