use std::io::{self, Read, Write};

use byteorder::{ByteOrder, LittleEndian, ReadBytesExt, WriteBytesExt};
use serde::{Deserialize, Serialize};

use crate::bail;
use crate::errors::{SketchError, SketchResult};
use crate::sketch_schemes::{HashEntry, ItemHash, SketchParams};
use crate::statistics::{kmer_size_warning, min_kmer_size, random_kmer_chance, KmerSizeWarning};

pub const SKETCH_EXT: &str = ".ksk";
pub const SKETCH_MAGIC: &[u8; 8] = b"KSKETCH\0";
pub const FORMAT_VERSION: u32 = 1;

/// One sketched unit: a whole file or a single sequence.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Reference {
    pub name: String,
    pub comment: String,
    pub length: u64,
    pub num_valid_kmers: u64,
    pub hashes: Vec<ItemHash>,
    pub counts: Option<Vec<u32>>,
}

impl Reference {
    pub fn from_entries(
        name: String,
        comment: String,
        (length, num_valid_kmers): (u64, u64),
        entries: Vec<HashEntry>,
        keep_counts: bool,
    ) -> Self {
        let counts = if keep_counts {
            Some(entries.iter().map(|e| e.count).collect())
        } else {
            None
        };
        Reference {
            name,
            comment,
            length,
            num_valid_kmers,
            hashes: entries.into_iter().map(|e| e.hash).collect(),
            counts,
        }
    }

    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }

    /// The hashes paired with their counts (1 when counts weren't kept).
    pub fn entries(&self) -> Vec<HashEntry> {
        match &self.counts {
            Some(counts) => self
                .hashes
                .iter()
                .zip(counts)
                .map(|(hash, count)| HashEntry {
                    hash: *hash,
                    count: *count,
                })
                .collect(),
            None => self
                .hashes
                .iter()
                .map(|hash| HashEntry {
                    hash: *hash,
                    count: 1,
                })
                .collect(),
        }
    }

    fn check(&self) -> SketchResult<()> {
        if self.hashes.windows(2).any(|w| w[0] >= w[1]) {
            return Err(SketchError::CorruptSketch(format!(
                "hashes of {} are not strictly ascending",
                self.name
            )));
        }
        if let Some(counts) = &self.counts {
            if counts.len() != self.hashes.len() {
                return Err(SketchError::CorruptSketch(format!(
                    "{} has {} hashes but {} counts",
                    self.name,
                    self.hashes.len(),
                    counts.len()
                )));
            }
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Sketch {
    pub params: SketchParams,
    pub references: Vec<Reference>,
}

impl Sketch {
    pub fn new(params: SketchParams) -> Self {
        Sketch {
            params,
            references: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.references.len()
    }

    pub fn is_empty(&self) -> bool {
        self.references.is_empty()
    }

    pub fn reference(&self, ix: usize) -> Option<&Reference> {
        self.references.get(ix)
    }

    pub fn random_kmer_chance(&self, ix: usize) -> Option<f64> {
        self.reference(ix)
            .map(|r| random_kmer_chance(r.length, &self.params))
    }

    pub fn min_kmer_size(&self, ix: usize) -> Option<u8> {
        self.reference(ix).map(|r| min_kmer_size(r.length, &self.params))
    }

    pub fn kmer_size_warning(&self) -> Option<KmerSizeWarning> {
        kmer_size_warning(self)
    }

    /// Appends the references of `other`, which must have been built with
    /// parameters producing comparable hashes.
    pub fn merge(&mut self, other: Sketch) -> SketchResult<()> {
        if let Some((name, v1, v2)) = self.params.check_compatibility(&other.params) {
            let first = other.references.first().map_or("", |r| r.name.as_str());
            bail!(
                "Sketch {} has {} {}, but working value is {}",
                first,
                name,
                v2,
                v1,
            );
        }
        self.references.extend(other.references);
        Ok(())
    }
}

pub fn write_header(file: &mut dyn Write, params: &SketchParams) -> SketchResult<()> {
    let encoded = bincode::serialize(params)?;
    file.write_all(SKETCH_MAGIC)?;
    file.write_u32::<LittleEndian>(FORMAT_VERSION)?;
    file.write_u32::<LittleEndian>(encoded.len() as u32)?;
    file.write_all(&encoded)?;
    Ok(())
}

/// References are length-prefixed and the list has no count, so more can be
/// appended to an existing file later.
pub fn write_references(file: &mut dyn Write, references: &[Reference]) -> SketchResult<()> {
    for reference in references {
        let encoded = bincode::serialize(reference)?;
        file.write_u64::<LittleEndian>(encoded.len() as u64)?;
        file.write_all(&encoded)?;
    }
    Ok(())
}

pub fn write_sketch(file: &mut dyn Write, sketch: &Sketch) -> SketchResult<()> {
    write_header(file, &sketch.params)?;
    write_references(file, &sketch.references)?;
    file.flush()?;
    Ok(())
}

// like `read_exact`, but reports how much was read before EOF
fn read_full(file: &mut dyn Read, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match file.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

fn eof_as_truncated(section: &'static str) -> impl Fn(io::Error) -> SketchError {
    move |e| {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            SketchError::Truncated(section)
        } else {
            SketchError::Io(e)
        }
    }
}

fn read_section(file: &mut dyn Read, len: u64, section: &'static str) -> SketchResult<Vec<u8>> {
    let mut buf = Vec::new();
    (&mut *file).take(len).read_to_end(&mut buf)?;
    if (buf.len() as u64) < len {
        return Err(SketchError::Truncated(section));
    }
    Ok(buf)
}

/// Reads and validates the magic, version and parameters of a sketch file.
pub fn read_header(file: &mut dyn Read) -> SketchResult<SketchParams> {
    let mut magic = [0u8; 8];
    let n = read_full(file, &mut magic)?;
    if n == 0 || magic[..n] != SKETCH_MAGIC[..n] {
        return Err(SketchError::NotASketch);
    }
    if n < magic.len() {
        return Err(SketchError::Truncated("header"));
    }

    let version = file
        .read_u32::<LittleEndian>()
        .map_err(eof_as_truncated("header"))?;
    if version != FORMAT_VERSION {
        return Err(SketchError::UnsupportedVersion(version));
    }

    let params_len = file
        .read_u32::<LittleEndian>()
        .map_err(eof_as_truncated("parameters"))?;
    let encoded = read_section(file, u64::from(params_len), "parameters")?;
    let params: SketchParams = bincode::deserialize(&encoded)
        .map_err(|e| SketchError::CorruptSketch(format!("unreadable parameters: {}", e)))?;
    params.validate()?;
    Ok(params)
}

pub fn read_references(file: &mut dyn Read) -> SketchResult<Vec<Reference>> {
    let mut references = Vec::new();
    loop {
        let mut len_buf = [0u8; 8];
        match read_full(file, &mut len_buf)? {
            0 => break,
            8 => (),
            _ => return Err(SketchError::Truncated("reference list")),
        }
        let encoded = read_section(file, LittleEndian::read_u64(&len_buf), "reference")?;
        let reference: Reference = bincode::deserialize(&encoded).map_err(|e| {
            SketchError::CorruptSketch(format!(
                "unreadable reference {}: {}",
                references.len() + 1,
                e
            ))
        })?;
        reference.check()?;
        references.push(reference);
    }
    Ok(references)
}

pub fn read_sketch(file: &mut dyn Read) -> SketchResult<Sketch> {
    let params = read_header(file)?;
    let references = read_references(file)?;
    Ok(Sketch { params, references })
}
