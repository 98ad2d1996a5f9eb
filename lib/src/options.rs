use crate::config_err;
use crate::errors::{SketchError, SketchResult};
use crate::sketch_schemes::{Alphabet, SketchMode, SketchParams};

pub const DEFAULT_KMER_LENGTH: u8 = 21;
pub const DEFAULT_PROTEIN_KMER_LENGTH: u8 = 9;

/// User-facing sketching options, resolved into `SketchParams` before any
/// input is read.
#[derive(Clone, Debug, PartialEq)]
pub struct SketchOptions {
    /// Defaults by alphabet when not given.
    pub kmer_length: Option<u8>,
    pub sketch_size: usize,
    pub individual: bool,
    pub noncanonical: bool,
    pub reads: bool,
    pub min_cov: Option<u32>,
    pub target_cov: Option<f64>,
    pub warning: f64,
    pub protein: bool,
    pub hash_seed: u64,
    pub keep_counts: bool,
    pub threads: usize,
}

impl Default for SketchOptions {
    fn default() -> Self {
        SketchOptions {
            kmer_length: None,
            sketch_size: 1000,
            individual: false,
            noncanonical: false,
            reads: false,
            min_cov: None,
            target_cov: None,
            warning: 0.01,
            protein: false,
            hash_seed: 42,
            keep_counts: false,
            threads: 1,
        }
    }
}

impl SketchOptions {
    /// Read mode is implied by either coverage option.
    pub fn is_reads(&self) -> bool {
        self.reads || self.min_cov.is_some() || self.target_cov.is_some()
    }

    pub fn threads(&self) -> SketchResult<usize> {
        if self.threads == 0 {
            return Err(config_err!("thread count must be at least 1"));
        }
        Ok(self.threads)
    }

    pub fn to_params(&self) -> SketchResult<SketchParams> {
        self.threads()?;

        let mode = if self.is_reads() {
            if self.individual {
                return Err(config_err!(
                    "read sets can not be sketched per sequence (individual mode)"
                ));
            }
            SketchMode::Reads {
                min_cov: self.min_cov.unwrap_or(1),
                target_cov: self.target_cov,
            }
        } else if self.individual {
            SketchMode::Individual
        } else {
            SketchMode::Concatenated
        };

        let (alphabet, default_k) = if self.protein {
            (Alphabet::Protein, DEFAULT_PROTEIN_KMER_LENGTH)
        } else {
            (Alphabet::Nucleotide, DEFAULT_KMER_LENGTH)
        };

        let params = SketchParams {
            kmer_length: self.kmer_length.unwrap_or(default_k),
            sketch_size: self.sketch_size,
            hash_seed: self.hash_seed,
            alphabet,
            canonical: !(self.noncanonical || self.protein),
            mode,
            warning: self.warning,
            keep_counts: self.keep_counts,
        };
        params.validate().map_err(|e| match e {
            SketchError::InvalidParams(msg) => SketchError::Config(msg),
            e => e,
        })?;
        Ok(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_error(options: SketchOptions) -> String {
        match options.to_params() {
            Err(SketchError::Config(msg)) => msg,
            other => panic!("expected a configuration error, got {:?}", other),
        }
    }

    #[test]
    fn test_defaults() {
        let params = SketchOptions::default().to_params().unwrap();
        assert_eq!(params, SketchParams::default());
    }

    #[test]
    fn test_coverage_options_force_reads() {
        let params = SketchOptions {
            min_cov: Some(3),
            ..Default::default()
        }
        .to_params()
        .unwrap();
        assert_eq!(
            params.mode,
            SketchMode::Reads {
                min_cov: 3,
                target_cov: None
            }
        );

        let params = SketchOptions {
            target_cov: Some(10.),
            ..Default::default()
        }
        .to_params()
        .unwrap();
        assert_eq!(params.target_coverage(), Some(10.));
        assert!(params.is_reads());

        let params = SketchOptions {
            reads: true,
            ..Default::default()
        }
        .to_params()
        .unwrap();
        assert_eq!(
            params.mode,
            SketchMode::Reads {
                min_cov: 1,
                target_cov: None
            }
        );
    }

    #[test]
    fn test_reads_and_individual_conflict() {
        let msg = config_error(SketchOptions {
            min_cov: Some(2),
            individual: true,
            ..Default::default()
        });
        assert!(msg.contains("individual"));
    }

    #[test]
    fn test_protein() {
        let params = SketchOptions {
            protein: true,
            ..Default::default()
        }
        .to_params()
        .unwrap();
        assert_eq!(params.alphabet, Alphabet::Protein);
        assert_eq!(params.kmer_length, DEFAULT_PROTEIN_KMER_LENGTH);
        assert!(!params.canonical);

        config_error(SketchOptions {
            protein: true,
            kmer_length: Some(13),
            ..Default::default()
        });
    }

    #[test]
    fn test_invalid_options() {
        config_error(SketchOptions {
            threads: 0,
            ..Default::default()
        });
        config_error(SketchOptions {
            kmer_length: Some(33),
            ..Default::default()
        });
        config_error(SketchOptions {
            sketch_size: 0,
            ..Default::default()
        });
        config_error(SketchOptions {
            min_cov: Some(0),
            ..Default::default()
        });
    }

    #[test]
    fn test_noncanonical() {
        let params = SketchOptions {
            noncanonical: true,
            kmer_length: Some(15),
            ..Default::default()
        }
        .to_params()
        .unwrap();
        assert!(!params.canonical);
        assert_eq!(params.k(), 15);
    }
}
