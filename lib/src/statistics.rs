use std::fmt;

use serde::Serialize;

use crate::serialization::{Reference, Sketch};
use crate::sketch_schemes::{ItemHash, SketchParams};

/// Estimates the number of distinct k-mers behind a bottom-k sketch holding
/// `n_hashes` hashes whose largest value is `max_hash`.
pub fn cardinality(n_hashes: usize, max_hash: ItemHash) -> u64 {
    // fast and simple k-minimum value estimate
    // https://research.neustar.biz/2012/07/09/sketch-of-the-day-k-minimum-values/
    if n_hashes == 0 {
        return 0;
    }
    if max_hash == 0 {
        return n_hashes as u64;
    }
    // a lone hash still bounds the k-mer count; n - 1 would make it zero
    let n_hashes = n_hashes.max(2);
    ((n_hashes - 1) as f64 / (max_hash as f64 / u64::MAX as f64)) as u64
}

pub fn reference_cardinality(reference: &Reference) -> u64 {
    match reference.hashes.last() {
        Some(max_hash) => cardinality(reference.hashes.len(), *max_hash),
        None => 0,
    }
}

/// Probability that a random k-mer occurs by chance in a sequence of
/// `length`.
pub fn random_kmer_chance(length: u64, params: &SketchParams) -> f64 {
    if length == 0 {
        return 0.;
    }
    1. / (params.kmer_space() / length as f64 + 1.)
}

/// Smallest k keeping a sequence of `length` under the warning probability.
pub fn min_kmer_size(length: u64, params: &SketchParams) -> u8 {
    let warning = params.warning;
    let k = (length as f64 * (1. - warning) / warning).ln()
        / f64::from(params.alphabet_size()).ln();
    k.ceil().max(1.).min(f64::from(u8::MAX)) as u8
}

/// Summary of the references that are too long for the k-mer size used.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct KmerSizeWarning {
    pub name: String,
    pub length: u64,
    pub random_chance: f64,
    pub min_kmer_size: u8,
    pub warning_count: usize,
    pub kmer_length: u8,
    pub warning: f64,
}

impl fmt::Display for KmerSizeWarning {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "For the k-mer size used ({}), the random match probability ({}) is above the \
             specified warning threshold ({}) for the sequence \"{}\" of size {}",
            self.kmer_length, self.random_chance, self.warning, self.name, self.length
        )?;
        if self.warning_count > 1 {
            write!(f, " (and {} others)", self.warning_count - 1)?;
        }
        write!(
            f,
            ". Distances to this sequence may be underestimated as a result. To meet the \
             threshold of {}, a k-mer size of at least {} is required.",
            self.warning, self.min_kmer_size
        )
    }
}

/// Flags references long enough that random k-mer matches are more likely
/// than the sketch's warning probability, reporting the longest one.
///
/// Read sketches are never flagged (coverage filtering already accounts for
/// their size) and a warning probability of 0 disables the check.
pub fn kmer_size_warning(sketch: &Sketch) -> Option<KmerSizeWarning> {
    let params = &sketch.params;
    if params.is_reads() || params.warning <= 0. {
        return None;
    }
    let threshold = params.length_threshold();

    let (longest, warning_count) = sketch
        .references
        .iter()
        .filter(|reference| reference.length as f64 > threshold)
        .fold(
            (None, 0),
            |(longest, count): (Option<&Reference>, usize), reference| {
                let longest = match longest {
                    Some(l) if l.length >= reference.length => Some(l),
                    _ => Some(reference),
                };
                (longest, count + 1)
            },
        );

    longest.map(|reference| KmerSizeWarning {
        name: reference.name.clone(),
        length: reference.length,
        random_chance: random_kmer_chance(reference.length, params),
        min_kmer_size: min_kmer_size(reference.length, params),
        warning_count,
        kmer_length: params.kmer_length,
        warning: params.warning,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sketch_schemes::SketchMode;

    fn reference(name: &str, length: u64) -> Reference {
        Reference {
            name: name.to_string(),
            comment: String::new(),
            length,
            num_valid_kmers: length,
            hashes: vec![],
            counts: None,
        }
    }

    fn small_k_sketch(lengths: &[u64]) -> Sketch {
        Sketch {
            params: SketchParams {
                kmer_length: 2,
                warning: 0.01,
                ..Default::default()
            },
            references: lengths
                .iter()
                .enumerate()
                .map(|(ix, l)| reference(&format!("seq{}", ix), *l))
                .collect(),
        }
    }

    #[test]
    fn test_cardinality() {
        assert_eq!(cardinality(0, 10), 0);
        assert_eq!(cardinality(3, 0), 3);
        assert_eq!(cardinality(2, u64::MAX / 2), 2);
        assert_eq!(cardinality(1, u64::MAX / 4), 4);
        assert_eq!(cardinality(1, u64::MAX), 1);
        assert_eq!(cardinality(101, u64::MAX / 10), 1000);
    }

    #[test]
    fn test_small_k_is_flagged() {
        let sketch = small_k_sketch(&[100]);
        let warning = kmer_size_warning(&sketch).unwrap();
        assert_eq!(warning.name, "seq0");
        assert_eq!(warning.warning_count, 1);
        assert!(warning.min_kmer_size > 2);
        // ceil(ln(100 * 0.99 / 0.01) / ln(4))
        assert_eq!(warning.min_kmer_size, 7);
        assert!((warning.random_chance - 1. / (16. / 100. + 1.)).abs() < 1e-12);
    }

    #[test]
    fn test_longest_reference_is_reported() {
        let sketch = small_k_sketch(&[0, 50, 400, 400, 20]);
        let warning = kmer_size_warning(&sketch).unwrap();
        assert_eq!(warning.name, "seq2");
        assert_eq!(warning.length, 400);
        assert_eq!(warning.warning_count, 4);
        assert!(warning.to_string().contains("(and 3 others)"));
    }

    #[test]
    fn test_no_warning_for_large_k() {
        let mut sketch = small_k_sketch(&[1_000_000]);
        sketch.params.kmer_length = 21;
        assert_eq!(kmer_size_warning(&sketch), None);
    }

    #[test]
    fn test_reads_and_disabled_warning() {
        let mut sketch = small_k_sketch(&[1_000]);
        sketch.params.mode = SketchMode::Reads {
            min_cov: 2,
            target_cov: None,
        };
        assert_eq!(kmer_size_warning(&sketch), None);

        let mut sketch = small_k_sketch(&[1_000]);
        sketch.params.warning = 0.;
        assert_eq!(kmer_size_warning(&sketch), None);
    }

    #[test]
    fn test_min_kmer_size_meets_threshold() {
        let params = SketchParams::default();
        for length in &[1_000u64, 5_000_000, 3_000_000_000] {
            let k = min_kmer_size(*length, &params);
            let adequate = SketchParams {
                kmer_length: k,
                ..Default::default()
            };
            assert!(*length as f64 <= adequate.length_threshold());
            let too_small = SketchParams {
                kmer_length: k - 1,
                ..Default::default()
            };
            assert!(*length as f64 > too_small.length_threshold());
        }
    }
}
