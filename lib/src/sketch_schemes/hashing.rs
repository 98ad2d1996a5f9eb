use std::hash::Hasher;

use murmurhash3::murmurhash3_x64_128;

use crate::sketch_schemes::kmers::{Alphabet, Kmers};

pub type ItemHash = u64;

/// Hashes a packed k-mer. The encoding is fed as little-endian bytes so the
/// value is the same on every platform.
#[inline]
pub fn hash_kmer(kmer: u64, seed: u64) -> ItemHash {
    murmurhash3_x64_128(&kmer.to_le_bytes(), seed).0
}

/// Everything needed to turn a sequence into a stream of k-mer hashes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct KmerHasher {
    pub kmer_length: u8,
    pub alphabet: Alphabet,
    pub canonical: bool,
    pub seed: u64,
}

impl KmerHasher {
    pub fn hashes<'a>(&self, seq: &'a [u8]) -> impl Iterator<Item = ItemHash> + 'a {
        let seed = self.seed;
        Kmers::new(seq, self.kmer_length, self.alphabet, self.canonical)
            .map(move |(_, kmer)| hash_kmer(kmer, seed))
    }
}

/// If we're using a `HashMap` where the keys themselves are hashes, it's
/// a little silly to re-hash them. That's where the `NoHashHasher` comes in.
#[derive(Default)]
pub struct NoHashHasher(u64);

impl Hasher for NoHashHasher {
    #[inline]
    fn write(&mut self, bytes: &[u8]) {
        for byte in bytes {
            self.0 = (self.0 << 8) | u64::from(*byte);
        }
    }

    #[inline]
    fn write_u64(&mut self, i: u64) {
        self.0 = i;
    }

    fn finish(&self) -> u64 {
        self.0
    }
}
