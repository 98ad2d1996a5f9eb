use std::collections::HashMap;
use std::hash::BuildHasherDefault;

use crate::sketch_schemes::hashing::{ItemHash, NoHashHasher};
use crate::sketch_schemes::mash::MashSketcher;
use crate::sketch_schemes::{HashEntry, SketchScheme};
use crate::statistics::cardinality;

// pending multiplicities may grow to this many times the sketch size before
// entries that can no longer be admitted are dropped
const PENDING_SLACK: usize = 4;

/// Sketcher for noisy read sets: a hash only enters the bottom-k set once it
/// has been seen `min_cov` times, which keeps single-occurrence sequencing
/// errors out of the sketch.
#[derive(Clone, Debug)]
pub struct ReadsSketcher {
    sketch: MashSketcher,
    pending: HashMap<ItemHash, u32, BuildHasherDefault<NoHashHasher>>,
    min_cov: u32,
    total_kmers: u64,
    min_prune_at: usize,
    prune_at: usize,
}

impl ReadsSketcher {
    pub fn new(sketch: MashSketcher, min_cov: u32, size: usize) -> Self {
        let min_prune_at = size.saturating_mul(PENDING_SLACK).max(1024);
        ReadsSketcher {
            sketch,
            pending: HashMap::default(),
            min_cov: min_cov.max(1),
            total_kmers: 0,
            min_prune_at,
            prune_at: min_prune_at,
        }
    }

    pub fn push(&mut self, hash: ItemHash) {
        self.total_kmers += 1;
        if !self.sketch.accepts(hash) {
            return;
        }
        if self.sketch.contains(hash) {
            self.sketch.insert(hash, 1);
            return;
        }

        let seen = {
            let count = self.pending.entry(hash).or_insert(0);
            *count = count.saturating_add(1);
            *count
        };
        if seen >= self.min_cov {
            let was_full = self.sketch.is_full();
            self.pending.remove(&hash);
            self.sketch.insert(hash, seen);
            if !was_full && self.sketch.is_full() {
                // the sketch maximum now bounds what can still be admitted
                self.prune_at = self.min_prune_at;
            }
        }
        if self.pending.len() > self.prune_at {
            self.prune();
        }
    }

    fn prune(&mut self) {
        if let (true, Some(max_hash)) = (self.sketch.is_full(), self.sketch.max_hash()) {
            self.pending.retain(|hash, _| *hash <= max_hash);
        }
        // everything left may still be admitted, so back off rather than
        // rescanning on every push
        self.prune_at = self.min_prune_at.max(self.pending.len() * 2);
    }

    /// Number of distinct hashes still waiting to reach `min_cov`.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn into_sorted_vec(self) -> Vec<HashEntry> {
        self.sketch.into_sorted_vec()
    }
}

impl SketchScheme for ReadsSketcher {
    fn process(&mut self, seq: &[u8]) {
        self.sketch.add_bases(seq.len() as u64);
        let hasher = self.sketch.hasher();
        for hash in hasher.hashes(seq) {
            self.push(hash);
        }
    }

    fn total_bases_and_kmers(&self) -> (u64, u64) {
        let (bases, _) = self.sketch.total_bases_and_kmers();
        (bases, self.total_kmers)
    }

    /// Total k-mers seen divided by the distinct k-mer count estimated from
    /// the retained hashes. Only meaningful once the sketch is full.
    fn estimated_coverage(&self) -> Option<f64> {
        if !self.sketch.is_full() {
            return None;
        }
        let max_hash = self.sketch.max_hash()?;
        let genome_size = cardinality(self.sketch.len(), max_hash);
        if genome_size == 0 {
            return None;
        }
        Some(self.total_kmers as f64 / genome_size as f64)
    }

    fn finish(self: Box<Self>) -> Vec<HashEntry> {
        self.into_sorted_vec()
    }
}
