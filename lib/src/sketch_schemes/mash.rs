use std::collections::{BinaryHeap, HashMap};
use std::hash::BuildHasherDefault;

use crate::sketch_schemes::hashing::{ItemHash, KmerHasher, NoHashHasher};
use crate::sketch_schemes::{HashEntry, SketchScheme};

/// Keeps the `size` smallest distinct hashes seen, with an occurrence count
/// for each one.
#[derive(Clone, Debug)]
pub struct MashSketcher {
    hashes: BinaryHeap<ItemHash>,
    counts: HashMap<ItemHash, u32, BuildHasherDefault<NoHashHasher>>,
    hasher: KmerHasher,
    total_kmers: u64,
    total_bases: u64,
    size: usize,
}

impl MashSketcher {
    pub fn new(size: usize, hasher: KmerHasher) -> Self {
        MashSketcher {
            hashes: BinaryHeap::with_capacity(size + 1),
            counts: HashMap::with_capacity_and_hasher(size + 1, BuildHasherDefault::default()),
            hasher,
            total_kmers: 0,
            total_bases: 0,
            size,
        }
    }

    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.hashes.len() >= self.size
    }

    pub fn max_hash(&self) -> Option<ItemHash> {
        self.hashes.peek().copied()
    }

    pub fn contains(&self, hash: ItemHash) -> bool {
        self.counts.contains_key(&hash)
    }

    /// Would `insert` keep this hash (or bump an existing count)?
    #[inline]
    pub fn accepts(&self, hash: ItemHash) -> bool {
        match self.hashes.peek() {
            None => self.size > 0,
            Some(old_max_hash) => hash <= *old_max_hash || self.hashes.len() < self.size,
        }
    }

    pub fn push(&mut self, hash: ItemHash) {
        self.total_kmers += 1;
        self.insert(hash, 1);
    }

    /// Adds `count` observations of `hash`. Returns the evicted hash, if any.
    pub fn insert(&mut self, hash: ItemHash, count: u32) -> Option<ItemHash> {
        if !self.accepts(hash) {
            return None;
        }
        if let Some(existing) = self.counts.get_mut(&hash) {
            *existing = existing.saturating_add(count);
            return None;
        }
        self.hashes.push(hash);
        self.counts.insert(hash, count);
        if self.hashes.len() > self.size {
            let evicted = self.hashes.pop()?;
            self.counts.remove(&evicted);
            return Some(evicted);
        }
        None
    }

    pub(crate) fn add_bases(&mut self, bases: u64) {
        self.total_bases += bases;
    }

    pub(crate) fn hasher(&self) -> KmerHasher {
        self.hasher
    }

    /// Seals the sketch, returning the retained hashes in ascending order.
    pub fn into_sorted_vec(self) -> Vec<HashEntry> {
        let counts = self.counts;
        self.hashes
            .into_sorted_vec()
            .into_iter()
            .map(|hash| HashEntry {
                hash,
                count: counts.get(&hash).copied().unwrap_or(1),
            })
            .collect()
    }
}

impl SketchScheme for MashSketcher {
    fn process(&mut self, seq: &[u8]) {
        self.total_bases += seq.len() as u64;
        let hasher = self.hasher;
        for hash in hasher.hashes(seq) {
            self.push(hash);
        }
    }

    fn total_bases_and_kmers(&self) -> (u64, u64) {
        (self.total_bases, self.total_kmers)
    }

    fn finish(self: Box<Self>) -> Vec<HashEntry> {
        self.into_sorted_vec()
    }
}
