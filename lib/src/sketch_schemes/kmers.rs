use serde::{Deserialize, Serialize};

const AMINO_ACIDS: &[u8; 20] = b"ACDEFGHIKLMNPQRSTVWY";

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Hash, Serialize)]
pub enum Alphabet {
    Nucleotide,
    Protein,
}

impl Alphabet {
    pub fn size(self) -> u32 {
        match self {
            Alphabet::Nucleotide => 4,
            Alphabet::Protein => 20,
        }
    }

    /// Bits used per symbol in a packed k-mer.
    fn bits(self) -> u32 {
        match self {
            Alphabet::Nucleotide => 2,
            Alphabet::Protein => 5,
        }
    }

    /// Longest k-mer that still packs into a `u64`.
    pub fn max_kmer_length(self) -> u8 {
        (64 / self.bits()) as u8
    }

    pub fn symbols(self) -> &'static str {
        match self {
            Alphabet::Nucleotide => "ACGT",
            Alphabet::Protein => "ACDEFGHIKLMNPQRSTVWY",
        }
    }

    #[inline]
    pub fn encode(self, symbol: u8) -> Option<u8> {
        match self {
            Alphabet::Nucleotide => match symbol {
                b'A' | b'a' => Some(0),
                b'C' | b'c' => Some(1),
                b'G' | b'g' => Some(2),
                b'T' | b't' | b'U' | b'u' => Some(3),
                _ => None,
            },
            Alphabet::Protein => {
                let upper = symbol.to_ascii_uppercase();
                AMINO_ACIDS
                    .iter()
                    .position(|aa| *aa == upper)
                    .map(|ix| ix as u8)
            }
        }
    }
}

/// Iterates over the packed encodings of every k-mer in a sequence that
/// contains only valid symbols, yielding `(offset, encoding)`.
///
/// Windows touching an invalid symbol (e.g. `N`) are skipped. In canonical
/// mode each nucleotide k-mer is replaced by the smaller of itself and its
/// reverse complement; protein k-mers are never canonicalized.
pub struct Kmers<'a> {
    seq: &'a [u8],
    k: u8,
    alphabet: Alphabet,
    canonical: bool,
    pos: usize,
    valid: usize,
    fwd: u64,
    rev: u64,
    mask: u64,
}

impl<'a> Kmers<'a> {
    pub fn new(seq: &'a [u8], k: u8, alphabet: Alphabet, canonical: bool) -> Self {
        let width = u32::from(k) * alphabet.bits();
        let mask = if width >= 64 {
            u64::MAX
        } else {
            (1u64 << width) - 1
        };
        Kmers {
            seq,
            k,
            alphabet,
            canonical: canonical && alphabet == Alphabet::Nucleotide,
            pos: 0,
            valid: 0,
            fwd: 0,
            rev: 0,
            mask,
        }
    }
}

impl<'a> Iterator for Kmers<'a> {
    type Item = (usize, u64);

    fn next(&mut self) -> Option<Self::Item> {
        let k = usize::from(self.k);
        if k == 0 {
            return None;
        }
        let bits = self.alphabet.bits();
        while self.pos < self.seq.len() {
            let symbol = self.seq[self.pos];
            self.pos += 1;
            let code = match self.alphabet.encode(symbol) {
                Some(c) => u64::from(c),
                None => {
                    self.valid = 0;
                    self.fwd = 0;
                    self.rev = 0;
                    continue;
                }
            };
            self.fwd = ((self.fwd << bits) | code) & self.mask;
            if self.canonical {
                self.rev = (self.rev >> bits) | ((3 - code) << (bits * (u32::from(self.k) - 1)));
            }
            self.valid += 1;
            if self.valid >= k {
                let kmer = if self.canonical && self.rev < self.fwd {
                    self.rev
                } else {
                    self.fwd
                };
                return Some((self.pos - k, kmer));
            }
        }
        None
    }
}
