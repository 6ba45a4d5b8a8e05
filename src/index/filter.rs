//! Bloom filter
//!
//! Fixed-size bit array probed with double hashing over a SHA-256 of the key.

use sha2::{Digest as _, Sha256};

/// Bits allotted per inserted key
pub const BITS_PER_KEY: usize = 20;

/// ceil(ln 2 * BITS_PER_KEY); false positive rate ≈ 1e-4
pub const NUM_HASHES: u32 = 14;

/// A bloom filter over byte-string keys
#[derive(Debug, Clone)]
pub struct BloomFilter {
    bits: Vec<u64>,
    num_bits: u64,
    num_hashes: u32,
}

/// Precomputed probe seeds for one key, reusable across many filters
#[derive(Debug, Clone, Copy)]
pub struct ProbeKey {
    h1: u64,
    h2: u64,
}

impl ProbeKey {
    pub fn new(key: &[u8]) -> Self {
        let digest = Sha256::digest(key);
        let mut first = [0u8; 8];
        let mut second = [0u8; 8];
        first.copy_from_slice(&digest[0..8]);
        second.copy_from_slice(&digest[8..16]);

        Self {
            h1: u64::from_le_bytes(first),
            // odd step so probes don't collapse onto one bit
            h2: u64::from_le_bytes(second) | 1,
        }
    }
}

impl BloomFilter {
    /// Create a filter with `num_bits` bits and `num_hashes` probes
    pub fn new(num_bits: usize, num_hashes: u32) -> Self {
        let num_bits = num_bits.max(1) as u64;
        let words = num_bits.div_ceil(64) as usize;

        Self {
            bits: vec![0u64; words],
            num_bits,
            num_hashes: num_hashes.max(1),
        }
    }

    /// Filter sized for `items` keys at the default rate
    pub fn with_capacity(items: usize) -> Self {
        Self::new(items * BITS_PER_KEY, NUM_HASHES)
    }

    pub fn insert(&mut self, key: &[u8]) {
        self.insert_probe(&ProbeKey::new(key));
    }

    pub fn insert_probe(&mut self, probe: &ProbeKey) {
        for i in 0..self.num_hashes {
            let bit = self.bit_index(probe, i);
            self.bits[(bit / 64) as usize] |= 1 << (bit % 64);
        }
    }

    /// False means definitely absent
    pub fn contains(&self, key: &[u8]) -> bool {
        self.contains_probe(&ProbeKey::new(key))
    }

    pub fn contains_probe(&self, probe: &ProbeKey) -> bool {
        (0..self.num_hashes).all(|i| {
            let bit = self.bit_index(probe, i);
            self.bits[(bit / 64) as usize] & (1 << (bit % 64)) != 0
        })
    }

    pub fn num_bits(&self) -> u64 {
        self.num_bits
    }

    pub fn num_hashes(&self) -> u32 {
        self.num_hashes
    }

    /// Heap bytes held by the bit array
    pub fn size_bytes(&self) -> usize {
        self.bits.len() * std::mem::size_of::<u64>()
    }

    fn bit_index(&self, probe: &ProbeKey, i: u32) -> u64 {
        probe.h1.wrapping_add((i as u64).wrapping_mul(probe.h2)) % self.num_bits
    }
}
