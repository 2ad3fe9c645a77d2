// Consensus-critical. Changes require test vector updates.
//! Work calculation helpers (heaviest-chain selection).

use std::collections::HashMap;

use crate::difficulty::bits_to_target;
use crate::error::ConsensusError;
use num_bigint::BigUint;
use num_traits::{One, Zero};
use parking_lot::RwLock;
use wgr_core::Hash32;

/// Expected number of hashes needed to meet `target`.
///
/// `work = ((2^256 - target - 1) / (target + 1)) + 1`, i.e. `2^256 / (target + 1)`
/// without the 257-bit intermediate. A target above `2^256 - 1` is rejected.
pub fn work_from_target(target: &BigUint) -> Result<BigUint, ConsensusError> {
    let two_256 = BigUint::one() << 256u32;
    if *target >= two_256 {
        return Err(ConsensusError::InvalidTarget);
    }
    Ok((two_256 - target - 1u32) / (target + 1u32) + 1u32)
}

/// Work of a single header carrying compact `bits`.
pub fn work_from_bits(bits: u32) -> Result<BigUint, ConsensusError> {
    work_from_target(&bits_to_target(bits)?)
}

/// Cumulative work up to retarget-chunk boundaries, keyed by boundary hash.
///
/// Seeded with the zero hash (the virtual header at height -1) mapping to
/// zero work. Entries are deterministic in their key, so concurrent inserts of
/// the same boundary are harmless.
#[derive(Debug)]
pub struct ChainWorkCache {
    entries: RwLock<HashMap<Hash32, BigUint>>,
}

impl ChainWorkCache {
    /// Create a cache holding only the height -1 sentinel.
    pub fn new() -> Self {
        let mut entries = HashMap::new();
        entries.insert(Hash32::zero(), BigUint::zero());
        Self {
            entries: RwLock::new(entries),
        }
    }

    /// Cumulative work up to and including the header with `hash`.
    pub fn get(&self, hash: &Hash32) -> Option<BigUint> {
        self.entries.read().get(hash).cloned()
    }

    /// Whether `hash` already has an entry.
    pub fn contains(&self, hash: &Hash32) -> bool {
        self.entries.read().contains_key(hash)
    }

    /// Record cumulative work for a boundary hash.
    pub fn insert(&self, hash: Hash32, work: BigUint) {
        self.entries.write().insert(hash, work);
    }

    /// Number of entries, sentinel included.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Always false: the sentinel is never removed.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl Default for ChainWorkCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn work_monotonic_vs_target() {
        let easy = work_from_bits(0x1e0f_ffff).unwrap();
        let harder = work_from_bits(0x1d00_ffff).unwrap();
        assert!(harder > easy, "harder target must yield more work");
    }

    #[test]
    fn work_matches_closed_form() {
        // 2^256 / (target + 1) for target = 2^255 - 1 is exactly 2.
        let target = (BigUint::one() << 255u32) - 1u32;
        assert_eq!(work_from_target(&target).unwrap(), BigUint::from(2u32));
        // Target zero needs every hash.
        assert_eq!(work_from_target(&BigUint::zero()).unwrap(), BigUint::one() << 256u32);
    }

    #[test]
    fn rejects_oversized_target() {
        let target = BigUint::one() << 256u32;
        assert!(matches!(work_from_target(&target), Err(ConsensusError::InvalidTarget)));
    }

    #[test]
    fn cache_starts_with_sentinel() {
        let cache = ChainWorkCache::new();
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&Hash32::zero()), Some(BigUint::zero()));
        assert!(!cache.contains(&Hash32([7; 32])));
    }

    #[test]
    fn repeated_insert_is_idempotent() {
        let cache = ChainWorkCache::new();
        let key = Hash32([7; 32]);
        cache.insert(key, BigUint::from(42u32));
        cache.insert(key, BigUint::from(42u32));
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&key), Some(BigUint::from(42u32)));
    }
}
