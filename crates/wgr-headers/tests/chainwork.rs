mod common;

use std::sync::Arc;

use common::*;
use num_bigint::BigUint;
use wgr_consensus::{bits_to_target, target_to_bits, work_from_target, DifficultyParams};
use wgr_core::{hash_header, Hash32, Header, CHUNK_SIZE};
use wgr_headers::{Chain, ChainContext};

/// Retarget constants that keep every height in the Dark Gravity Wave regime.
fn dgw_only() -> DifficultyParams {
    DifficultyParams {
        last_pow_block: u64::MAX / 2,
        ..DifficultyParams::mainnet()
    }
}

/// A full chunk with constant bits whose 24-block windows span exactly the
/// target timespan, so the required target stays equal to `bits`.
fn steady_chunk(bits: u32) -> Vec<Header> {
    let timespan = dgw_only().dgw_target_timespan();
    let mut out: Vec<Header> = Vec::new();
    for height in 0..CHUNK_SIZE {
        let prev = out.last().map(hash_header).unwrap_or_default();
        let mut h = header(prev, height, 0);
        h.bits = bits;
        h.timestamp = BASE_TIME + (timespan * height / 23) as u32;
        out.push(h);
    }
    out
}

#[test]
fn full_chunk_adds_one_cache_entry() {
    let difficulty = dgw_only();
    let bits = target_to_bits(&difficulty.min_pow);
    let headers = steady_chunk(bits);

    let dir = tempfile::tempdir().unwrap();
    let mut params = test_params(false);
    params.genesis = hash_header(&headers[0]);
    let registry = open(dir.path(), params, difficulty.clone());
    let root = registry.best_chain().unwrap();
    root.save_chunk(&registry, 0, &raw(&headers)).unwrap();
    assert_eq!(root.height(), Some(CHUNK_SIZE - 1));

    let target = bits_to_target(bits).unwrap();
    assert_eq!(root.get_target(CHUNK_SIZE - 1, &[]).unwrap(), target);

    let cache = registry.context().work_cache();
    assert_eq!(cache.len(), 1);

    // Inside the first chunk nothing is cached yet.
    let per_header = work_from_target(&target).unwrap();
    let chunk_work = &per_header * CHUNK_SIZE;
    assert_eq!(root.get_chainwork(Some(CHUNK_SIZE - 1)).unwrap(), chunk_work);
    assert_eq!(cache.len(), 1);

    // Crossing the boundary caches the completed chunk under its last hash.
    let total = root.get_chainwork(Some(CHUNK_SIZE)).unwrap();
    assert_eq!(cache.len(), 2);
    let boundary = hash_header(&headers[CHUNK_SIZE as usize - 1]);
    assert_eq!(cache.get(&boundary), Some(chunk_work.clone()));

    // The following chunk is not stored, so its work falls back to the floor target.
    let floor = work_from_target(&difficulty.min_pow).unwrap();
    assert_eq!(total, chunk_work + floor);

    assert_eq!(root.get_chainwork(Some(CHUNK_SIZE)).unwrap(), total);
    assert_eq!(cache.len(), 2);
}

#[test]
fn chainwork_is_monotonic_and_path_independent() {
    let difficulty = dgw_only();
    let headers = steady_chunk(target_to_bits(&difficulty.min_pow));
    let dir = tempfile::tempdir().unwrap();
    let mut params = test_params(false);
    params.genesis = hash_header(&headers[0]);
    let registry = open(dir.path(), params.clone(), difficulty.clone());
    let root = registry.best_chain().unwrap();
    root.save_chunk(&registry, 0, &raw(&headers)).unwrap();

    let mut last = BigUint::default();
    for height in [0, 1, 23, 24, 500, 2014, 2015] {
        let work = root.get_chainwork(Some(height)).unwrap();
        assert!(work >= last, "chainwork dropped at {height}");
        last = work;
    }

    // Warm cache versus a fresh context over the same file.
    let warm = root.get_chainwork(Some(CHUNK_SIZE + 5)).unwrap();
    let ctx = Arc::new(ChainContext::new(params, difficulty, dir.path().join("headers")));
    let fresh = Chain::open(ctx, 0, None, hash_header(&headers[0]), None).unwrap();
    assert_eq!(fresh.get_chainwork(Some(2015)).unwrap(), last);
    assert_eq!(fresh.get_chainwork(Some(CHUNK_SIZE + 5)).unwrap(), warm);
}

#[test]
fn sentinel_boundary_has_zero_work() {
    let cache = wgr_consensus::ChainWorkCache::new();
    assert_eq!(cache.get(&Hash32::zero()), Some(BigUint::default()));
}
