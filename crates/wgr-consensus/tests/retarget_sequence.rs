use std::collections::HashMap;

use wgr_consensus::{
    bits_to_target, target_to_bits, work_from_bits, ConsensusError, DifficultyEngine,
    DifficultyParams,
};
use wgr_core::{hash_header, Hash32, Header};

fn build(prev: Hash32, height: u64, timestamp: u32, bits: u32) -> Header {
    Header {
        version: 4,
        prev_block_hash: prev,
        merkle_root: Hash32([0x5a; 32]),
        timestamp,
        bits,
        nonce: height as u32,
        block_height: height,
        acc_checkpoint: None,
    }
}

#[test]
fn post_pow_chain_verifies_header_by_header() {
    let engine = DifficultyEngine::new(DifficultyParams::mainnet(), false);
    let mut chain: HashMap<u64, Header> = HashMap::new();

    let a = build(Hash32([1; 32]), 1498, 1_600_000_000, 0x1d00_ffff);
    let b = build(hash_header(&a), 1499, 1_600_000_060, 0x1d00_ffff);
    chain.insert(1498, a);
    chain.insert(1499, b);

    let mut ts = 1_600_000_060u32;
    for height in 1500..1600u64 {
        // Alternate fast and slow blocks.
        ts += if height % 2 == 0 { 20 } else { 110 };
        let target = engine
            .required_target(height, |h| Ok::<_, ConsensusError>(chain.get(&h).cloned()))
            .expect("target");
        assert!(target <= engine.params().pos_target_limit);

        let prev = hash_header(&chain[&(height - 1)]);
        let header = build(prev, height, ts, target_to_bits(&target));
        engine
            .verify_header(&header, &prev, &target, None, false)
            .expect("header built with required bits verifies");
        chain.insert(height, header);
    }

    // Steady average spacing (65s vs 60s) keeps the target in a narrow band.
    let first = bits_to_target(0x1d00_ffff).unwrap();
    let last = bits_to_target(chain[&1599].bits).unwrap();
    assert!(last < &first * 2u32 && last > &first / 2u32);
    assert!(work_from_bits(chain[&1599].bits).unwrap() > num_bigint::BigUint::from(0u32));
}

#[test]
fn wrong_bits_in_sequence_is_rejected() {
    let engine = DifficultyEngine::new(DifficultyParams::mainnet(), false);
    let a = build(Hash32([1; 32]), 1498, 1_600_000_000, 0x1d00_ffff);
    let b = build(hash_header(&a), 1499, 1_600_000_060, 0x1d00_ffff);
    let known = [a, b.clone()];
    let target = engine
        .required_target(1500, |h| {
            Ok::<_, ConsensusError>(known.iter().find(|x| x.block_height == h).cloned())
        })
        .unwrap();

    let bad = build(hash_header(&b), 1500, 1_600_000_120, 0x1c00_ffff);
    let err = engine
        .verify_header(&bad, &hash_header(&b), &target, None, false)
        .expect_err("bits disagree with target");
    assert!(matches!(err, ConsensusError::BitsMismatch { got: 0x1c00_ffff, .. }));
}
