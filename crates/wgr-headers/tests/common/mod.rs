#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use tempfile::TempDir;
use wgr_consensus::DifficultyParams;
use wgr_core::{hash_header, serialize_header, EraLayout, Hash32, Header, NetworkParams};
use wgr_headers::{ChainContext, ChainRegistry};

pub const BASE_TIME: u32 = 1_600_000_000;

/// A version-3 (base era, double-SHA256) header.
pub fn header(prev: Hash32, height: u64, salt: u32) -> Header {
    Header {
        version: 3,
        prev_block_hash: prev,
        merkle_root: Hash32([(height % 251) as u8; 32]),
        timestamp: BASE_TIME + height as u32 * 60,
        bits: 0x1e0f_ffff,
        nonce: salt,
        block_height: height,
        acc_checkpoint: None,
    }
}

pub fn genesis() -> Header {
    header(Hash32::zero(), 0, 0)
}

/// `count` headers continuing after `tip`, distinguished by `salt`.
pub fn extend(tip: &Header, count: u64, salt: u32) -> Vec<Header> {
    let mut out: Vec<Header> = Vec::with_capacity(count as usize);
    for i in 1..=count {
        let prev = out.last().unwrap_or(tip);
        out.push(header(hash_header(prev), tip.block_height + i, salt));
    }
    out
}

/// Genesis followed by `count - 1` headers.
pub fn main_line(count: u64) -> Vec<Header> {
    let g = genesis();
    let mut out = vec![g.clone()];
    out.extend(extend(&g, count - 1, 0));
    out
}

pub fn raw(headers: &[Header]) -> Vec<u8> {
    headers.iter().flat_map(serialize_header).collect()
}

pub fn test_params(testnet: bool) -> NetworkParams {
    NetworkParams {
        name: "unittest",
        testnet,
        genesis: hash_header(&genesis()),
        checkpoints: Vec::new(),
        layout: Arc::new(EraLayout::new(1_000_000, 2_000_000, 112)),
    }
}

pub fn open(dir: &Path, params: NetworkParams, difficulty: DifficultyParams) -> ChainRegistry {
    let ctx = ChainContext::new(params, difficulty, dir.join("headers"));
    ChainRegistry::open(Arc::new(ctx)).unwrap()
}

/// Fresh test-network registry whose root holds `count` main-line headers.
pub fn testnet_with(count: u64) -> (TempDir, ChainRegistry, Vec<Header>) {
    let dir = tempfile::tempdir().unwrap();
    let registry = open(dir.path(), test_params(true), DifficultyParams::mainnet());
    let headers = main_line(count);
    registry
        .best_chain()
        .unwrap()
        .save_chunk(&registry, 0, &raw(&headers))
        .unwrap();
    (dir, registry, headers)
}
