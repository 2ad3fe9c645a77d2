//! Checkpoint list loading.
//!
//! The file is a JSON array of `[hash, target]` pairs, one per checkpointed
//! chunk, oldest first. Only the hashes are used.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use wgr_core::Hash32;

use crate::error::ChainError;

// The target half of each pair is carried but unused.
#[allow(dead_code)]
#[derive(Debug, Deserialize)]
struct CheckpointEntry(String, serde_json::Value);

/// Parse checkpoint hashes from JSON text.
pub fn parse_checkpoints(json: &str) -> Result<Vec<Hash32>, ChainError> {
    let entries: Vec<CheckpointEntry> = serde_json::from_str(json)?;
    entries
        .iter()
        .enumerate()
        .map(|(index, CheckpointEntry(hash, _))| {
            Hash32::from_hex_padded(hash)
                .map_err(|source| ChainError::InvalidCheckpoint { index, source })
        })
        .collect()
}

/// Read and parse a checkpoints file.
pub fn load_checkpoints(path: &Path) -> Result<Vec<Hash32>, ChainError> {
    parse_checkpoints(&fs::read_to_string(path)?)
}
