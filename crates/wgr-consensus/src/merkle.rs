// Consensus-critical. Changes require test vector updates.
//! Merkle branch verification for transaction inclusion proofs.
//!
//! Nodes combine as `sha256d(left || right)` over wire-order bytes. Bit `i`
//! of the leaf index says whether the sibling at depth `i` sits on the left.

use crate::error::ConsensusError;
use wgr_core::{sha256d, Hash32, Header};

/// Fold `branch` into `leaf` (all wire order) and return the implied root.
///
/// Fails if `index` addresses a leaf deeper than `branch` can reach.
pub fn root_from_proof(
    leaf: [u8; 32],
    branch: &[[u8; 32]],
    mut index: u64,
) -> Result<[u8; 32], ConsensusError> {
    let mut running = leaf;
    let mut buf = [0u8; 64];
    for sibling in branch {
        if index & 1 == 1 {
            buf[..32].copy_from_slice(sibling);
            buf[32..].copy_from_slice(&running);
        } else {
            buf[..32].copy_from_slice(&running);
            buf[32..].copy_from_slice(sibling);
        }
        running = sha256d(&buf);
        index >>= 1;
    }
    if index != 0 {
        return Err(ConsensusError::MerkleIndexOutOfRange);
    }
    Ok(running)
}

/// Display-order wrapper around [`root_from_proof`].
pub fn merkle_root_from_branch(
    txid: &Hash32,
    branch: &[Hash32],
    index: u64,
) -> Result<Hash32, ConsensusError> {
    let wire: Vec<[u8; 32]> = branch.iter().map(Hash32::to_wire).collect();
    root_from_proof(txid.to_wire(), &wire, index).map(Hash32::from_wire)
}

/// Check that `txid` at position `index` is committed to by `header`.
pub fn verify_tx_inclusion(
    header: &Header,
    txid: &Hash32,
    branch: &[Hash32],
    index: u64,
) -> Result<(), ConsensusError> {
    let root = merkle_root_from_branch(txid, branch, index)?;
    if root != header.merkle_root {
        return Err(ConsensusError::MerkleRootMismatch {
            expected: header.merkle_root,
            got: root,
        });
    }
    Ok(())
}
