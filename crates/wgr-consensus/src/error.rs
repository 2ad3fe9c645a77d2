//! Consensus error types.

use thiserror::Error;
use wgr_core::Hash32;

/// Errors returned by difficulty, proof-of-work and inclusion-proof checks.
#[derive(Debug, Error)]
pub enum ConsensusError {
    /// Compact target encoding out of the accepted range.
    #[error("invalid compact target bits {0:#010x}")]
    InvalidBits(u32),

    /// Target decoded to zero or exceeded 256 bits.
    #[error("invalid difficulty target")]
    InvalidTarget,

    /// Header hash did not match the hash already known for its height.
    #[error("hash mismatches with expected: {expected} vs {got}")]
    HashMismatch {
        /// Hash known for this height.
        expected: Hash32,
        /// Hash of the offered header.
        got: Hash32,
    },

    /// Header does not link to the expected previous hash.
    #[error("prev hash mismatch: {expected} vs {got}")]
    PrevHashMismatch {
        /// Hash of the header before it.
        expected: Hash32,
        /// `prev_block_hash` carried by the header.
        got: Hash32,
    },

    /// Header `bits` disagree with the required target.
    #[error("bits mismatch: {expected:#010x} vs {got:#010x}")]
    BitsMismatch {
        /// Compact encoding of the required target.
        expected: u32,
        /// `bits` carried by the header.
        got: u32,
    },

    /// Proof-of-work hash did not meet the required target.
    #[error("insufficient proof of work at height {height}")]
    InsufficientPoW {
        /// Height of the offending header.
        height: u64,
    },

    /// A header needed for retargeting was not available.
    #[error("header missing at height {0}")]
    MissingHeader(u64),

    /// Merkle branch too short for the claimed leaf index.
    #[error("index out of range for branch")]
    MerkleIndexOutOfRange,

    /// Merkle branch resolved to a root other than the header's.
    #[error("merkle root mismatch: {expected} vs {got}")]
    MerkleRootMismatch {
        /// Root committed to by the header.
        expected: Hash32,
        /// Root computed from the branch.
        got: Hash32,
    },
}
