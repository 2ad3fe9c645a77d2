//! Header-chain error types.

use std::path::PathBuf;

use thiserror::Error;
use wgr_consensus::ConsensusError;
use wgr_core::CoreError;

/// Errors raised by chain storage, verification and reorganization.
#[derive(Debug, Error)]
pub enum ChainError {
    /// Raw header bytes were malformed or of the wrong length.
    #[error("invalid header: {0}")]
    InvalidHeader(#[from] CoreError),

    /// Requested height is not stored.
    #[error("header is missing at height {0}")]
    MissingHeader(u64),

    /// A stored record ended early.
    #[error("expected to read a full header at height {height}, got only {got} bytes")]
    TruncatedHeader {
        /// Height of the record.
        height: u64,
        /// Bytes actually read.
        got: usize,
    },

    /// Header failed a consensus check.
    #[error(transparent)]
    Consensus(#[from] ConsensusError),

    /// The headers directory disappeared.
    #[error("headers directory {0} does not exist; was it deleted while running?")]
    HeadersDirMissing(PathBuf),

    /// A chain file is absent although the headers directory exists.
    #[error("cannot find headers file but headers directory is there; should be at {0}")]
    HeadersFileMissing(PathBuf),

    /// A fork was requested at or below the checkpoint horizon.
    #[error("cannot fork below max checkpoint: forkpoint {0}")]
    ForkBelowCheckpoint(u64),

    /// Headers are only appended at the next unwritten height.
    #[error("header at height {height} is not the next height {expected}")]
    NotNextHeight {
        /// Height of the offered header.
        height: u64,
        /// Next unwritten height of the chain.
        expected: u64,
    },

    /// Header does not connect to the chain it was offered to.
    #[error("header at height {0} does not connect to parent chain")]
    DoesNotConnect(u64),

    /// A fork's forkpoint is not above its parent's.
    #[error("forkpoint of parent chain ({parent}) should be lower than child's ({child})")]
    SwapOrder {
        /// Child forkpoint.
        child: u64,
        /// Parent forkpoint.
        parent: u64,
    },

    /// Reorganization did not converge.
    #[error("swapping fork with parent too many times: {0}")]
    SwapOverrun(usize),

    /// No chain is anchored at the genesis hash.
    #[error("no chain registered at genesis")]
    RootChainMissing,

    /// Checkpoint file could not be parsed.
    #[error("invalid checkpoints file: {0}")]
    CheckpointFile(#[from] serde_json::Error),

    /// A checkpoint entry carried a malformed hash.
    #[error("invalid checkpoint hash at index {index}: {source}")]
    InvalidCheckpoint {
        /// Position in the checkpoint list.
        index: usize,
        /// Decoding failure.
        source: CoreError,
    },

    /// Filesystem failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
