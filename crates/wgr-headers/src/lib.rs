#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

//! File-backed Wagerr header chains.
//!
//! This crate is responsible for:
//! - persisting header segments, one file per chain
//! - verifying chunks and single headers before they are stored
//! - tracking forks and swapping a heavier fork into its parent's place
//! - reconciling on-disk forks at startup
//!
//! Fetching headers from peers is left to the caller.

pub mod chain;
pub mod checkpoints;
pub mod chunk;
pub mod context;
pub mod error;
pub mod registry;
mod store;

pub use chain::*;
pub use checkpoints::*;
pub use chunk::*;
pub use context::*;
pub use error::*;
pub use registry::*;
