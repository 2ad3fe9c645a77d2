#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

//! Wagerr header-chain consensus rules.
//!
//! This crate is responsible for:
//! - compact difficulty target encoding/decoding (`bits`)
//! - required-target computation (Dark Gravity Wave, then post-PoW retarget)
//! - header verification against a target
//! - per-header work and the shared chainwork cache
//! - merkle branch verification
//!
//! It does no I/O; header lookups are supplied by the caller.

pub mod difficulty;
pub mod error;
pub mod merkle;
pub mod pow;
pub mod work;

pub use difficulty::*;
pub use error::*;
pub use merkle::*;
pub use work::*;
