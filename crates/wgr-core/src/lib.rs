#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

//! Wagerr header-chain core: canonical types, constants, header layout,
//! wire codec and header hashing.

pub mod constants;
pub mod crypto;
pub mod layout;
pub mod network;
pub mod quark;
pub mod serialization;
pub mod types;

pub use constants::*;
pub use crypto::*;
pub use layout::*;
pub use network::*;
pub use serialization::*;
pub use types::*;
