// Consensus-critical. Changes require test vector updates.
//! Canonical header-chain types.
//!
//! Hashes are held in display order (the big-endian hex form shown by
//! explorers). The wire form of a hash is the byte-reversed array; use
//! [`Hash32::from_wire`] and [`Hash32::to_wire`] at serialization edges.

use crate::constants::*;
use core::fmt;
use core::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Errors related to parsing or decoding core types.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// Hex string had an unexpected byte length.
    #[error("invalid hex length: expected {expected} bytes, got {got} bytes")]
    InvalidHexLength {
        /// Expected number of bytes.
        expected: usize,
        /// Actual number of bytes provided.
        got: usize,
    },

    /// Hex decoding failed.
    #[error("invalid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    /// Raw header bytes were empty.
    #[error("invalid header: empty input")]
    EmptyHeader,

    /// Raw header length did not match the size mandated for its height.
    #[error("invalid header length {got} at height {height}: expected {expected}")]
    InvalidHeaderLength {
        /// Height the header was decoded at.
        height: u64,
        /// Size mandated by the layout policy.
        expected: usize,
        /// Actual number of bytes provided.
        got: usize,
    },
}

/// Fixed-size 32-byte hash, stored in display order.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Hash32(pub [u8; HASH32_LEN]);

impl Hash32 {
    /// Returns an all-zero hash.
    pub const fn zero() -> Self {
        Self([0u8; HASH32_LEN])
    }

    /// Returns the underlying byte array (display order).
    pub const fn as_bytes(&self) -> &[u8; HASH32_LEN] {
        &self.0
    }

    /// Builds a hash from wire-order (little-endian) bytes.
    pub fn from_wire(mut wire: [u8; HASH32_LEN]) -> Self {
        wire.reverse();
        Self(wire)
    }

    /// Returns the wire-order (little-endian) bytes.
    pub fn to_wire(&self) -> [u8; HASH32_LEN] {
        let mut out = self.0;
        out.reverse();
        out
    }

    /// Returns true if every byte is zero.
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|b| *b == 0)
    }

    /// Parses hex that may have had its leading zeros stripped.
    pub fn from_hex_padded(s: &str) -> Result<Self, CoreError> {
        if s.len() > HASH32_LEN * 2 {
            return Err(CoreError::InvalidHexLength {
                expected: HASH32_LEN,
                got: s.len() / 2,
            });
        }
        let padded = format!("{:0>width$}", s, width = HASH32_LEN * 2);
        padded.parse()
    }

    /// Hex form with leading zeros removed.
    pub fn to_hex_stripped(&self) -> String {
        hex::encode(self.0).trim_start_matches('0').to_string()
    }
}

impl fmt::Debug for Hash32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash32({})", hex::encode(self.0))
    }
}

impl fmt::Display for Hash32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl From<[u8; HASH32_LEN]> for Hash32 {
    fn from(value: [u8; HASH32_LEN]) -> Self {
        Self(value)
    }
}

impl From<Hash32> for [u8; HASH32_LEN] {
    fn from(value: Hash32) -> Self {
        value.0
    }
}

impl FromStr for Hash32 {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s)?;
        if bytes.len() != HASH32_LEN {
            return Err(CoreError::InvalidHexLength {
                expected: HASH32_LEN,
                got: bytes.len(),
            });
        }
        let mut arr = [0u8; HASH32_LEN];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

/// Block hash type.
pub type BlockHash = Hash32;

/// Block header as carried by the header chain.
///
/// `block_height` is contextual: it is not part of the serialized record.
#[derive(Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Header {
    /// Header version. Its low byte also selects the hash algorithm.
    pub version: u32,
    /// Hash of the previous block.
    pub prev_block_hash: BlockHash,
    /// Merkle root of the block's transactions.
    pub merkle_root: Hash32,
    /// Block timestamp (Unix seconds).
    pub timestamp: u32,
    /// Compact difficulty target.
    pub bits: u32,
    /// Proof-of-work nonce.
    pub nonce: u32,
    /// Height this header sits at.
    pub block_height: u64,
    /// Accumulator checkpoint (display order), present only in later eras.
    pub acc_checkpoint: Option<Vec<u8>>,
}
