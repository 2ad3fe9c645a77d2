// Consensus-critical. Changes require test vector updates.
//! Header hash functions.
//!
//! The network migrated hash algorithms once. Headers whose first serialized
//! byte is [`LEGACY_POW_MARKER`] keep the legacy Quark hash; every other
//! header hashes with double SHA-256. Only these two variants exist.

use sha2::{Digest, Sha256};

use crate::constants::LEGACY_POW_MARKER;
use crate::quark::quark_hash;

/// Double SHA-256, returned in wire order.
pub fn sha256d(data: &[u8]) -> [u8; 32] {
    let first = Sha256::digest(data);
    let second = Sha256::digest(first);
    let mut out = [0u8; 32];
    out.copy_from_slice(&second);
    out
}

/// Hash algorithm applied to a serialized header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HeaderHashAlgorithm {
    /// Legacy proof-of-work hash.
    Quark,
    /// Double SHA-256.
    DoubleSha256,
}

impl HeaderHashAlgorithm {
    /// Select the algorithm from the leading byte of a serialized header.
    pub fn for_raw_header(raw: &[u8]) -> Self {
        match raw.first() {
            Some(&LEGACY_POW_MARKER) => Self::Quark,
            _ => Self::DoubleSha256,
        }
    }

    /// Digest `raw` in wire order.
    pub fn digest(self, raw: &[u8]) -> [u8; 32] {
        match self {
            Self::Quark => quark_hash(raw),
            Self::DoubleSha256 => sha256d(raw),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256d_known_vector() {
        // sha256d("") is a well-known constant.
        assert_eq!(
            hex::encode(sha256d(b"")),
            "5df6e0e2761359d30a8275058e299fcc0381534545f55cf43e41983f5d4c9456"
        );
    }

    #[test]
    fn dispatch_keys_on_leading_byte() {
        assert_eq!(
            HeaderHashAlgorithm::for_raw_header(&[0x01, 0, 0, 0]),
            HeaderHashAlgorithm::Quark
        );
        assert_eq!(
            HeaderHashAlgorithm::for_raw_header(&[0x04, 0, 0, 0]),
            HeaderHashAlgorithm::DoubleSha256
        );
        assert_eq!(
            HeaderHashAlgorithm::for_raw_header(&[]),
            HeaderHashAlgorithm::DoubleSha256
        );
    }

    #[test]
    fn algorithms_disagree() {
        let raw = [0x01u8; 80];
        assert_ne!(
            HeaderHashAlgorithm::Quark.digest(&raw),
            HeaderHashAlgorithm::DoubleSha256.digest(&raw)
        );
    }
}
