// Consensus-critical. Changes require test vector updates.
//! Header wire codec.
//!
//! Layout: version, prev hash, merkle root, timestamp, bits, nonce, each
//! little-endian, hashes in wire order, followed by the accumulator
//! checkpoint (also wire order) when the era carries one.

use crate::constants::*;
use crate::crypto::HeaderHashAlgorithm;
use crate::layout::HeaderLayout;
use crate::types::{CoreError, Hash32, Header};

/// Serialize a header to its wire form.
pub fn serialize_header(header: &Header) -> Vec<u8> {
    let extra = header.acc_checkpoint.as_ref().map_or(0, Vec::len);
    let mut out = Vec::with_capacity(BASE_HEADER_SIZE + extra);
    out.extend_from_slice(&header.version.to_le_bytes());
    out.extend_from_slice(&header.prev_block_hash.to_wire());
    out.extend_from_slice(&header.merkle_root.to_wire());
    out.extend_from_slice(&header.timestamp.to_le_bytes());
    out.extend_from_slice(&header.bits.to_le_bytes());
    out.extend_from_slice(&header.nonce.to_le_bytes());
    if let Some(acc) = &header.acc_checkpoint {
        out.extend(acc.iter().rev());
    }
    out
}

/// Deserialize the header stored at `height`.
///
/// Fails if `raw` is empty or its length differs from the size the layout
/// mandates for `height`.
pub fn deserialize_header(
    raw: &[u8],
    height: u64,
    layout: &dyn HeaderLayout,
) -> Result<Header, CoreError> {
    if raw.is_empty() {
        return Err(CoreError::EmptyHeader);
    }
    let expected = layout.header_size_at(height);
    if raw.len() != expected || !layout.check_header_size(raw) {
        return Err(CoreError::InvalidHeaderLength {
            height,
            expected,
            got: raw.len(),
        });
    }

    let base = layout.base_header_size();
    let acc_checkpoint = (raw.len() > base).then(|| raw[base..].iter().rev().copied().collect());

    Ok(Header {
        version: read_u32(raw, 0),
        prev_block_hash: read_hash(raw, 4),
        merkle_root: read_hash(raw, 36),
        timestamp: read_u32(raw, 68),
        bits: read_u32(raw, 72),
        nonce: read_u32(raw, 76),
        block_height: height,
        acc_checkpoint,
    })
}

/// Hash of a serialized header (display order).
pub fn hash_raw_header(raw: &[u8]) -> Hash32 {
    Hash32::from_wire(HeaderHashAlgorithm::for_raw_header(raw).digest(raw))
}

/// Hash of a header (display order).
pub fn hash_header(header: &Header) -> Hash32 {
    hash_raw_header(&serialize_header(header))
}

fn read_u32(raw: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([raw[at], raw[at + 1], raw[at + 2], raw[at + 3]])
}

fn read_hash(raw: &[u8], at: usize) -> Hash32 {
    let mut wire = [0u8; HASH32_LEN];
    wire.copy_from_slice(&raw[at..at + HASH32_LEN]);
    Hash32::from_wire(wire)
}
