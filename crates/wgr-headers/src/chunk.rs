// Consensus-critical. Changes require test vector updates.
//! Walking a buffer of concatenated headers of mixed eras.

use wgr_core::{deserialize_header, hash_header, CoreError, Header, HeaderLayout};

use crate::error::ChainError;
use wgr_consensus::ConsensusError;

/// Iterator over the headers packed in a chunk starting at `base_height`.
///
/// Each record's size is sniffed from its leading bytes, so a chunk may span
/// era boundaries.
#[derive(Debug)]
pub struct ChunkHeaders<'a> {
    layout: &'a dyn HeaderLayout,
    data: &'a [u8],
    offset: usize,
    height: u64,
}

impl<'a> ChunkHeaders<'a> {
    /// Walk `data`, assigning heights from `base_height` upward.
    pub fn new(layout: &'a dyn HeaderLayout, base_height: u64, data: &'a [u8]) -> Self {
        Self {
            layout,
            data,
            offset: 0,
            height: base_height,
        }
    }
}

impl Iterator for ChunkHeaders<'_> {
    type Item = Result<Header, CoreError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.offset >= self.data.len() {
            return None;
        }
        let rest = &self.data[self.offset..];
        let leading = &rest[..rest.len().min(self.layout.base_header_size())];
        let size = self.layout.sniff_header_size(leading);
        let raw = &rest[..rest.len().min(size)];

        let header = deserialize_header(raw, self.height, self.layout);
        self.offset += size;
        self.height += 1;
        Some(header)
    }
}

/// Check hash linkage inside a chunk whose validity was proven elsewhere.
///
/// The first header's predecessor is not checked.
pub fn verify_proven_chunk(
    layout: &dyn HeaderLayout,
    base_height: u64,
    data: &[u8],
) -> Result<(), ChainError> {
    let mut prev = None;
    for header in ChunkHeaders::new(layout, base_height, data) {
        let header = header?;
        if let Some(prev) = prev {
            if header.prev_block_hash != prev {
                return Err(ConsensusError::PrevHashMismatch {
                    expected: prev,
                    got: header.prev_block_hash,
                }
                .into());
            }
        }
        prev = Some(hash_header(&header));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wgr_core::{serialize_header, EraLayout, Hash32};

    fn linked(layout: &EraLayout, count: u64) -> Vec<Header> {
        let mut out: Vec<Header> = Vec::new();
        for height in 0..count {
            let version = match layout.header_size_at(height) {
                80 => 3,
                112 => 4,
                _ => 7,
            };
            let extra = layout.header_size_at(height) - 80;
            out.push(Header {
                version,
                prev_block_hash: out.last().map(hash_header).unwrap_or_default(),
                merkle_root: Hash32([height as u8; 32]),
                timestamp: 1_000 + height as u32,
                bits: 0x1e0f_ffff,
                nonce: 0,
                block_height: height,
                acc_checkpoint: (extra > 0).then(|| vec![height as u8; extra]),
            });
        }
        out
    }

    #[test]
    fn walks_records_across_eras() {
        let layout = EraLayout::new(3, 6, 144);
        let headers = linked(&layout, 9);
        let data: Vec<u8> = headers.iter().flat_map(serialize_header).collect();
        assert_eq!(data.len() as u64, layout.byte_offset_of(9));

        let walked: Vec<Header> = ChunkHeaders::new(&layout, 0, &data)
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(walked, headers);
        verify_proven_chunk(&layout, 0, &data).unwrap();
    }

    #[test]
    fn trailing_partial_record_fails() {
        let layout = EraLayout::new(100, 200, 144);
        let headers = linked(&layout, 2);
        let mut data: Vec<u8> = headers.iter().flat_map(serialize_header).collect();
        data.truncate(150);
        let results: Vec<_> = ChunkHeaders::new(&layout, 0, &data).collect();
        assert_eq!(results.len(), 2);
        assert!(results[1].is_err());
    }

    #[test]
    fn proven_chunk_rejects_broken_link() {
        let layout = EraLayout::new(100, 200, 144);
        let mut headers = linked(&layout, 4);
        headers[2].prev_block_hash = Hash32([0xee; 32]);
        let data: Vec<u8> = headers.iter().flat_map(serialize_header).collect();
        assert!(matches!(
            verify_proven_chunk(&layout, 0, &data),
            Err(ChainError::Consensus(ConsensusError::PrevHashMismatch { .. }))
        ));
    }
}
