// Consensus-critical. Changes require test vector updates.
//! Header binary layout policy.
//!
//! A header's serialized size is a pure function of its height. Files of
//! headers are addressed by cumulative byte offset, so every lookup goes
//! through [`HeaderLayout::byte_offset_of`] rather than `height * size`.

use crate::constants::*;
use core::fmt;

/// Sizes and byte offsets of header records per height era.
pub trait HeaderLayout: fmt::Debug + Send + Sync {
    /// Serialized size of the header at `height`.
    fn header_size_at(&self, height: u64) -> usize;

    /// Cumulative bytes preceding the record of `height`.
    fn byte_offset_of(&self, height: u64) -> u64;

    /// Number of complete records fitting in `offset` bytes counted from height 0.
    fn height_at_offset(&self, offset: u64) -> u64;

    /// Record size announced by the leading bytes of a raw header.
    fn sniff_header_size(&self, leading: &[u8]) -> usize;

    /// Whether `raw` has any size a header may legally have.
    fn check_header_size(&self, raw: &[u8]) -> bool;

    /// Size of the fixed field region shared by every era.
    fn base_header_size(&self) -> usize {
        BASE_HEADER_SIZE
    }
}

/// Three-era layout: base headers, then headers carrying an accumulator
/// checkpoint, then v7 headers of their own fixed size.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EraLayout {
    checkpoint_era_start: u64,
    v7_era_start: u64,
    v7_header_size: usize,
}

impl EraLayout {
    /// Build a layout. `v7_era_start` is raised to `checkpoint_era_start` if lower.
    pub fn new(checkpoint_era_start: u64, v7_era_start: u64, v7_header_size: usize) -> Self {
        Self {
            checkpoint_era_start,
            v7_era_start: v7_era_start.max(checkpoint_era_start),
            v7_header_size: v7_header_size.max(BASE_HEADER_SIZE),
        }
    }

    /// Mainnet era boundaries.
    pub fn mainnet() -> Self {
        Self::new(
            MAINNET_CHECKPOINT_ERA_START,
            MAINNET_V7_ERA_START,
            MAINNET_V7_HEADER_SIZE,
        )
    }

    /// First height carrying an accumulator checkpoint.
    pub fn checkpoint_era_start(&self) -> u64 {
        self.checkpoint_era_start
    }

    /// First height of the v7 layout.
    pub fn v7_era_start(&self) -> u64 {
        self.v7_era_start
    }

    fn checkpoint_era_offset(&self) -> u64 {
        self.checkpoint_era_start * BASE_HEADER_SIZE as u64
    }

    fn v7_era_offset(&self) -> u64 {
        self.checkpoint_era_offset()
            + (self.v7_era_start - self.checkpoint_era_start) * CHECKPOINT_HEADER_SIZE as u64
    }
}

impl HeaderLayout for EraLayout {
    fn header_size_at(&self, height: u64) -> usize {
        if height >= self.v7_era_start {
            self.v7_header_size
        } else if height >= self.checkpoint_era_start {
            CHECKPOINT_HEADER_SIZE
        } else {
            BASE_HEADER_SIZE
        }
    }

    fn byte_offset_of(&self, height: u64) -> u64 {
        if height <= self.checkpoint_era_start {
            height * BASE_HEADER_SIZE as u64
        } else if height <= self.v7_era_start {
            self.checkpoint_era_offset()
                + (height - self.checkpoint_era_start) * CHECKPOINT_HEADER_SIZE as u64
        } else {
            self.v7_era_offset() + (height - self.v7_era_start) * self.v7_header_size as u64
        }
    }

    fn height_at_offset(&self, offset: u64) -> u64 {
        let v7_offset = self.v7_era_offset();
        let cp_offset = self.checkpoint_era_offset();
        if offset > v7_offset {
            self.v7_era_start + (offset - v7_offset) / self.v7_header_size as u64
        } else if offset > cp_offset {
            self.checkpoint_era_start + (offset - cp_offset) / CHECKPOINT_HEADER_SIZE as u64
        } else {
            offset / BASE_HEADER_SIZE as u64
        }
    }

    fn sniff_header_size(&self, leading: &[u8]) -> usize {
        let Some(version) = leading.get(..4) else {
            return BASE_HEADER_SIZE;
        };
        let version = u32::from_le_bytes([version[0], version[1], version[2], version[3]]);
        if version >= V7_HEADER_VERSION {
            self.v7_header_size
        } else if version >= CHECKPOINT_HEADER_VERSION {
            CHECKPOINT_HEADER_SIZE
        } else {
            BASE_HEADER_SIZE
        }
    }

    fn check_header_size(&self, raw: &[u8]) -> bool {
        let len = raw.len();
        len == BASE_HEADER_SIZE || len == CHECKPOINT_HEADER_SIZE || len == self.v7_header_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> EraLayout {
        EraLayout::new(10, 20, 144)
    }

    #[test]
    fn sizes_follow_eras() {
        let l = layout();
        assert_eq!(l.header_size_at(0), 80);
        assert_eq!(l.header_size_at(9), 80);
        assert_eq!(l.header_size_at(10), 112);
        assert_eq!(l.header_size_at(19), 112);
        assert_eq!(l.header_size_at(20), 144);
    }

    #[test]
    fn offsets_accumulate_across_eras() {
        let l = layout();
        assert_eq!(l.byte_offset_of(0), 0);
        assert_eq!(l.byte_offset_of(10), 800);
        assert_eq!(l.byte_offset_of(11), 912);
        assert_eq!(l.byte_offset_of(20), 800 + 10 * 112);
        assert_eq!(l.byte_offset_of(22), 800 + 10 * 112 + 2 * 144);
    }

    #[test]
    fn height_at_offset_inverts_offsets() {
        let l = layout();
        for h in 0..40u64 {
            assert_eq!(l.height_at_offset(l.byte_offset_of(h)), h, "height {h}");
        }
        // A partial trailing record is not counted.
        assert_eq!(l.height_at_offset(l.byte_offset_of(12) + 5), 12);
    }

    #[test]
    fn sniffs_by_version() {
        let l = layout();
        assert_eq!(l.sniff_header_size(&1u32.to_le_bytes()), 80);
        assert_eq!(l.sniff_header_size(&5u32.to_le_bytes()), 112);
        assert_eq!(l.sniff_header_size(&7u32.to_le_bytes()), 144);
        assert_eq!(l.sniff_header_size(&[]), 80);
    }

    #[test]
    fn checks_known_sizes_only() {
        let l = layout();
        assert!(l.check_header_size(&[0u8; 80]));
        assert!(l.check_header_size(&[0u8; 112]));
        assert!(l.check_header_size(&[0u8; 144]));
        assert!(!l.check_header_size(&[0u8; 81]));
    }
}
