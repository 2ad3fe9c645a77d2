// Consensus-critical. Changes require test vector updates.
//! Difficulty target utilities and retargeting.
//!
//! Targets travel in headers as Bitcoin-style compact `bits`:
//! `bits = (exponent << 24) | mantissa`, `target = mantissa * 2^(8*(exponent-3))`.
//!
//! The required target for a height follows one of two regimes:
//!
//! - up to `last_pow_block`, Dark Gravity Wave: the averaged target of the
//!   previous `dgw_past_blocks` headers scaled by their clamped timespan;
//! - afterwards, a single-step exponential retarget off the previous header,
//!   with a one-time adjustment when time-protocol v2 activates.
//!
//! All arithmetic is on `BigUint`; divisions truncate.

use crate::error::ConsensusError;
use num_bigint::BigUint;
use num_traits::{One, Zero};
use wgr_core::{Hash32, Header};

/// Decode compact `bits` to a full target.
///
/// Accepts exponents in `0x03..=0x1e` and mantissas in `0x8000..=0x7fffff`.
pub fn bits_to_target(bits: u32) -> Result<BigUint, ConsensusError> {
    let exponent = bits >> 24;
    if !(0x03..=0x1e).contains(&exponent) {
        return Err(ConsensusError::InvalidBits(bits));
    }
    let mantissa = bits & 0x00ff_ffff;
    if !(0x8000..=0x7f_ffff).contains(&mantissa) {
        return Err(ConsensusError::InvalidBits(bits));
    }
    Ok(BigUint::from(mantissa) << (8 * (exponent - 3)))
}

/// Encode a target into compact `bits`.
///
/// Normalized like the reference client: at least three significant bytes,
/// and a mantissa with the sign bit set is shifted down one byte.
pub fn target_to_bits(target: &BigUint) -> u32 {
    let bytes = target.to_bytes_be();
    let significant = if target.is_zero() { 0 } else { bytes.len() };
    let mut size = significant.max(3) as u32;

    // First three bytes of the zero-padded big-endian encoding.
    let mut padded = vec![0u8; size as usize - significant];
    if significant > 0 {
        padded.extend_from_slice(&bytes);
    }
    let mut mantissa =
        (u32::from(padded[0]) << 16) | (u32::from(padded[1]) << 8) | u32::from(padded[2]);

    if mantissa >= 0x0080_0000 {
        mantissa >>= 8;
        size += 1;
    }
    (size << 24) | mantissa
}

/// Returns `true` if `hash`, read as a big-endian integer, is `<= target`.
pub fn hash_meets_target(hash: &Hash32, target: &BigUint) -> bool {
    BigUint::from_bytes_be(hash.as_bytes()) <= *target
}

/// Retargeting constants for one network.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DifficultyParams {
    /// Safety floor target used before enough history exists.
    pub min_pow: BigUint,
    /// Target required at height 0.
    pub max_target: BigUint,
    /// Last height governed by Dark Gravity Wave.
    pub last_pow_block: u64,
    /// Dark Gravity Wave look-back window.
    pub dgw_past_blocks: u64,
    /// Dark Gravity Wave per-block spacing in seconds.
    pub dgw_target_spacing: u64,
    /// Ceiling for post-proof-of-work targets.
    pub pos_target_limit: BigUint,
    /// Post-proof-of-work per-block spacing in seconds.
    pub target_spacing: u64,
    /// Timespan before time-protocol v2.
    pub target_timespan_v1: u64,
    /// Timespan from time-protocol v2 on.
    pub target_timespan_v2: u64,
    /// First height using time-protocol v2.
    pub time_protocol_v2_height: u64,
    /// Cap on observed spacing under v2, as a multiple of `target_spacing`.
    pub v2_max_spacing_factor: u64,
}

impl DifficultyParams {
    /// Wagerr mainnet constants.
    pub fn mainnet() -> Self {
        let time_slot_length = 15;
        Self {
            min_pow: (BigUint::one() << 236u32) - 1u32,
            max_target: BigUint::from(0xffffu32) << 220u32,
            last_pow_block: 1001,
            dgw_past_blocks: 24,
            dgw_target_spacing: 60,
            pos_target_limit: (BigUint::one() << 232u32) - 1u32,
            target_spacing: 60,
            target_timespan_v1: 40 * 60,
            target_timespan_v2: 2 * time_slot_length * 60,
            time_protocol_v2_height: 1_501_000,
            v2_max_spacing_factor: 10,
        }
    }

    /// Expected duration of a full Dark Gravity Wave window.
    pub fn dgw_target_timespan(&self) -> u64 {
        self.dgw_past_blocks * self.dgw_target_spacing
    }

    fn is_time_v2(&self, height: u64) -> bool {
        height >= self.time_protocol_v2_height
    }
}

impl Default for DifficultyParams {
    fn default() -> Self {
        Self::mainnet()
    }
}

/// Computes required targets and verifies headers against them.
///
/// Pure over headers: callers supply a lookup closure that resolves a
/// height to a header (persisted chain first, then any in-flight batch).
#[derive(Clone, Debug)]
pub struct DifficultyEngine {
    params: DifficultyParams,
    testnet: bool,
}

impl DifficultyEngine {
    /// Create an engine. Test networks skip retargeting and proof-of-work.
    pub fn new(params: DifficultyParams, testnet: bool) -> Self {
        Self { params, testnet }
    }

    /// Retargeting constants.
    pub fn params(&self) -> &DifficultyParams {
        &self.params
    }

    /// Whether difficulty accounting is skipped.
    pub fn is_testnet(&self) -> bool {
        self.testnet
    }

    /// Target required for the header at `height`.
    ///
    /// `header_at` returns `Ok(None)` for heights it cannot resolve. A test
    /// network always yields zero.
    pub fn required_target<E, F>(&self, height: u64, mut header_at: F) -> Result<BigUint, E>
    where
        F: FnMut(u64) -> Result<Option<Header>, E>,
        E: From<ConsensusError>,
    {
        if self.testnet {
            return Ok(BigUint::zero());
        }
        if height == 0 {
            return Ok(self.params.max_target.clone());
        }

        let last = match header_at(height - 1)? {
            Some(last) if height >= self.params.dgw_past_blocks => last,
            _ => return Ok(self.params.min_pow.clone()),
        };

        if height - 1 > self.params.last_pow_block {
            self.post_pow_target(height, &last, header_at)
        } else {
            self.dark_gravity_target(last, header_at)
        }
    }

    fn post_pow_target<E, F>(&self, height: u64, last: &Header, mut header_at: F) -> Result<BigUint, E>
    where
        F: FnMut(u64) -> Result<Option<Header>, E>,
        E: From<ConsensusError>,
    {
        let p = &self.params;
        let v2 = p.is_time_v2(height);
        let timespan = if v2 { p.target_timespan_v2 } else { p.target_timespan_v1 };
        let spacing = p.target_spacing;

        // height - 1 > last_pow_block, so height - 2 exists.
        let before = header_at(height - 2)?.ok_or(ConsensusError::MissingHeader(height - 2))?;
        let mut actual = i64::from(last.timestamp) - i64::from(before.timestamp);
        if actual < 0 {
            actual = 1;
        }
        let mut actual = actual as u64;
        if v2 {
            actual = actual.min(spacing * p.v2_max_spacing_factor);
        }

        let mut target = bits_to_target(last.bits)?;
        if v2 && !p.is_time_v2(height - 1) {
            target <<= 4u32;
        }

        let interval = timespan / spacing;
        let target = target * ((interval - 1) * spacing + 2 * actual) / ((interval + 1) * spacing);
        if target.is_zero() || target > p.pos_target_limit {
            return Ok(p.pos_target_limit.clone());
        }
        Ok(target)
    }

    fn dark_gravity_target<E, F>(&self, mut last: Header, mut header_at: F) -> Result<BigUint, E>
    where
        F: FnMut(u64) -> Result<Option<Header>, E>,
        E: From<ConsensusError>,
    {
        let p = &self.params;
        let end_time = i64::from(last.timestamp);

        let mut average = BigUint::zero();
        for count in 1..=p.dgw_past_blocks {
            let target = bits_to_target(last.bits)?;
            average = if count == 1 {
                target
            } else {
                (average * count + target) / (count + 1)
            };
            if count != p.dgw_past_blocks {
                let height = last
                    .block_height
                    .checked_sub(1)
                    .ok_or(ConsensusError::MissingHeader(0))?;
                last = header_at(height)?.ok_or(ConsensusError::MissingHeader(height))?;
            }
        }

        let target_timespan = p.dgw_target_timespan() as i64;
        let span = (end_time - i64::from(last.timestamp))
            .max(target_timespan / 3)
            .min(target_timespan * 3);

        let target = average * span as u64 / target_timespan as u64;
        Ok(target.min(p.min_pow.clone()))
    }
}
