//! Network parameter sets.

use std::sync::Arc;

use crate::constants::*;
use crate::layout::{EraLayout, HeaderLayout};
use crate::types::{CoreError, Hash32};

/// Per-network constants consumed by the header chain.
#[derive(Clone, Debug)]
pub struct NetworkParams {
    /// Human-readable network name.
    pub name: &'static str,
    /// Test networks skip difficulty and proof-of-work accounting.
    pub testnet: bool,
    /// Hash of the block at height 0.
    pub genesis: Hash32,
    /// Hashes of checkpointed chunk boundaries, oldest first.
    pub checkpoints: Vec<Hash32>,
    /// Header binary layout policy.
    pub layout: Arc<dyn HeaderLayout>,
}

impl NetworkParams {
    /// Mainnet parameters.
    pub fn mainnet() -> Self {
        Self {
            name: "mainnet",
            testnet: false,
            genesis: parse_const(MAINNET_GENESIS),
            checkpoints: Vec::new(),
            layout: Arc::new(EraLayout::mainnet()),
        }
    }

    /// Testnet parameters.
    pub fn testnet() -> Self {
        Self {
            name: "testnet",
            testnet: true,
            genesis: parse_const(TESTNET_GENESIS),
            checkpoints: Vec::new(),
            layout: Arc::new(EraLayout::mainnet()),
        }
    }

    /// Regtest parameters. Regtest never carries checkpoints.
    pub fn regtest() -> Self {
        Self {
            name: "regtest",
            testnet: true,
            genesis: parse_const(REGTEST_GENESIS),
            checkpoints: Vec::new(),
            layout: Arc::new(EraLayout::mainnet()),
        }
    }

    /// Simnet parameters. Like regtest, no checkpoints.
    pub fn simnet() -> Self {
        Self {
            name: "simnet",
            testnet: true,
            genesis: parse_const(SIMNET_GENESIS),
            checkpoints: Vec::new(),
            layout: Arc::new(EraLayout::mainnet()),
        }
    }

    /// Look up a preset by name.
    pub fn by_name(name: &str) -> Option<Self> {
        match name {
            "mainnet" | "main" => Some(Self::mainnet()),
            "testnet" | "test" => Some(Self::testnet()),
            "regtest" => Some(Self::regtest()),
            "simnet" => Some(Self::simnet()),
            _ => None,
        }
    }

    /// Replace the header layout.
    pub fn with_layout(mut self, layout: Arc<dyn HeaderLayout>) -> Self {
        self.layout = layout;
        self
    }

    /// Replace the checkpoint list.
    pub fn with_checkpoints(mut self, checkpoints: Vec<Hash32>) -> Self {
        self.checkpoints = checkpoints;
        self
    }

    /// Highest checkpointed height (0 when there are no checkpoints).
    pub fn max_checkpoint(&self) -> u64 {
        (self.checkpoints.len() as u64 * CHUNK_SIZE).saturating_sub(1)
    }

    /// Parse checkpoint hashes, accepting stripped leading zeros.
    pub fn parse_checkpoints<'a, I>(hashes: I) -> Result<Vec<Hash32>, CoreError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        hashes.into_iter().map(Hash32::from_hex_padded).collect()
    }
}

fn parse_const(hex: &str) -> Hash32 {
    // Constants are 64 hex characters; a malformed one is a build-time bug.
    #[allow(clippy::expect_used)]
    hex.parse().expect("genesis constant is valid hex")
}
