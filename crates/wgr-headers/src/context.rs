//! Shared state every chain of one network consults.

use std::fs;
use std::path::{Path, PathBuf};

use wgr_consensus::{ChainWorkCache, DifficultyEngine, DifficultyParams};
use wgr_core::{HeaderLayout, NetworkParams};

use crate::error::ChainError;

/// File name of the root chain inside the headers directory.
pub const ROOT_CHAIN_FILE: &str = "blockchain_headers";

/// Directory holding fork files, relative to the headers directory.
pub const FORKS_DIR: &str = "forks";

/// Network constants, difficulty rules, on-disk location and the chainwork
/// cache shared by all chains of one network.
#[derive(Debug)]
pub struct ChainContext {
    params: NetworkParams,
    engine: DifficultyEngine,
    headers_dir: PathBuf,
    work_cache: ChainWorkCache,
}

impl ChainContext {
    /// Build a context storing headers under `headers_dir`.
    pub fn new(params: NetworkParams, difficulty: DifficultyParams, headers_dir: PathBuf) -> Self {
        let engine = DifficultyEngine::new(difficulty, params.testnet);
        Self {
            params,
            engine,
            headers_dir,
            work_cache: ChainWorkCache::new(),
        }
    }

    /// Context with the mainnet retarget constants.
    pub fn with_default_difficulty(params: NetworkParams, headers_dir: PathBuf) -> Self {
        Self::new(params, DifficultyParams::mainnet(), headers_dir)
    }

    /// Network constants.
    pub fn params(&self) -> &NetworkParams {
        &self.params
    }

    /// Header size and offset policy.
    pub fn layout(&self) -> &dyn HeaderLayout {
        self.params.layout.as_ref()
    }

    /// Difficulty rules.
    pub fn engine(&self) -> &DifficultyEngine {
        &self.engine
    }

    /// Chainwork cache shared across chains.
    pub fn work_cache(&self) -> &ChainWorkCache {
        &self.work_cache
    }

    /// Directory holding every chain file.
    pub fn headers_dir(&self) -> &Path {
        &self.headers_dir
    }

    /// Directory holding fork files.
    pub fn forks_dir(&self) -> PathBuf {
        self.headers_dir.join(FORKS_DIR)
    }

    /// Create the headers and forks directories.
    pub fn create_dirs(&self) -> Result<(), ChainError> {
        fs::create_dir_all(self.forks_dir())?;
        Ok(())
    }
}
