//! Registry of every known chain, keyed by forkpoint hash.
//!
//! Opening a registry reconciles what is on disk: the root chain is checked
//! past the last checkpoint and rebuilt if it does not connect there, and
//! fork files are re-attached to their parents or deleted.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::sync::Arc;

use parking_lot::{ReentrantMutex, ReentrantMutexGuard};
use tracing::{info, warn};
use wgr_core::{hash_header, Hash32, Header};

use crate::chain::Chain;
use crate::context::ChainContext;
use crate::error::ChainError;
use crate::store::HeaderFile;

type ChainMap = HashMap<Hash32, Arc<Chain>>;

/// Identity parsed from a fork file name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ForkFileName {
    /// Height of the fork's first header.
    pub forkpoint: u64,
    /// Hash of the header below the forkpoint.
    pub prev_hash: Hash32,
    /// Hash of the fork's first header.
    pub first_hash: Hash32,
}

impl ForkFileName {
    /// Parse `fork2_{forkpoint}_{prev}_{first}`; names containing '.' are ignored.
    pub fn parse(name: &str) -> Option<Self> {
        if name.contains('.') {
            return None;
        }
        let mut parts = name.split('_');
        if parts.next() != Some("fork2") {
            return None;
        }
        let forkpoint = parts.next()?.parse().ok()?;
        let prev_hash = Hash32::from_hex_padded(parts.next()?).ok()?;
        let first_hash = Hash32::from_hex_padded(parts.next()?).ok()?;
        if parts.next().is_some() {
            return None;
        }
        Some(Self {
            forkpoint,
            prev_hash,
            first_hash,
        })
    }
}

/// All chains of one network. The root chain is keyed by the genesis hash.
pub struct ChainRegistry {
    ctx: Arc<ChainContext>,
    chains: ReentrantMutex<RefCell<ChainMap>>,
}

impl std::fmt::Debug for ChainRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainRegistry")
            .field("chains", &self.len())
            .finish()
    }
}

impl ChainRegistry {
    /// Load chains from the headers directory, deleting inconsistent ones.
    pub fn open(ctx: Arc<ChainContext>) -> Result<Self, ChainError> {
        ctx.create_dirs()?;
        let registry = Self {
            ctx: Arc::clone(&ctx),
            chains: ReentrantMutex::new(RefCell::new(HashMap::new())),
        };

        let genesis = ctx.params().genesis;
        let root = Chain::open(Arc::clone(&ctx), 0, None, genesis, None)?;
        let root_file = HeaderFile::new(ctx.headers_dir(), root.path());
        if root_file.len()? == 0 {
            root_file.create()?;
        }
        registry.insert(Arc::clone(&root));
        registry.check_root(&root)?;

        let mut forks: Vec<(ForkFileName, String)> = Vec::new();
        for entry in fs::read_dir(ctx.forks_dir())? {
            let name = entry?.file_name().to_string_lossy().into_owned();
            if !name.starts_with("fork2_") || name.contains('.') {
                continue;
            }
            match ForkFileName::parse(&name) {
                Some(parsed) => forks.push((parsed, name)),
                None => registry.delete_fork(&name, "malformed file name")?,
            }
        }
        forks.sort_by_key(|(parsed, _)| parsed.forkpoint);

        for (parsed, name) in forks {
            registry.instantiate_fork(&parsed, &name)?;
        }
        info!(chains = registry.len(), "loaded header chains");
        Ok(registry)
    }

    /// The root chain must connect past the last checkpoint, or it is rebuilt.
    fn check_root(&self, root: &Arc<Chain>) -> Result<(), ChainError> {
        let max_checkpoint = self.ctx.params().max_checkpoint();
        if !root.height().is_some_and(|h| h > max_checkpoint) {
            return Ok(());
        }
        let connects = match root.read_header(max_checkpoint + 1) {
            Ok(Some(header)) => root.can_connect(&header, false, false),
            _ => false,
        };
        if !connects {
            info!("deleting best chain: cannot connect header after last checkpoint");
            HeaderFile::new(self.ctx.headers_dir(), root.path()).create()?;
            root.update_size()?;
        }
        Ok(())
    }

    fn delete_fork(&self, name: &str, reason: &str) -> Result<(), ChainError> {
        warn!(file = name, reason, "deleting chain");
        HeaderFile::new(self.ctx.headers_dir(), self.ctx.forks_dir().join(name)).remove()
    }

    fn instantiate_fork(&self, parsed: &ForkFileName, name: &str) -> Result<(), ChainError> {
        let forkpoint = parsed.forkpoint;
        if forkpoint <= self.ctx.params().max_checkpoint() {
            return self.delete_fork(name, "fork below max checkpoint");
        }
        // Sorting by forkpoint guarantees the parent was instantiated first.
        let Some(parent) = self
            .chains()
            .into_iter()
            .find(|c| c.check_hash(forkpoint - 1, &parsed.prev_hash))
        else {
            return self.delete_fork(name, "cannot find parent for chain");
        };

        let chain = Chain::open(
            Arc::clone(&self.ctx),
            forkpoint,
            Some(Arc::clone(&parent)),
            parsed.first_hash,
            Some(parsed.prev_hash),
        )?;
        let first = match chain.read_header(forkpoint) {
            Ok(Some(header)) if hash_header(&header) == parsed.first_hash => header,
            _ => return self.delete_fork(name, "incorrect first hash for chain"),
        };
        if !parent.can_connect(&first, false, false) {
            return self.delete_fork(name, "cannot connect chain to parent");
        }
        self.insert(chain);
        Ok(())
    }

    pub(crate) fn lock(&self) -> ReentrantMutexGuard<'_, RefCell<ChainMap>> {
        self.chains.lock()
    }

    /// Shared context.
    pub fn context(&self) -> &Arc<ChainContext> {
        &self.ctx
    }

    /// The root chain, which holds the currently best history.
    pub fn best_chain(&self) -> Result<Arc<Chain>, ChainError> {
        self.get(&self.ctx.params().genesis)
            .ok_or(ChainError::RootChainMissing)
    }

    /// Chain registered under `id`.
    pub fn get(&self, id: &Hash32) -> Option<Arc<Chain>> {
        self.lock().borrow().get(id).cloned()
    }

    /// Snapshot of every registered chain.
    pub fn chains(&self) -> Vec<Arc<Chain>> {
        self.lock().borrow().values().cloned().collect()
    }

    /// Number of registered chains.
    pub fn len(&self) -> usize {
        self.lock().borrow().len()
    }

    /// Whether no chain is registered.
    pub fn is_empty(&self) -> bool {
        self.lock().borrow().is_empty()
    }

    /// Register `chain` under its current id.
    pub fn insert(&self, chain: Arc<Chain>) {
        let id = chain.id();
        self.lock().borrow_mut().insert(id, chain);
    }

    pub(crate) fn remove(&self, id: &Hash32) -> Option<Arc<Chain>> {
        self.lock().borrow_mut().remove(id)
    }

    /// First chain holding `header` at its height.
    pub fn check_header(&self, header: &Header) -> Option<Arc<Chain>> {
        self.chains().into_iter().find(|c| c.check_header(header))
    }

    /// First chain that `header` extends at its tip.
    pub fn can_connect(&self, header: &Header, proof_provided: bool) -> Option<Arc<Chain>> {
        self.chains()
            .into_iter()
            .find(|c| c.can_connect(header, true, proof_provided))
    }
}
