// Consensus-critical. Changes require test vector updates.
//! One file-backed segment of the header tree.
//!
//! A chain stores headers for heights `forkpoint..forkpoint + size` and asks
//! its parent for anything lower. The root chain starts at height 0 and has
//! no parent. Forks are files named `fork2_{forkpoint}_{prev}_{first}` with
//! leading zeros stripped from both hashes.
//!
//! Locking: every chain carries a reentrant lock over its own state and file.
//! Reorganization takes the registry lock, then the chain's lock, then its
//! parent's. State borrows never outlive a single field access.

use std::cell::RefCell;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use num_bigint::BigUint;
use parking_lot::ReentrantMutex;
use tracing::{debug, info};
use wgr_consensus::work_from_target;
use wgr_core::{
    deserialize_header, hash_header, hash_raw_header, serialize_header, Hash32, Header,
    CHUNK_SIZE,
};

use crate::chunk::ChunkHeaders;
use crate::context::{ChainContext, FORKS_DIR, ROOT_CHAIN_FILE};
use crate::error::ChainError;
use crate::registry::ChainRegistry;
use crate::store::HeaderFile;

#[derive(Clone)]
struct ChainState {
    forkpoint: u64,
    forkpoint_hash: Hash32,
    prev_hash: Option<Hash32>,
    parent: Option<Arc<Chain>>,
    size: u64,
}

/// A contiguous run of headers persisted in one file, optionally extending a parent.
pub struct Chain {
    ctx: Arc<ChainContext>,
    state: ReentrantMutex<RefCell<ChainState>>,
}

impl fmt::Debug for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let guard = self.state.lock();
        let s = guard.borrow();
        f.debug_struct("Chain")
            .field("forkpoint", &s.forkpoint)
            .field("forkpoint_hash", &s.forkpoint_hash)
            .field("size", &s.size)
            .field("has_parent", &s.parent.is_some())
            .finish()
    }
}

impl Chain {
    /// Open the chain rooted at `forkpoint`, sizing it from its file.
    ///
    /// Forks at or below the checkpoint horizon are refused.
    pub fn open(
        ctx: Arc<ChainContext>,
        forkpoint: u64,
        parent: Option<Arc<Chain>>,
        forkpoint_hash: Hash32,
        prev_hash: Option<Hash32>,
    ) -> Result<Arc<Self>, ChainError> {
        let below_checkpoint = forkpoint > 0 && forkpoint <= ctx.params().max_checkpoint();
        if below_checkpoint || (parent.is_some() && forkpoint == 0) {
            return Err(ChainError::ForkBelowCheckpoint(forkpoint));
        }
        let chain = Arc::new(Self {
            ctx,
            state: ReentrantMutex::new(RefCell::new(ChainState {
                forkpoint,
                forkpoint_hash,
                prev_hash,
                parent,
                size: 0,
            })),
        });
        chain.update_size()?;
        Ok(chain)
    }

    /// Create a fork anchored at `header`, which must connect to `parent`.
    ///
    /// The header becomes the fork's first record and the fork is registered.
    /// If the fork already outweighs its parent the two are swapped.
    pub fn fork(
        parent: &Arc<Chain>,
        registry: &ChainRegistry,
        header: &Header,
    ) -> Result<Arc<Self>, ChainError> {
        if !parent.can_connect(header, false, false) {
            return Err(ChainError::DoesNotConnect(header.block_height));
        }
        let forkpoint = header.block_height;
        let prev_hash = parent.hash_before(forkpoint)?;
        let chain = Self::open(
            Arc::clone(&parent.ctx),
            forkpoint,
            Some(Arc::clone(parent)),
            hash_header(header),
            Some(prev_hash),
        )?;
        chain.file().create()?;
        info!(forkpoint, id = %chain.id(), "created fork");
        chain.save_header(registry, header)?;
        registry.insert(Arc::clone(&chain));
        Ok(chain)
    }

    fn snapshot(&self) -> ChainState {
        self.state.lock().borrow().clone()
    }

    /// Shared context.
    pub fn context(&self) -> &Arc<ChainContext> {
        &self.ctx
    }

    /// Height of the first header this chain owns.
    pub fn forkpoint(&self) -> u64 {
        self.state.lock().borrow().forkpoint
    }

    /// Hash of the header at the forkpoint; the chain's registry key.
    pub fn id(&self) -> Hash32 {
        self.state.lock().borrow().forkpoint_hash
    }

    /// Hash of the header just below the forkpoint (`None` for the root).
    pub fn prev_hash(&self) -> Option<Hash32> {
        self.state.lock().borrow().prev_hash
    }

    /// Chain supplying heights below the forkpoint.
    pub fn parent(&self) -> Option<Arc<Chain>> {
        self.state.lock().borrow().parent.clone()
    }

    pub(crate) fn set_parent(&self, parent: Option<Arc<Chain>>) {
        self.state.lock().borrow_mut().parent = parent;
    }

    /// Whether `other` is this very chain.
    pub fn is(&self, other: &Chain) -> bool {
        std::ptr::eq(self, other)
    }

    /// Whether `candidate` is this chain's parent.
    pub fn is_child_of(&self, candidate: &Chain) -> bool {
        self.parent().is_some_and(|p| p.is(candidate))
    }

    /// Number of headers stored in this chain's own file.
    pub fn size(&self) -> u64 {
        self.state.lock().borrow().size
    }

    /// First height this chain does not hold (`forkpoint + size`).
    pub fn next_height(&self) -> u64 {
        let guard = self.state.lock();
        let s = guard.borrow();
        s.forkpoint + s.size
    }

    /// Height of the tip (`forkpoint + size - 1`), `None` while empty from genesis.
    pub fn height(&self) -> Option<u64> {
        self.next_height().checked_sub(1)
    }

    /// Location of this chain's file.
    pub fn path(&self) -> PathBuf {
        let s = self.snapshot();
        let dir = self.ctx.headers_dir();
        if s.parent.is_none() {
            return dir.join(ROOT_CHAIN_FILE);
        }
        let prev = s.prev_hash.unwrap_or_default().to_hex_stripped();
        let first = s.forkpoint_hash.to_hex_stripped();
        dir.join(FORKS_DIR)
            .join(format!("fork2_{}_{}_{}", s.forkpoint, prev, first))
    }

    fn file(&self) -> HeaderFile<'_> {
        HeaderFile::new(self.ctx.headers_dir(), self.path())
    }

    /// Byte offset of `height` inside this chain's file.
    fn relative_offset(&self, height: u64, forkpoint: u64) -> u64 {
        let layout = self.ctx.layout();
        layout.byte_offset_of(height) - layout.byte_offset_of(forkpoint)
    }

    /// Recompute the header count from the file length.
    pub fn update_size(&self) -> Result<(), ChainError> {
        let guard = self.state.lock();
        let forkpoint = guard.borrow().forkpoint;
        let len = self.file().len()?;
        let layout = self.ctx.layout();
        let end = layout.height_at_offset(layout.byte_offset_of(forkpoint) + len);
        guard.borrow_mut().size = end.saturating_sub(forkpoint);
        Ok(())
    }

    /// Write `data` at `offset` bytes into this chain's file.
    ///
    /// With `truncate`, anything past `offset` is dropped first unless
    /// `offset` is the current end of the chain.
    pub fn write(&self, data: &[u8], offset: u64, truncate: bool) -> Result<(), ChainError> {
        let _guard = self.state.lock();
        let (forkpoint, next) = {
            let s = self.snapshot();
            (s.forkpoint, s.forkpoint + s.size)
        };
        let end = self.relative_offset(next, forkpoint);
        let truncate_at = (truncate && offset != end).then_some(offset);
        self.file().write_at(data, offset, truncate_at)?;
        self.update_size()
    }

    /// Header at `height`, looking through ancestors for lower heights.
    ///
    /// `Ok(None)` for heights past the tip and for all-zero records.
    pub fn read_header(&self, height: u64) -> Result<Option<Header>, ChainError> {
        let _guard = self.state.lock();
        let s = self.snapshot();
        if height < s.forkpoint {
            return match s.parent {
                Some(parent) => parent.read_header(height),
                None => Ok(None),
            };
        }
        if height >= s.forkpoint + s.size {
            return Ok(None);
        }

        let size = self.ctx.layout().header_size_at(height);
        let raw = self
            .file()
            .read_at(self.relative_offset(height, s.forkpoint), size)?;
        if raw.is_empty() {
            return Err(ChainError::MissingHeader(height));
        }
        if raw.len() < size {
            return Err(ChainError::TruncatedHeader {
                height,
                got: raw.len(),
            });
        }
        if raw.iter().all(|b| *b == 0) {
            return Ok(None);
        }
        Ok(Some(deserialize_header(&raw, height, self.ctx.layout())?))
    }

    /// Latest header of this chain.
    pub fn header_at_tip(&self) -> Result<Option<Header>, ChainError> {
        match self.height() {
            Some(height) => self.read_header(height),
            None => Ok(None),
        }
    }

    /// Hash of the header at `height`; height 0 is the network genesis.
    pub fn get_hash(&self, height: u64) -> Result<Hash32, ChainError> {
        if height == 0 {
            return Ok(self.ctx.params().genesis);
        }
        match self.read_header(height)? {
            Some(header) => Ok(hash_header(&header)),
            None => Err(ChainError::MissingHeader(height)),
        }
    }

    /// Hash of the header preceding `height`; the zero hash before genesis.
    pub fn hash_before(&self, height: u64) -> Result<Hash32, ChainError> {
        match height.checked_sub(1) {
            Some(prev) => self.get_hash(prev),
            None => Ok(Hash32::zero()),
        }
    }

    /// Whether the header at `height` hashes to `hash`. Errors count as `false`.
    pub fn check_hash(&self, height: u64, hash: &Hash32) -> bool {
        self.get_hash(height).map(|h| h == *hash).unwrap_or(false)
    }

    /// Whether this chain holds `header` at its height.
    pub fn check_header(&self, header: &Header) -> bool {
        self.check_hash(header.block_height, &hash_header(header))
    }

    /// Target required at `height`, resolving headers from this chain first
    /// and then from `pending` (headers verified but not yet written).
    pub fn get_target(&self, height: u64, pending: &[Header]) -> Result<BigUint, ChainError> {
        self.ctx.engine().required_target(height, |h| {
            if let Some(header) = self.read_header(h)? {
                return Ok(Some(header));
            }
            Ok(pending.iter().find(|p| p.block_height == h).cloned())
        })
    }

    /// Verify a header against its predecessor's hash and the required target.
    pub fn verify_header(
        &self,
        header: &Header,
        prev_hash: &Hash32,
        target: &BigUint,
        expected_hash: Option<&Hash32>,
        proof_provided: bool,
    ) -> Result<(), ChainError> {
        self.ctx
            .engine()
            .verify_header(header, prev_hash, target, expected_hash, proof_provided)?;
        Ok(())
    }

    /// Verify every header of chunk `index` in `data`; fails on the first bad one.
    pub fn verify_chunk(&self, index: u64, data: &[u8]) -> Result<(), ChainError> {
        let start = index * CHUNK_SIZE;
        let mut prev_hash = self.hash_before(start)?;
        let mut pending: Vec<Header> = Vec::new();

        for header in ChunkHeaders::new(self.ctx.layout(), start, data) {
            let header = header?;
            let height = header.block_height;
            let expected = match self.get_hash(height) {
                Ok(hash) => Some(hash),
                Err(ChainError::MissingHeader(_)) => None,
                Err(e) => return Err(e),
            };
            pending.push(header.clone());
            let target = self.get_target(height, &pending)?;
            self.verify_header(&header, &prev_hash, &target, expected.as_ref(), false)?;
            prev_hash = hash_header(&header);
        }
        Ok(())
    }

    /// Persist chunk `index`, then reorganize if this chain became heavier.
    ///
    /// Checkpointed chunks belong to the root chain regardless of which chain
    /// received them. Bytes below this chain's forkpoint are dropped.
    pub fn save_chunk(
        self: &Arc<Self>,
        registry: &ChainRegistry,
        index: u64,
        data: &[u8],
    ) -> Result<(), ChainError> {
        let start = index * CHUNK_SIZE;
        let within_checkpoints = start < self.ctx.params().max_checkpoint();
        if within_checkpoints && self.parent().is_some() {
            return registry.best_chain()?.save_chunk(registry, index, data);
        }

        {
            let _guard = self.state.lock();
            let forkpoint = self.forkpoint();
            let layout = self.ctx.layout();
            let chunk_offset = layout.byte_offset_of(start);
            let fork_offset = layout.byte_offset_of(forkpoint);
            let (data, offset) = if chunk_offset < fork_offset {
                let skip = (fork_offset - chunk_offset) as usize;
                (data.get(skip..).unwrap_or(&[]), 0)
            } else {
                (data, chunk_offset - fork_offset)
            };
            self.write(data, offset, !within_checkpoints)?;
        }
        self.swap_with_parent(registry)
    }

    /// Append `header` at the next height, then reorganize if needed.
    pub fn save_header(
        self: &Arc<Self>,
        registry: &ChainRegistry,
        header: &Header,
    ) -> Result<(), ChainError> {
        {
            let _guard = self.state.lock();
            let expected = self.next_height();
            if header.block_height != expected {
                return Err(ChainError::NotNextHeight {
                    height: header.block_height,
                    expected,
                });
            }
            let offset = self.relative_offset(header.block_height, self.forkpoint());
            self.write(&serialize_header(header), offset, true)?;
        }
        self.swap_with_parent(registry)
    }

    /// Whether `header` would validly extend this chain.
    ///
    /// With `check_height` the header must sit right above the tip. Never
    /// fails; any error reads as `false`.
    pub fn can_connect(&self, header: &Header, check_height: bool, proof_provided: bool) -> bool {
        if proof_provided {
            return true;
        }
        let height = header.block_height;
        if check_height && self.next_height() != height {
            return false;
        }
        if height == 0 {
            return hash_header(header) == self.ctx.params().genesis;
        }
        let Ok(prev_hash) = self.get_hash(height - 1) else {
            return false;
        };
        if prev_hash != header.prev_block_hash {
            return false;
        }
        let Ok(target) = self.get_target(height, &[]) else {
            return false;
        };
        self.verify_header(header, &prev_hash, &target, None, false)
            .is_ok()
    }

    /// Verify (unless proven) and save chunk `index`. Failures are logged and
    /// reported as `false`.
    pub fn connect_chunk(
        self: &Arc<Self>,
        registry: &ChainRegistry,
        index: u64,
        data: &[u8],
        proof_provided: bool,
    ) -> bool {
        let result = if proof_provided {
            Ok(())
        } else {
            self.verify_chunk(index, data)
        };
        match result.and_then(|()| self.save_chunk(registry, index, data)) {
            Ok(()) => true,
            Err(e) => {
                info!(index, error = %e, "verify_chunk failed");
                false
            }
        }
    }

    /// Cumulative work up to `height` (the tip when `None`).
    ///
    /// Work per retarget chunk is cached by the hash of the chunk's last
    /// header; a test network counts one unit per height.
    pub fn get_chainwork(&self, height: Option<u64>) -> Result<BigUint, ChainError> {
        let _guard = self.state.lock();
        let height = height.unwrap_or_else(|| self.height().unwrap_or(0));
        if self.ctx.params().testnet {
            return Ok(BigUint::from(height));
        }
        let cache = self.ctx.work_cache();

        // Chunk boundaries are counted in whole chunks: boundary `k` is the
        // header at height `k * CHUNK_SIZE - 1`, boundary 0 the sentinel.
        let last_boundary = height / CHUNK_SIZE;
        let mut boundary = last_boundary;
        let mut running = loop {
            if let Some(work) = cache.get(&self.boundary_hash(boundary)?) {
                break work;
            }
            if boundary == 0 {
                break BigUint::default();
            }
            boundary -= 1;
        };

        while boundary < last_boundary {
            boundary += 1;
            running += self.work_at(boundary * CHUNK_SIZE - 1)? * CHUNK_SIZE;
            cache.insert(self.boundary_hash(boundary)?, running.clone());
        }

        let partial = self.work_at((boundary + 1) * CHUNK_SIZE - 1)? * (height % CHUNK_SIZE + 1);
        Ok(running + partial)
    }

    fn boundary_hash(&self, boundary: u64) -> Result<Hash32, ChainError> {
        self.hash_before(boundary * CHUNK_SIZE)
    }

    fn work_at(&self, height: u64) -> Result<BigUint, ChainError> {
        Ok(work_from_target(&self.get_target(height, &[])?)?)
    }

    /// Chains whose parent is this chain.
    pub fn get_direct_children(&self, registry: &ChainRegistry) -> Vec<Arc<Chain>> {
        registry
            .chains()
            .into_iter()
            .filter(|c| c.is_child_of(self))
            .collect()
    }

    /// Highest forkpoint among direct children.
    pub fn get_max_child(&self, registry: &ChainRegistry) -> Option<u64> {
        self.get_direct_children(registry)
            .iter()
            .map(|c| c.forkpoint())
            .max()
    }

    /// Highest height where something forks off this chain, or its own forkpoint.
    pub fn get_max_forkpoint(&self, registry: &ChainRegistry) -> u64 {
        self.get_max_child(registry)
            .unwrap_or_else(|| self.forkpoint())
    }

    /// Headers from the highest fork on this chain up to its tip.
    pub fn get_branch_size(&self, registry: &ChainRegistry) -> u64 {
        let _registry = registry.lock();
        let _guard = self.state.lock();
        self.next_height()
            .saturating_sub(self.get_max_forkpoint(registry))
    }

    /// Short display name: leading significant hex digits of the hash at the
    /// highest forkpoint.
    pub fn get_name(&self, registry: &ChainRegistry) -> Result<String, ChainError> {
        let hash = self.get_hash(self.get_max_forkpoint(registry))?;
        Ok(hash.to_hex_stripped().chars().take(10).collect())
    }

    /// Each ancestor (and this chain) with the height of the last block shared with it.
    pub fn get_parent_heights(self: &Arc<Self>, registry: &ChainRegistry) -> Vec<(Arc<Chain>, u64)> {
        let _registry = registry.lock();
        let mut out = vec![(Arc::clone(self), self.height().unwrap_or(0))];
        let mut chain = Arc::clone(self);
        while let Some(parent) = chain.parent() {
            out.push((Arc::clone(&parent), chain.forkpoint() - 1));
            chain = parent;
        }
        out
    }

    /// Height of the last header this chain shares with `other`.
    pub fn get_height_of_last_common_block_with_chain(
        self: &Arc<Self>,
        other: &Arc<Chain>,
        registry: &ChainRegistry,
    ) -> u64 {
        let ours = self.get_parent_heights(registry);
        let theirs = other.get_parent_heights(registry);
        let mut last_common = 0;
        for (chain, our_height) in &ours {
            if let Some((_, their_height)) = theirs.iter().find(|(c, _)| c.is(chain)) {
                last_common = last_common.max((*our_height).min(*their_height));
            }
        }
        last_common
    }

    /// Swap with the parent for as long as this chain carries more work.
    ///
    /// Former siblings that now descend from this chain are re-parented.
    pub fn swap_with_parent(self: &Arc<Self>, registry: &ChainRegistry) -> Result<(), ChainError> {
        let _registry = registry.lock();
        let _guard = self.state.lock();
        let mut count = 0;
        loop {
            let old_parent = self.parent();
            if !self.swap_step(registry)? {
                return Ok(());
            }
            count += 1;
            if count > registry.len() {
                return Err(ChainError::SwapOverrun(count));
            }
            let Some(old_parent) = old_parent else {
                continue;
            };
            for sibling in old_parent.get_direct_children(registry) {
                let (forkpoint, prev) = (sibling.forkpoint(), sibling.prev_hash());
                if let Some(prev) = prev {
                    if self.check_hash(forkpoint - 1, &prev) {
                        debug!(forkpoint, "re-parenting former sibling");
                        sibling.set_parent(Some(Arc::clone(self)));
                    }
                }
            }
        }
    }

    /// One swap: if heavier than the parent, exchange file contents and
    /// identities so this chain takes the parent's place.
    fn swap_step(self: &Arc<Self>, registry: &ChainRegistry) -> Result<bool, ChainError> {
        let Some(parent) = self.parent() else {
            return Ok(false);
        };
        if parent.get_chainwork(None)? >= self.get_chainwork(None)? {
            return Ok(false);
        }
        let _parent_guard = parent.state.lock();

        let forkpoint = self.forkpoint();
        let parent_forkpoint = parent.forkpoint();
        info!(forkpoint, parent_forkpoint, "swapping chain with parent");
        if forkpoint <= parent_forkpoint {
            return Err(ChainError::SwapOrder {
                child: forkpoint,
                parent: parent_forkpoint,
            });
        }
        let child_old_id = self.id();
        let parent_old_id = parent.id();

        // Read both sides completely before touching either file.
        let child_old_file = self.file();
        let child_old_path = child_old_file.path().to_path_buf();
        let my_data = child_old_file.read_from(0)?;
        let split = self.relative_offset(forkpoint, parent_forkpoint);
        let parent_data = parent.file().read_from(split)?;

        self.write(&parent_data, 0, true)?;
        parent.write(&my_data, split, true)?;

        let first_size = self.ctx.layout().header_size_at(forkpoint);
        let parent_new_hash = parent_data.get(..first_size).map(hash_raw_header);
        {
            let mut child = self.state.lock().borrow().clone();
            let mut old = parent.state.lock().borrow().clone();
            std::mem::swap(&mut child.forkpoint, &mut old.forkpoint);
            std::mem::swap(&mut child.prev_hash, &mut old.prev_hash);
            child.parent = old.parent.take();
            old.parent = Some(Arc::clone(self));
            child.forkpoint_hash = parent_old_id;
            old.forkpoint_hash = parent_new_hash.unwrap_or_default();
            *self.state.lock().borrow_mut() = child;
            *parent.state.lock().borrow_mut() = old;
        }

        registry.remove(&child_old_id);
        registry.remove(&parent_old_id);
        if parent_new_hash.is_some() {
            HeaderFile::new(self.ctx.headers_dir(), child_old_path).replace(&parent.path())?;
            registry.insert(Arc::clone(&parent));
        } else {
            // The parent held nothing at or above the forkpoint; it is now empty.
            debug!(forkpoint, "dropping emptied parent segment");
            HeaderFile::new(self.ctx.headers_dir(), child_old_path).remove()?;
        }
        parent.update_size()?;
        self.update_size()?;
        registry.insert(Arc::clone(self));
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wgr_core::{EraLayout, NetworkParams};

    fn header(prev: Hash32, height: u64) -> Header {
        Header {
            version: 3,
            prev_block_hash: prev,
            merkle_root: Hash32([height as u8; 32]),
            timestamp: 1_600_000_000 + height as u32 * 60,
            bits: 0x1e0f_ffff,
            nonce: 0,
            block_height: height,
            acc_checkpoint: None,
        }
    }

    fn setup(count: u64) -> (tempfile::TempDir, ChainRegistry, Vec<Header>) {
        let mut headers = vec![header(Hash32::zero(), 0)];
        for h in 1..count {
            let prev = hash_header(&headers[h as usize - 1]);
            headers.push(header(prev, h));
        }
        let params = NetworkParams {
            name: "unittest",
            testnet: true,
            genesis: hash_header(&headers[0]),
            checkpoints: Vec::new(),
            layout: Arc::new(EraLayout::new(1_000_000, 2_000_000, 112)),
        };
        let dir = tempfile::tempdir().unwrap();
        let ctx = Arc::new(ChainContext::with_default_difficulty(
            params,
            dir.path().join("headers"),
        ));
        let registry = ChainRegistry::open(ctx).unwrap();
        let data: Vec<u8> = headers.iter().flat_map(serialize_header).collect();
        registry.best_chain().unwrap().save_chunk(&registry, 0, &data).unwrap();
        (dir, registry, headers)
    }

    #[test]
    fn root_reports_height_and_hashes() {
        let (_dir, registry, headers) = setup(10);
        let root = registry.best_chain().unwrap();
        assert_eq!(root.size(), 10);
        assert_eq!(root.height(), Some(9));
        assert_eq!(root.get_hash(5).unwrap(), hash_header(&headers[5]));
        assert_eq!(root.hash_before(0).unwrap(), Hash32::zero());
        assert_eq!(root.header_at_tip().unwrap(), Some(headers[9].clone()));
        assert_eq!(root.read_header(10).unwrap(), None);
        assert!(matches!(root.get_hash(10), Err(ChainError::MissingHeader(10))));
    }

    #[test]
    fn zeroed_record_reads_as_absent() {
        let (_dir, registry, _) = setup(5);
        let root = registry.best_chain().unwrap();
        root.write(&[0u8; 80], 80 * 2, false).unwrap();
        assert_eq!(root.read_header(2).unwrap(), None);
        assert!(root.read_header(3).unwrap().is_some());
    }

    #[test]
    fn truncated_tail_is_detected() {
        let (_dir, registry, _) = setup(5);
        let root = registry.best_chain().unwrap();
        // Shrink the file behind the chain's back.
        root.file().write_at(&[], 0, Some(80 * 4 + 10)).unwrap();
        assert!(matches!(
            root.read_header(4),
            Err(ChainError::TruncatedHeader { height: 4, got: 10 })
        ));
        root.update_size().unwrap();
        assert_eq!(root.size(), 4);
    }

    #[test]
    fn save_header_requires_next_height() {
        let (_dir, registry, headers) = setup(10);
        let root = registry.best_chain().unwrap();
        let skip = header(hash_header(&headers[9]), 12);
        assert!(matches!(
            root.save_header(&registry, &skip),
            Err(ChainError::NotNextHeight { height: 12, expected: 10 })
        ));
        let next = header(hash_header(&headers[9]), 10);
        root.save_header(&registry, &next).unwrap();
        assert_eq!(root.height(), Some(10));
    }

    #[test]
    fn can_connect_checks_height_and_link() {
        let (_dir, registry, headers) = setup(10);
        let root = registry.best_chain().unwrap();
        let next = header(hash_header(&headers[9]), 10);
        assert!(root.can_connect(&next, true, false));
        assert!(root.can_connect(&headers[0], false, false));

        let stray = header(Hash32([0x42; 32]), 10);
        assert!(!root.can_connect(&stray, true, false));
        assert!(root.can_connect(&stray, true, true));
        // Connecting below the tip needs check_height off.
        let alt = header(hash_header(&headers[4]), 5);
        assert!(!root.can_connect(&alt, true, false));
        assert!(root.can_connect(&alt, false, false));
    }

    #[test]
    fn chainwork_on_test_network_is_height() {
        let (_dir, registry, _) = setup(10);
        let root = registry.best_chain().unwrap();
        assert_eq!(root.get_chainwork(None).unwrap(), BigUint::from(9u32));
        assert_eq!(root.get_chainwork(Some(3)).unwrap(), BigUint::from(3u32));
    }

    #[test]
    fn fork_file_name_encodes_identity() {
        let (_dir, registry, headers) = setup(10);
        let root = registry.best_chain().unwrap();
        let mut alt = header(hash_header(&headers[4]), 5);
        alt.nonce = 7;
        let fork = Chain::fork(&root, &registry, &alt).unwrap();
        let name = fork.path().file_name().unwrap().to_string_lossy().into_owned();
        assert_eq!(
            name,
            format!(
                "fork2_5_{}_{}",
                hash_header(&headers[4]).to_hex_stripped(),
                hash_header(&alt).to_hex_stripped()
            )
        );
        assert!(fork.path().exists());
        assert_eq!(fork.prev_hash(), Some(hash_header(&headers[4])));
        assert!(fork.is_child_of(&root));
    }
}
