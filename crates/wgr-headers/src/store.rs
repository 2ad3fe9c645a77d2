//! Durable per-chain header files.
//!
//! Each chain owns one file of contiguous header records addressed by byte
//! offset relative to its forkpoint. Every write is flushed and synced
//! before returning.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::error::ChainError;

/// Handle to one chain file inside the headers directory.
#[derive(Clone, Debug)]
pub(crate) struct HeaderFile<'a> {
    dir: &'a Path,
    path: PathBuf,
}

impl<'a> HeaderFile<'a> {
    pub(crate) fn new(dir: &'a Path, path: PathBuf) -> Self {
        Self { dir, path }
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// Fails with the more specific error when the whole directory is gone.
    pub(crate) fn ensure_available(&self) -> Result<(), ChainError> {
        if self.path.exists() {
            Ok(())
        } else if !self.dir.exists() {
            Err(ChainError::HeadersDirMissing(self.dir.to_path_buf()))
        } else {
            Err(ChainError::HeadersFileMissing(self.path.clone()))
        }
    }

    /// File length, zero when absent.
    pub(crate) fn len(&self) -> Result<u64, ChainError> {
        match fs::metadata(&self.path) {
            Ok(meta) => Ok(meta.len()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(0),
            Err(e) => Err(e.into()),
        }
    }

    /// Create or empty the file.
    pub(crate) fn create(&self) -> Result<(), ChainError> {
        File::create(&self.path)?.sync_all()?;
        Ok(())
    }

    /// Up to `len` bytes starting at `offset`; shorter near the end of file.
    pub(crate) fn read_at(&self, offset: u64, len: usize) -> Result<Vec<u8>, ChainError> {
        self.ensure_available()?;
        let mut f = File::open(&self.path)?;
        f.seek(SeekFrom::Start(offset))?;
        let mut buf = Vec::with_capacity(len);
        f.take(len as u64).read_to_end(&mut buf)?;
        Ok(buf)
    }

    /// Everything from `offset` to the end of file.
    pub(crate) fn read_from(&self, offset: u64) -> Result<Vec<u8>, ChainError> {
        self.ensure_available()?;
        let mut f = File::open(&self.path)?;
        f.seek(SeekFrom::Start(offset))?;
        let mut buf = Vec::new();
        f.read_to_end(&mut buf)?;
        Ok(buf)
    }

    /// Write `data` at `offset`, first cutting the file at `truncate_at` if given.
    pub(crate) fn write_at(
        &self,
        data: &[u8],
        offset: u64,
        truncate_at: Option<u64>,
    ) -> Result<(), ChainError> {
        self.ensure_available()?;
        let mut f = OpenOptions::new().read(true).write(true).open(&self.path)?;
        if let Some(at) = truncate_at {
            f.set_len(at)?;
        }
        f.seek(SeekFrom::Start(offset))?;
        f.write_all(data)?;
        f.flush()?;
        f.sync_all()?;
        Ok(())
    }

    /// Atomically move this file over `to`.
    pub(crate) fn replace(&self, to: &Path) -> Result<(), ChainError> {
        fs::rename(&self.path, to)?;
        Ok(())
    }

    /// Delete the file if present.
    pub(crate) fn remove(&self) -> Result<(), ChainError> {
        match fs::remove_file(&self.path) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}
