use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::RemoteError;

// Process-wide counter so every session gets its own slot file even when
// several sessions run inside one test binary.
static SLOT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Local scratch area for staged transfers: one directory plus a single
/// fixed-name slot file reused by every download and upload of the owning
/// session. The slot name embeds the pid and a per-process sequence number,
/// so repeated or concurrent test runs never share a slot.
pub struct StagingArea {
    dir: PathBuf,
    file_name: String,
}

impl StagingArea {
    pub fn new(dir: PathBuf) -> Self {
        let seq = SLOT_SEQ.fetch_add(1, Ordering::SeqCst);
        let file_name = format!("staged_{}_{}.bin", std::process::id(), seq);
        StagingArea { dir, file_name }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn file_path(&self) -> PathBuf {
        self.dir.join(&self.file_name)
    }

    /// Verify the scratch directory exists, is a directory and is writable.
    /// Called before every transfer; a missing or read-only directory is a
    /// reported failure, not a panic.
    pub fn ensure_writable(&self) -> Result<(), RemoteError> {
        let meta = std::fs::metadata(&self.dir).map_err(|e| {
            RemoteError::LocalStorage(self.dir.clone(), format!("scratch dir missing: {}", e))
        })?;
        if !meta.is_dir() {
            return Err(RemoteError::LocalStorage(
                self.dir.clone(),
                "scratch path is not a directory".to_string(),
            ));
        }
        if meta.permissions().readonly() {
            return Err(RemoteError::LocalStorage(
                self.dir.clone(),
                "scratch dir is read-only".to_string(),
            ));
        }
        Ok(())
    }

    /// Create the scratch directory if needed, then verify it.
    pub fn prepare(&self) -> Result<(), RemoteError> {
        if !self.dir.exists() {
            std::fs::create_dir_all(&self.dir).map_err(|e| {
                RemoteError::LocalStorage(self.dir.clone(), format!("create failed: {}", e))
            })?;
        }
        self.ensure_writable()
    }

    /// Overwrite the slot with `bytes`.
    pub fn write(&self, bytes: &[u8]) -> Result<(), RemoteError> {
        std::fs::write(self.file_path(), bytes).map_err(|e| {
            RemoteError::LocalStorage(self.file_path(), format!("write failed: {}", e))
        })
    }

    /// Read the slot's current bytes back.
    pub fn read(&self) -> Result<Vec<u8>, RemoteError> {
        std::fs::read(self.file_path()).map_err(|e| {
            RemoteError::LocalStorage(self.file_path(), format!("read-back failed: {}", e))
        })
    }

    /// Best-effort removal of the slot file; used by teardown.
    pub fn remove(&self) {
        let p = self.file_path();
        if p.exists() {
            let _ = std::fs::remove_file(&p);
        }
    }
}
