// backend module: protocol adapters behind one capability trait
pub mod ftp;
pub mod mock;
pub mod sftp;

use std::path::Path;

use chrono::{DateTime, Utc};

use crate::error::RemoteError;
use crate::path::{bare_name, join};

/// Upper bound on worklist steps taken by the default recursive delete. A
/// backend whose listing never drains (always reports the same non-empty
/// directory) hits this bound and fails instead of looping forever.
pub const MAX_DELETE_STEPS: usize = 512;

/// Trait abstracting the remote-filesystem capability set the session
/// needs: {home, chdir, list, mkdir, rename, delete, get, put, size, stat}.
/// One implementor per protocol, so call sites dispatch through the trait
/// object instead of branching on a backend flag.
pub trait RemoteBackend {
    /// Home directory reported by the server right after login.
    fn home_dir(&mut self) -> Result<String, RemoteError>;

    fn change_dir(&mut self, path: &str) -> Result<(), RemoteError>;

    /// Raw name listing of `path`. Entries may carry a path prefix and may
    /// include `.`/`..`; the session normalizes, not the backend.
    fn list_names(&mut self, path: &str) -> Result<Vec<String>, RemoteError>;

    fn make_dir(&mut self, path: &str) -> Result<(), RemoteError>;

    fn rename(&mut self, from: &str, to: &str) -> Result<(), RemoteError>;

    fn remove_file(&mut self, path: &str) -> Result<(), RemoteError>;

    /// Remove an EMPTY directory.
    fn remove_dir(&mut self, path: &str) -> Result<(), RemoteError>;

    /// Recursive removal over the non-recursive primitives: try a plain
    /// file delete, then an empty-dir delete, otherwise list the directory,
    /// queue its children and retry once they are gone. Explicit worklist
    /// with a hard step bound — see `MAX_DELETE_STEPS`.
    ///
    /// Backends whose client offers a richer deletion surface (SFTP stat)
    /// override this.
    fn remove_dir_all(&mut self, path: &str) -> Result<(), RemoteError> {
        let mut stack: Vec<String> = vec![path.to_string()];
        let mut steps = 0usize;
        while let Some(cur) = stack.last().cloned() {
            steps += 1;
            if steps > MAX_DELETE_STEPS {
                return Err(RemoteError::backend(
                    "recursive delete",
                    path,
                    format!("listing never drained after {} steps", MAX_DELETE_STEPS),
                ));
            }
            if self.remove_file(&cur).is_ok() || self.remove_dir(&cur).is_ok() {
                stack.pop();
                continue;
            }
            // 既不是文件也不是空目录：列出子项后重试 — Neither a file nor an
            // empty directory: enumerate children, delete them, then retry.
            let children: Vec<String> = self
                .list_names(&cur)?
                .iter()
                .map(|e| bare_name(e).to_string())
                .filter(|n| !matches!(n.as_str(), "." | ".."))
                .collect();
            if children.is_empty() {
                self.remove_dir(&cur)?;
                stack.pop();
                continue;
            }
            for name in children {
                stack.push(join(&cur, &name));
            }
        }
        Ok(())
    }

    /// Fetch `remote` into the local staging file, binary mode.
    fn download(&mut self, remote: &str, local: &Path) -> Result<(), RemoteError>;

    /// Send the local staging file to `remote`, binary mode.
    fn upload(&mut self, local: &Path, remote: &str) -> Result<(), RemoteError>;

    fn size(&mut self, path: &str) -> Result<u64, RemoteError>;

    fn modified(&mut self, path: &str) -> Result<DateTime<Utc>, RemoteError>;

    /// Tear the session down. Idempotent; backends with library-managed
    /// sockets may no-op.
    fn close(&mut self) -> Result<(), RemoteError>;
}
