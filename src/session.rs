use chrono::{DateTime, Utc};
use regex::Regex;

use crate::backend::{self, RemoteBackend};
use crate::config::{BackendKind, RemoteConfig};
use crate::error::RemoteError;
use crate::path::{bare_name, is_noise_entry, resolve, with_trailing_sep};
use crate::staging::StagingArea;

/// In-memory copy of the most recently downloaded or uploaded file,
/// kept for content assertions. Overwritten by each new transfer.
pub struct OpenFile {
    pub path: String,
    pub contents: Vec<u8>,
}

impl OpenFile {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.contents).to_string()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.text().contains(needle)
    }

    pub fn equals(&self, expected: &[u8]) -> bool {
        self.contents == expected
    }
}

/// Remote test session: the facade acceptance tests drive. Owns at most one
/// open backend connection, the logical current directory (always
/// `/`-terminated), the open-file buffer and the local staging slot.
///
/// Strictly synchronous and single-threaded; each operation performs at
/// most one network round trip (the recursive delete a small bounded set)
/// and no operation retries.
pub struct RemoteSession {
    config: RemoteConfig,
    backend: Option<Box<dyn RemoteBackend>>,
    current_path: String,
    open_file: Option<OpenFile>,
    staging: StagingArea,
}

impl RemoteSession {
    pub fn new(config: RemoteConfig) -> Self {
        let staging = StagingArea::new(config.staging_dir());
        RemoteSession {
            config,
            backend: None,
            current_path: "/".to_string(),
            open_file: None,
            staging,
        }
    }

    pub fn config(&self) -> &RemoteConfig {
        &self.config
    }

    pub fn staging(&self) -> &StagingArea {
        &self.staging
    }

    pub fn is_connected(&self) -> bool {
        self.backend.is_some()
    }

    // -- session lifecycle

    /// Open a session against the configured backend. Any existing session
    /// is closed first; the current directory is initialized from the
    /// server's reported home.
    pub fn login(&mut self, user: &str, password: &str) -> Result<(), RemoteError> {
        self.config.validate()?;
        let _ = self.logout();
        let boxed: Box<dyn RemoteBackend> = match self.config.backend {
            BackendKind::Ftp => Box::new(backend::ftp::connect(&self.config, user, password)?),
            BackendKind::Sftp => Box::new(backend::sftp::connect(&self.config, user, password)?),
        };
        self.attach(boxed)
    }

    /// Adopt an already-connected backend. `login` funnels through here;
    /// tests attach the in-memory mock directly.
    pub fn attach(&mut self, mut backend: Box<dyn RemoteBackend>) -> Result<(), RemoteError> {
        let home = backend.home_dir()?;
        self.current_path = with_trailing_sep(&home);
        self.backend = Some(backend);
        tracing::debug!("session opened, home dir {}", self.current_path);
        Ok(())
    }

    /// Close the session if one is open. Idempotent.
    pub fn logout(&mut self) -> Result<(), RemoteError> {
        match self.backend.take() {
            Some(mut b) => b.close(),
            None => Ok(()),
        }
    }

    /// Host-runner hook: prepare the staging area and log in with the
    /// configured credentials.
    pub fn before_test(&mut self) -> Result<(), RemoteError> {
        self.staging.prepare()?;
        let (user, password) = (self.config.username.clone(), self.config.password.clone());
        self.login(&user, &password)
    }

    /// Host-runner hook: log out, then drop the staging file when cleanup
    /// is configured.
    pub fn after_test(&mut self) -> Result<(), RemoteError> {
        let closed = self.logout();
        if self.config.cleanup {
            self.staging.remove();
        }
        closed
    }

    fn backend_mut(&mut self) -> Result<&mut Box<dyn RemoteBackend>, RemoteError> {
        let addr = self.config.addr();
        self.backend
            .as_mut()
            .ok_or_else(|| RemoteError::Connection(addr, "session not open".to_string()))
    }

    // -- path context

    pub fn current_directory(&self) -> &str {
        &self.current_path
    }

    /// Resolve `path` against the current directory; pure string work, no
    /// round trip. `..` segments pass through uncollapsed.
    pub fn resolve(&self, path: &str) -> String {
        resolve(&self.current_path, path)
    }

    /// Change the logical working directory. The current path is only
    /// overwritten once the backend accepts the target.
    pub fn change_directory(&mut self, path: &str) -> Result<(), RemoteError> {
        let target = self.resolve(path);
        tracing::debug!("chdir {}", target);
        self.backend_mut()?.change_dir(&target)?;
        self.current_path = with_trailing_sep(&target);
        Ok(())
    }

    // -- listing & search

    /// Name-listing of `path` (relative paths resolve against the current
    /// directory; "" lists the current directory itself). Entries come back
    /// as bare names; with `ignore_noise` the `.`/`..`/`thumbs.db` entries
    /// are dropped, any letter case. An empty directory is an empty Vec,
    /// not a failure.
    pub fn list_files(&mut self, path: &str, ignore_noise: bool) -> Result<Vec<String>, RemoteError> {
        let target = self.resolve(path);
        tracing::debug!("list {}", target);
        let raw = self.backend_mut()?.list_names(&target)?;
        Ok(raw
            .iter()
            .map(|entry| bare_name(entry).to_string())
            .filter(|name| !ignore_noise || !is_noise_entry(name))
            .collect())
    }

    /// Assert `name` appears in the listing of `path`. Exact,
    /// case-sensitive match.
    pub fn file_exists(&mut self, name: &str, path: &str) -> Result<(), RemoteError> {
        let names = self.list_files(path, true)?;
        if names.iter().any(|n| n == name) {
            Ok(())
        } else {
            Err(RemoteError::Assertion(format!(
                "file '{}' not found in '{}'",
                name,
                self.resolve(path)
            )))
        }
    }

    /// Assert `name` does NOT appear in the listing of `path`.
    pub fn file_absent(&mut self, name: &str, path: &str) -> Result<(), RemoteError> {
        let names = self.list_files(path, true)?;
        if names.iter().any(|n| n == name) {
            Err(RemoteError::Assertion(format!(
                "file '{}' unexpectedly present in '{}'",
                name,
                self.resolve(path)
            )))
        } else {
            Ok(())
        }
    }

    /// Assert at least one listing entry matches `pattern`; the first match
    /// short-circuits the scan.
    pub fn any_file_matches(&mut self, pattern: &str, path: &str) -> Result<(), RemoteError> {
        let re = compile(pattern)?;
        let names = self.list_files(path, true)?;
        if names.iter().any(|n| re.is_match(n)) {
            Ok(())
        } else {
            Err(RemoteError::Assertion(format!(
                "no file matching '{}' in '{}'",
                pattern,
                self.resolve(path)
            )))
        }
    }

    /// Assert no listing entry matches `pattern`; the whole listing is
    /// scanned and the first match found fails the assertion.
    pub fn no_file_matches(&mut self, pattern: &str, path: &str) -> Result<(), RemoteError> {
        let re = compile(pattern)?;
        let names = self.list_files(path, true)?;
        for name in &names {
            if re.is_match(name) {
                return Err(RemoteError::Assertion(format!(
                    "file '{}' matches '{}' in '{}'",
                    name,
                    pattern,
                    self.resolve(path)
                )));
            }
        }
        Ok(())
    }

    // -- transfer

    /// Fetch `remote` through the staging slot into the open-file buffer.
    pub fn download(&mut self, remote: &str) -> Result<(), RemoteError> {
        let target = self.resolve(remote);
        tracing::debug!("download {}", target);
        self.staging.ensure_writable()?;
        let slot = self.staging.file_path();
        self.backend_mut()?.download(&target, &slot)?;
        let contents = self.staging.read()?;
        self.open_file = Some(OpenFile { path: target, contents });
        Ok(())
    }

    /// Stage `contents` and send them to `remote`. The open-file buffer is
    /// set BEFORE the network call, so assertions about the file just
    /// written hold even when the remote write has not been confirmed.
    pub fn upload(&mut self, remote: &str, contents: &[u8]) -> Result<(), RemoteError> {
        let target = self.resolve(remote);
        tracing::debug!("upload {} ({} bytes)", target, contents.len());
        self.staging.ensure_writable()?;
        self.staging.write(contents)?;
        self.open_file = Some(OpenFile { path: target.clone(), contents: contents.to_vec() });
        let slot = self.staging.file_path();
        self.backend_mut()?.upload(&slot, &target)
    }

    /// Buffer of the most recent download/upload, if any.
    pub fn open_file(&self) -> Option<&OpenFile> {
        self.open_file.as_ref()
    }

    // -- directory & file mutation

    pub fn make_directory(&mut self, path: &str) -> Result<(), RemoteError> {
        let target = self.resolve(path);
        tracing::debug!("mkdir {}", target);
        self.backend_mut()?.make_dir(&target)
    }

    /// Rename/move; files and directories go through the same call.
    pub fn rename_path(&mut self, from: &str, to: &str) -> Result<(), RemoteError> {
        let (from, to) = (self.resolve(from), self.resolve(to));
        tracing::debug!("rename {} -> {}", from, to);
        self.backend_mut()?.rename(&from, &to)
    }

    /// Delete a file or a whole directory tree: plain-file delete first,
    /// then the backend's recursive removal.
    pub fn delete(&mut self, path: &str) -> Result<(), RemoteError> {
        let target = self.resolve(path);
        tracing::debug!("delete {}", target);
        let be = self.backend_mut()?;
        if be.remove_file(&target).is_ok() {
            return Ok(());
        }
        be.remove_dir_all(&target)
    }

    /// Recursively delete `path`, then recreate it empty. Not atomic: a
    /// failure between the two steps leaves the directory absent.
    pub fn clear_directory(&mut self, path: &str) -> Result<(), RemoteError> {
        let target = self.resolve(path);
        tracing::debug!("clear {}", target);
        let be = self.backend_mut()?;
        be.remove_dir_all(&target)?;
        be.make_dir(&target)
    }

    /// No backend pairing here can copy server-side.
    pub fn copy_directory(&mut self, _from: &str, _to: &str) -> Result<(), RemoteError> {
        Err(RemoteError::Unsupported("copy directory"))
    }

    // -- metadata

    pub fn file_size(&mut self, path: &str) -> Result<u64, RemoteError> {
        let target = self.resolve(path);
        self.backend_mut()?.size(&target)
    }

    pub fn file_modified_time(&mut self, path: &str) -> Result<DateTime<Utc>, RemoteError> {
        let target = self.resolve(path);
        self.backend_mut()?.modified(&target)
    }
}

fn compile(pattern: &str) -> Result<Regex, RemoteError> {
    Regex::new(pattern)
        .map_err(|e| RemoteError::Assertion(format!("invalid pattern '{}': {}", pattern, e)))
}
