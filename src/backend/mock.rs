#![allow(dead_code)]
// In-memory remote filesystem used by the test suite. State sits behind an
// Arc<Mutex<..>> so tests keep a handle for seeding and inspection while
// the session owns the boxed backend.
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};

use crate::backend::RemoteBackend;
use crate::error::RemoteError;

#[derive(Default)]
struct MockState {
    dirs: BTreeSet<String>,
    files: BTreeMap<String, Vec<u8>>,
    mtimes: BTreeMap<String, i64>,
    home: String,
    // knobs
    list_with_prefix: bool,
    list_dot_entries: bool,
    fail_uploads: bool,
    pathological_listing: Option<Vec<String>>,
    closed: bool,
}

fn norm(path: &str) -> String {
    if path.len() > 1 { path.trim_end_matches('/').to_string() } else { path.to_string() }
}

fn parent_of(path: &str) -> String {
    match path.rfind('/') {
        Some(0) => "/".to_string(),
        Some(i) => path[..i].to_string(),
        None => "/".to_string(),
    }
}

fn name_of(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Test-side handle to the shared mock state.
#[derive(Clone)]
pub struct MockRemote {
    state: Arc<Mutex<MockState>>,
}

impl MockRemote {
    pub fn new() -> Self {
        let mut state = MockState { home: "/".to_string(), ..Default::default() };
        state.dirs.insert("/".to_string());
        MockRemote { state: Arc::new(Mutex::new(state)) }
    }

    /// Backend instance sharing this handle's state; box it into a session.
    pub fn backend(&self) -> MockBackend {
        MockBackend { state: self.state.clone() }
    }

    pub fn with_home(self, home: &str) -> Self {
        {
            let mut st = self.state.lock().unwrap();
            st.home = norm(home);
            let mut cur = norm(home);
            loop {
                st.dirs.insert(cur.clone());
                if cur == "/" {
                    break;
                }
                cur = parent_of(&cur);
            }
        }
        self
    }

    pub fn seed_dir(&self, path: &str) {
        self.state.lock().unwrap().dirs.insert(norm(path));
    }

    pub fn seed_file(&self, path: &str, bytes: &[u8]) {
        let mut st = self.state.lock().unwrap();
        st.files.insert(norm(path), bytes.to_vec());
        st.mtimes.entry(norm(path)).or_insert(1_600_000_000);
    }

    pub fn set_mtime(&self, path: &str, ts: i64) {
        self.state.lock().unwrap().mtimes.insert(norm(path), ts);
    }

    pub fn has_file(&self, path: &str) -> bool {
        self.state.lock().unwrap().files.contains_key(&norm(path))
    }

    pub fn has_dir(&self, path: &str) -> bool {
        self.state.lock().unwrap().dirs.contains(&norm(path))
    }

    pub fn file_bytes(&self, path: &str) -> Option<Vec<u8>> {
        self.state.lock().unwrap().files.get(&norm(path)).cloned()
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().unwrap().closed
    }

    /// Make the backend return listing entries carrying a full path prefix,
    /// the way FTP servers often answer NLST.
    pub fn list_with_prefix(&self) {
        self.state.lock().unwrap().list_with_prefix = true;
    }

    /// Make listings include `.`, `..` and a `Thumbs.db` dropping.
    pub fn list_dot_entries(&self) {
        self.state.lock().unwrap().list_dot_entries = true;
    }

    /// Every upload fails after the session has staged the bytes.
    pub fn fail_uploads(&self) {
        self.state.lock().unwrap().fail_uploads = true;
    }

    /// Every listing reports the same non-empty set of names and every
    /// delete fails — the worst case the bounded recursive delete guards
    /// against.
    pub fn pathological_listing(&self, names: &[&str]) {
        self.state.lock().unwrap().pathological_listing =
            Some(names.iter().map(|s| s.to_string()).collect());
    }
}

impl Default for MockRemote {
    fn default() -> Self {
        Self::new()
    }
}

pub struct MockBackend {
    state: Arc<Mutex<MockState>>,
}

impl RemoteBackend for MockBackend {
    fn home_dir(&mut self) -> Result<String, RemoteError> {
        Ok(self.state.lock().unwrap().home.clone())
    }

    fn change_dir(&mut self, path: &str) -> Result<(), RemoteError> {
        let st = self.state.lock().unwrap();
        if st.dirs.contains(&norm(path)) {
            Ok(())
        } else {
            Err(RemoteError::backend("change dir", path, "no such directory".to_string()))
        }
    }

    fn list_names(&mut self, path: &str) -> Result<Vec<String>, RemoteError> {
        let st = self.state.lock().unwrap();
        if let Some(fixed) = &st.pathological_listing {
            return Ok(fixed.clone());
        }
        let dir = norm(path);
        if !st.dirs.contains(&dir) {
            return Err(RemoteError::backend("list", path, "no such directory".to_string()));
        }
        let mut names: Vec<String> = Vec::new();
        if st.list_dot_entries {
            names.push(".".to_string());
            names.push("..".to_string());
            names.push("Thumbs.db".to_string());
        }
        for f in st.files.keys() {
            if parent_of(f) == dir {
                names.push(if st.list_with_prefix {
                    f.clone()
                } else {
                    name_of(f).to_string()
                });
            }
        }
        for d in st.dirs.iter() {
            if d != &dir && parent_of(d) == dir {
                names.push(if st.list_with_prefix {
                    d.clone()
                } else {
                    name_of(d).to_string()
                });
            }
        }
        Ok(names)
    }

    fn make_dir(&mut self, path: &str) -> Result<(), RemoteError> {
        let mut st = self.state.lock().unwrap();
        let dir = norm(path);
        if st.dirs.contains(&dir) || st.files.contains_key(&dir) {
            return Err(RemoteError::backend("mkdir", path, "already exists".to_string()));
        }
        if !st.dirs.contains(&parent_of(&dir)) {
            return Err(RemoteError::backend("mkdir", path, "parent missing".to_string()));
        }
        st.dirs.insert(dir);
        Ok(())
    }

    fn rename(&mut self, from: &str, to: &str) -> Result<(), RemoteError> {
        let mut st = self.state.lock().unwrap();
        let (from, to) = (norm(from), norm(to));
        if let Some(bytes) = st.files.remove(&from) {
            let mtime = st.mtimes.remove(&from);
            st.files.insert(to.clone(), bytes);
            if let Some(m) = mtime {
                st.mtimes.insert(to, m);
            }
            return Ok(());
        }
        if st.dirs.remove(&from) {
            // move the directory and everything under it
            let prefix = format!("{}/", from);
            let moved_dirs: Vec<String> =
                st.dirs.iter().filter(|d| d.starts_with(&prefix)).cloned().collect();
            for d in moved_dirs {
                st.dirs.remove(&d);
                st.dirs.insert(format!("{}{}", to, &d[from.len()..]));
            }
            let moved_files: Vec<String> =
                st.files.keys().filter(|f| f.starts_with(&prefix)).cloned().collect();
            for f in moved_files {
                let bytes = st.files.remove(&f).unwrap();
                let mtime = st.mtimes.remove(&f);
                let new_path = format!("{}{}", to, &f[from.len()..]);
                if let Some(m) = mtime {
                    st.mtimes.insert(new_path.clone(), m);
                }
                st.files.insert(new_path, bytes);
            }
            st.dirs.insert(to);
            return Ok(());
        }
        Err(RemoteError::backend("rename", from, "no such path".to_string()))
    }

    fn remove_file(&mut self, path: &str) -> Result<(), RemoteError> {
        let mut st = self.state.lock().unwrap();
        if st.pathological_listing.is_some() {
            return Err(RemoteError::backend("delete file", path, "refused".to_string()));
        }
        let file = norm(path);
        if st.files.remove(&file).is_some() {
            st.mtimes.remove(&file);
            Ok(())
        } else {
            Err(RemoteError::backend("delete file", path, "no such file".to_string()))
        }
    }

    fn remove_dir(&mut self, path: &str) -> Result<(), RemoteError> {
        let mut st = self.state.lock().unwrap();
        if st.pathological_listing.is_some() {
            return Err(RemoteError::backend("remove dir", path, "refused".to_string()));
        }
        let dir = norm(path);
        if !st.dirs.contains(&dir) {
            return Err(RemoteError::backend("remove dir", path, "no such directory".to_string()));
        }
        let prefix = format!("{}/", dir);
        let has_children = st.files.keys().any(|f| f.starts_with(&prefix))
            || st.dirs.iter().any(|d| d.starts_with(&prefix));
        if has_children {
            return Err(RemoteError::backend("remove dir", path, "not empty".to_string()));
        }
        st.dirs.remove(&dir);
        Ok(())
    }

    fn download(&mut self, remote: &str, local: &Path) -> Result<(), RemoteError> {
        let st = self.state.lock().unwrap();
        let bytes = st
            .files
            .get(&norm(remote))
            .ok_or_else(|| RemoteError::transfer("download", remote, "no such file".to_string()))?;
        std::fs::write(local, bytes)
            .map_err(|e| RemoteError::transfer("download", remote, e.to_string()))
    }

    fn upload(&mut self, local: &Path, remote: &str) -> Result<(), RemoteError> {
        let mut st = self.state.lock().unwrap();
        if st.fail_uploads {
            return Err(RemoteError::transfer("upload", remote, "simulated remote write failure".to_string()));
        }
        let file = norm(remote);
        if !st.dirs.contains(&parent_of(&file)) {
            return Err(RemoteError::transfer("upload", remote, "parent missing".to_string()));
        }
        let bytes = std::fs::read(local)
            .map_err(|e| RemoteError::transfer("upload", remote, e.to_string()))?;
        st.files.insert(file.clone(), bytes);
        st.mtimes.entry(file).or_insert(1_600_000_000);
        Ok(())
    }

    fn size(&mut self, path: &str) -> Result<u64, RemoteError> {
        let st = self.state.lock().unwrap();
        st.files
            .get(&norm(path))
            .map(|b| b.len() as u64)
            .ok_or_else(|| RemoteError::backend("size", path, "no such file".to_string()))
    }

    fn modified(&mut self, path: &str) -> Result<DateTime<Utc>, RemoteError> {
        let st = self.state.lock().unwrap();
        let ts = st
            .mtimes
            .get(&norm(path))
            .copied()
            .ok_or_else(|| RemoteError::backend("modified time", path, "no such file".to_string()))?;
        DateTime::from_timestamp(ts, 0).ok_or_else(|| {
            RemoteError::backend("modified time", path, format!("mtime out of range: {}", ts))
        })
    }

    fn close(&mut self) -> Result<(), RemoteError> {
        self.state.lock().unwrap().closed = true;
        Ok(())
    }
}
