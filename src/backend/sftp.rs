use std::net::{TcpStream, ToSocketAddrs};
use std::path::Path;

use chrono::{DateTime, Utc};

use crate::backend::{MAX_DELETE_STEPS, RemoteBackend};
use crate::config::RemoteConfig;
use crate::error::RemoteError;

/// SFTP adapter over `ssh2`. The library tears the socket down on drop, so
/// `close` is a no-op. `ssh2` exposes no recursive-delete flag, so the
/// adapter drives its own stat-aware worklist instead of the trait default.
pub struct SftpBackend {
    // Session owns the TCP stream; kept alive for the lifetime of `sftp`.
    _sess: ssh2::Session,
    sftp: ssh2::Sftp,
}

/// 创建并配置 TCP 连接 — create the TCP connection with timeouts applied
fn create_tcp_connection(addr: &str, timeout: std::time::Duration) -> Result<TcpStream, RemoteError> {
    let mut addrs = addr
        .to_socket_addrs()
        .map_err(|e| RemoteError::Connection(addr.to_string(), e.to_string()))?;
    let sock = addrs
        .next()
        .ok_or_else(|| RemoteError::Connection(addr.to_string(), "no address resolved".to_string()))?;
    let tcp = TcpStream::connect_timeout(&sock, timeout)
        .map_err(|e| RemoteError::Connection(addr.to_string(), e.to_string()))?;
    let _ = tcp.set_read_timeout(Some(timeout));
    let _ = tcp.set_write_timeout(Some(timeout));
    Ok(tcp)
}

/// Connect, handshake and authenticate an SFTP session. A configured
/// private key wins over the password.
pub fn connect(
    config: &RemoteConfig,
    user: &str,
    password: &str,
) -> Result<SftpBackend, RemoteError> {
    let addr = config.addr();
    let tcp = create_tcp_connection(&addr, config.timeout())?;
    let mut sess = ssh2::Session::new()
        .map_err(|e| RemoteError::Connection(addr.clone(), e.to_string()))?;
    sess.set_tcp_stream(tcp);
    sess.handshake()
        .map_err(|e| RemoteError::Connection(addr.clone(), e.to_string()))?;

    match &config.key_path {
        Some(key) => {
            let _ = sess.userauth_pubkey_file(user, None, key, None);
        }
        None => {
            let _ = sess.userauth_password(user, password);
        }
    }
    if !sess.authenticated() {
        return Err(RemoteError::Auth(user.to_string()));
    }
    // per-call blocking timeout, supplied once at login
    sess.set_timeout(config.timeout().as_millis() as u32);

    let sftp = sess
        .sftp()
        .map_err(|e| RemoteError::Connection(addr.clone(), e.to_string()))?;
    Ok(SftpBackend { _sess: sess, sftp })
}

impl RemoteBackend for SftpBackend {
    fn home_dir(&mut self) -> Result<String, RemoteError> {
        self.sftp
            .realpath(Path::new("."))
            .map(|p| p.to_string_lossy().to_string())
            .map_err(|e| RemoteError::backend("pwd", ".", e.to_string()))
    }

    fn change_dir(&mut self, path: &str) -> Result<(), RemoteError> {
        // SFTP has no working-directory state; opening the directory is the
        // existence check the chdir contract needs.
        self.sftp
            .opendir(Path::new(path))
            .map(|_| ())
            .map_err(|e| RemoteError::backend("change dir", path, e.to_string()))
    }

    fn list_names(&mut self, path: &str) -> Result<Vec<String>, RemoteError> {
        let entries = self
            .sftp
            .readdir(Path::new(path))
            .map_err(|e| RemoteError::backend("list", path, e.to_string()))?;
        Ok(entries
            .into_iter()
            .map(|(p, _)| p.to_string_lossy().to_string())
            .collect())
    }

    fn make_dir(&mut self, path: &str) -> Result<(), RemoteError> {
        // Create missing parents segment by segment, then the leaf. Only
        // the leaf's failure is reported; intermediate segments may already
        // exist.
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let mut cur = String::new();
        for (i, seg) in segments.iter().enumerate() {
            cur.push('/');
            cur.push_str(seg);
            let p = Path::new(&cur);
            if i + 1 == segments.len() {
                self.sftp
                    .mkdir(p, 0o755)
                    .map_err(|e| RemoteError::backend("mkdir", path, e.to_string()))?;
            } else if self.sftp.stat(p).is_err() {
                self.sftp
                    .mkdir(p, 0o755)
                    .map_err(|e| RemoteError::backend("mkdir", path, e.to_string()))?;
            }
        }
        Ok(())
    }

    fn rename(&mut self, from: &str, to: &str) -> Result<(), RemoteError> {
        self.sftp
            .rename(Path::new(from), Path::new(to), None)
            .map_err(|e| RemoteError::backend("rename", from, e.to_string()))
    }

    fn remove_file(&mut self, path: &str) -> Result<(), RemoteError> {
        self.sftp
            .unlink(Path::new(path))
            .map_err(|e| RemoteError::backend("delete file", path, e.to_string()))
    }

    fn remove_dir(&mut self, path: &str) -> Result<(), RemoteError> {
        self.sftp
            .rmdir(Path::new(path))
            .map_err(|e| RemoteError::backend("remove dir", path, e.to_string()))
    }

    fn remove_dir_all(&mut self, path: &str) -> Result<(), RemoteError> {
        let st = self
            .sftp
            .stat(Path::new(path))
            .map_err(|e| RemoteError::backend("recursive delete", path, e.to_string()))?;
        if !st.is_dir() {
            return self.remove_file(path);
        }
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
            let entries = self
                .sftp
                .readdir(Path::new(&cur))
                .map_err(|e| RemoteError::backend("recursive delete", &cur, e.to_string()))?;
            if entries.is_empty() {
                self.remove_dir(&cur)?;
                stack.pop();
                continue;
            }
            for (p, st) in entries {
                if st.is_dir() {
                    stack.push(p.to_string_lossy().to_string());
                } else {
                    // files and symlinks both go through unlink
                    self.sftp
                        .unlink(&p)
                        .map_err(|e| {
                            RemoteError::backend(
                                "recursive delete",
                                p.to_string_lossy().to_string(),
                                e.to_string(),
                            )
                        })?;
                }
            }
        }
        Ok(())
    }

    fn download(&mut self, remote: &str, local: &Path) -> Result<(), RemoteError> {
        let mut rf = self
            .sftp
            .open(Path::new(remote))
            .map_err(|e| RemoteError::transfer("download", remote, e.to_string()))?;
        let mut lf = std::fs::File::create(local)
            .map_err(|e| RemoteError::transfer("download", remote, e.to_string()))?;
        std::io::copy(&mut rf, &mut lf)
            .map(|_| ())
            .map_err(|e| RemoteError::transfer("download", remote, e.to_string()))
    }

    fn upload(&mut self, local: &Path, remote: &str) -> Result<(), RemoteError> {
        let mut lf = std::fs::File::open(local)
            .map_err(|e| RemoteError::transfer("upload", remote, e.to_string()))?;
        let mut wf = self
            .sftp
            .create(Path::new(remote))
            .map_err(|e| RemoteError::transfer("upload", remote, e.to_string()))?;
        std::io::copy(&mut lf, &mut wf)
            .map(|_| ())
            .map_err(|e| RemoteError::transfer("upload", remote, e.to_string()))
    }

    fn size(&mut self, path: &str) -> Result<u64, RemoteError> {
        let st = self
            .sftp
            .stat(Path::new(path))
            .map_err(|e| RemoteError::backend("size", path, e.to_string()))?;
        st.size
            .ok_or_else(|| RemoteError::backend("size", path, "no size reported".to_string()))
    }

    fn modified(&mut self, path: &str) -> Result<DateTime<Utc>, RemoteError> {
        let st = self
            .sftp
            .lstat(Path::new(path))
            .map_err(|e| RemoteError::backend("modified time", path, e.to_string()))?;
        let mtime = st.mtime.ok_or_else(|| {
            RemoteError::backend("modified time", path, "no mtime reported".to_string())
        })?;
        DateTime::from_timestamp(mtime as i64, 0).ok_or_else(|| {
            RemoteError::backend("modified time", path, format!("mtime out of range: {}", mtime))
        })
    }

    fn close(&mut self) -> Result<(), RemoteError> {
        // socket teardown is the library's job on drop
        Ok(())
    }
}
