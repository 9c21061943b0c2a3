use std::net::ToSocketAddrs;
use std::path::Path;

use chrono::{DateTime, Utc};
use suppaftp::types::FileType;
use suppaftp::{FtpStream, Mode};

use crate::backend::RemoteBackend;
use crate::config::RemoteConfig;
use crate::error::RemoteError;

/// Classic-FTP adapter over `suppaftp::FtpStream`. The control connection
/// must be closed explicitly; recursive deletion uses the trait's bounded
/// worklist because the protocol has no recursive-remove primitive.
pub struct FtpBackend {
    stream: FtpStream,
}

/// Connect and authenticate a classic-FTP session. Passive mode and binary
/// transfer type are applied once here, never per call.
pub fn connect(
    config: &RemoteConfig,
    user: &str,
    password: &str,
) -> Result<FtpBackend, RemoteError> {
    let addr = config.addr();
    let mut addrs = addr
        .to_socket_addrs()
        .map_err(|e| RemoteError::Connection(addr.clone(), e.to_string()))?;
    let sock = addrs
        .next()
        .ok_or_else(|| RemoteError::Connection(addr.clone(), "no address resolved".to_string()))?;

    let mut stream = FtpStream::connect_timeout(sock, config.timeout())
        .map_err(|e| RemoteError::Connection(addr.clone(), e.to_string()))?;
    // 数据传输也沿用同一超时 — reuse the same timeout for data reads/writes
    let _ = stream.get_ref().set_read_timeout(Some(config.timeout()));
    let _ = stream.get_ref().set_write_timeout(Some(config.timeout()));

    stream.set_mode(if config.passive { Mode::Passive } else { Mode::Active });
    stream.login(user, password).map_err(|e| {
        tracing::debug!("FTP login rejected for {}: {}", user, e);
        RemoteError::Auth(user.to_string())
    })?;
    stream
        .transfer_type(FileType::Binary)
        .map_err(|e| RemoteError::backend("set binary mode", &addr, e.to_string()))?;
    Ok(FtpBackend { stream })
}

impl RemoteBackend for FtpBackend {
    fn home_dir(&mut self) -> Result<String, RemoteError> {
        self.stream
            .pwd()
            .map_err(|e| RemoteError::backend("pwd", "", e.to_string()))
    }

    fn change_dir(&mut self, path: &str) -> Result<(), RemoteError> {
        self.stream
            .cwd(path)
            .map_err(|e| RemoteError::backend("change dir", path, e.to_string()))
    }

    fn list_names(&mut self, path: &str) -> Result<Vec<String>, RemoteError> {
        self.stream
            .nlst(Some(path))
            .map_err(|e| RemoteError::backend("list", path, e.to_string()))
    }

    fn make_dir(&mut self, path: &str) -> Result<(), RemoteError> {
        self.stream
            .mkdir(path)
            .map_err(|e| RemoteError::backend("mkdir", path, e.to_string()))
    }

    fn rename(&mut self, from: &str, to: &str) -> Result<(), RemoteError> {
        self.stream
            .rename(from, to)
            .map_err(|e| RemoteError::backend("rename", from, e.to_string()))
    }

    fn remove_file(&mut self, path: &str) -> Result<(), RemoteError> {
        self.stream
            .rm(path)
            .map_err(|e| RemoteError::backend("delete file", path, e.to_string()))
    }

    fn remove_dir(&mut self, path: &str) -> Result<(), RemoteError> {
        self.stream
            .rmdir(path)
            .map_err(|e| RemoteError::backend("remove dir", path, e.to_string()))
    }

    fn download(&mut self, remote: &str, local: &Path) -> Result<(), RemoteError> {
        let buf = self
            .stream
            .retr_as_buffer(remote)
            .map_err(|e| RemoteError::transfer("download", remote, e.to_string()))?;
        std::fs::write(local, buf.into_inner())
            .map_err(|e| RemoteError::transfer("download", remote, e.to_string()))
    }

    fn upload(&mut self, local: &Path, remote: &str) -> Result<(), RemoteError> {
        let mut file = std::fs::File::open(local)
            .map_err(|e| RemoteError::transfer("upload", remote, e.to_string()))?;
        self.stream
            .put_file(remote, &mut file)
            .map(|_| ())
            .map_err(|e| RemoteError::transfer("upload", remote, e.to_string()))
    }

    fn size(&mut self, path: &str) -> Result<u64, RemoteError> {
        self.stream
            .size(path)
            .map(|n| n as u64)
            .map_err(|e| RemoteError::backend("size", path, e.to_string()))
    }

    fn modified(&mut self, path: &str) -> Result<DateTime<Utc>, RemoteError> {
        let mtime = self
            .stream
            .mdtm(path)
            .map_err(|e| RemoteError::backend("modified time", path, e.to_string()))?
            .and_utc();
        // Some servers answer MDTM with an all-zero time when they cannot
        // stat the file; a legitimate epoch-zero mtime is indistinguishable
        // from that and is rejected here too.
        if mtime.timestamp() == 0 {
            return Err(RemoteError::backend(
                "modified time",
                path,
                "server reported epoch-zero timestamp".to_string(),
            ));
        }
        Ok(mtime)
    }

    fn close(&mut self) -> Result<(), RemoteError> {
        self.stream
            .quit()
            .map_err(|e| RemoteError::backend("close", "", e.to_string()))
    }
}
