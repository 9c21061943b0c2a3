use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::RemoteError;

/// Which protocol client backs the session. Fixed at configuration time
/// for the lifetime of the module instance.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Ftp,
    Sftp,
}

const DEFAULT_FTP_PORT: u16 = 21;
const DEFAULT_SFTP_PORT: u16 = 22;
const DEFAULT_TIMEOUT_SECS: u64 = 90;

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RemoteConfig {
    // 字段名保持为 backend；兼容主机端配置里常见的 type 键
    #[serde(alias = "type", default)]
    pub backend: BackendKind,
    pub host: String,
    #[serde(default)]
    pub port: Option<u16>,
    /// Connection timeout in seconds, applied once at login and not
    /// adjustable per call.
    #[serde(default)]
    pub timeout: Option<u64>,
    #[serde(default = "default_username")]
    pub username: String,
    #[serde(default)]
    pub password: String,
    /// SFTP only: private key used instead of the password when set.
    #[serde(default)]
    pub key_path: Option<PathBuf>,
    /// FTP only: passive-mode flag applied right after login.
    #[serde(default = "default_true")]
    pub passive: bool,
    /// Scratch directory for the staging slot; defaults to
    /// `~/.ftpilot/staging` (system temp dir when no home exists).
    #[serde(default)]
    pub staging_dir: Option<PathBuf>,
    /// Remove the staging file during `after_test` teardown.
    #[serde(default = "default_true")]
    pub cleanup: bool,
}

fn default_username() -> String {
    "anonymous".to_string()
}

const fn default_true() -> bool {
    true
}

impl Default for RemoteConfig {
    fn default() -> Self {
        RemoteConfig {
            backend: BackendKind::Ftp,
            host: String::new(),
            port: None,
            timeout: None,
            username: default_username(),
            password: String::new(),
            key_path: None,
            passive: true,
            staging_dir: None,
            cleanup: true,
        }
    }
}

impl RemoteConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: RemoteConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Setup-time validation, run before any connection attempt. A missing
    /// host or a dangling SFTP key path is fatal here, so the failure is
    /// clearly distinguishable from a network error later on.
    pub fn validate(&self) -> Result<(), RemoteError> {
        if self.host.trim().is_empty() {
            return Err(RemoteError::Setup("'host' is required".to_string()));
        }
        if self.backend == BackendKind::Sftp
            && let Some(key) = &self.key_path
            && !key.exists()
        {
            return Err(RemoteError::Setup(format!(
                "SFTP private key not found: {}",
                key.display()
            )));
        }
        Ok(())
    }

    pub fn port(&self) -> u16 {
        self.port.unwrap_or(match self.backend {
            BackendKind::Ftp => DEFAULT_FTP_PORT,
            BackendKind::Sftp => DEFAULT_SFTP_PORT,
        })
    }

    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port())
    }

    /// Resolved scratch directory for the staging slot.
    pub fn staging_dir(&self) -> PathBuf {
        if let Some(dir) = &self.staging_dir {
            return dir.clone();
        }
        match dirs::home_dir() {
            Some(home) => home.join(".ftpilot").join("staging"),
            None => std::env::temp_dir().join("ftpilot"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_backend() {
        let mut cfg = RemoteConfig { host: "ftp.example.com".into(), ..Default::default() };
        assert_eq!(cfg.port(), 21);
        cfg.backend = BackendKind::Sftp;
        assert_eq!(cfg.port(), 22);
        assert_eq!(cfg.timeout(), std::time::Duration::from_secs(90));
        assert_eq!(cfg.username, "anonymous");
        assert!(cfg.passive);
        assert!(cfg.cleanup);
    }

    #[test]
    fn json_accepts_type_alias_for_backend() {
        let cfg: RemoteConfig = serde_json::from_str(
            r#"{"type": "sftp", "host": "sftp.example.com", "port": 2222, "username": "tester"}"#,
        )
        .unwrap();
        assert_eq!(cfg.backend, BackendKind::Sftp);
        assert_eq!(cfg.port(), 2222);
        assert_eq!(cfg.username, "tester");
    }

    #[test]
    fn missing_host_is_fatal_at_setup() {
        let cfg = RemoteConfig::default();
        let err = cfg.validate().unwrap_err();
        assert!(matches!(err, RemoteError::Setup(_)));
    }

    #[test]
    fn explicit_port_wins() {
        let cfg = RemoteConfig {
            host: "h".into(),
            port: Some(10021),
            ..Default::default()
        };
        assert_eq!(cfg.port(), 10021);
        assert_eq!(cfg.addr(), "h:10021");
    }
}
