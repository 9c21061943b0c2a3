/// Repository-wide structured errors for remote test-session operations.
///
/// Every facade operation returns `Result<_, RemoteError>`; the host test
/// runner treats an `Err` as the failure point of the surrounding test. No
/// retries happen anywhere — a single failed attempt is final.
#[derive(Debug, Clone)]
pub enum RemoteError {
    /// TCP 连接或协议握手失败 — TCP connect or protocol handshake failed
    Connection(String, String),
    /// 远端拒绝认证（用户名） — Remote rejected authentication (username)
    Auth(String),
    /// 后端操作失败：list/chdir/mkdir/rename/delete/stat
    Backend { op: &'static str, path: String, msg: String },
    /// 传输失败：download/upload
    Transfer { op: &'static str, path: String, msg: String },
    /// 本地暂存区不可用（目录缺失/不可写/回读失败）
    LocalStorage(std::path::PathBuf, String),
    /// 该后端组合不支持此能力
    Unsupported(&'static str),
    /// 配置缺失或无效；在任何连接尝试之前即为致命错误
    Setup(String),
    /// 测试期望未满足（存在性/模式断言）
    Assertion(String),
}

impl std::fmt::Display for RemoteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use RemoteError::*;
        match self {
            Connection(addr, msg) => write!(f, "connection to {} failed: {}", addr, msg),
            Auth(user) => write!(f, "authentication failed for user '{}'", user),
            Backend { op, path, msg } => write!(f, "{} failed for '{}': {}", op, path, msg),
            Transfer { op, path, msg } => write!(f, "{} failed for '{}': {}", op, path, msg),
            LocalStorage(p, msg) => {
                write!(f, "local staging area unusable: {} — {}", display_path(p), msg)
            }
            Unsupported(what) => {
                write!(f, "{} is not supported by the FTP/SFTP backend pairing", what)
            }
            Setup(msg) => write!(f, "invalid module configuration: {}", msg),
            Assertion(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for RemoteError {}

fn display_path(p: &std::path::Path) -> String {
    let s = p.to_string_lossy().to_string();
    if s.contains('\\') { s.replace('\\', "/") } else { s }
}

impl RemoteError {
    /// Shorthand for backend-operation failures, which carry the operation
    /// name and the remote path so a failing test names both.
    pub fn backend(op: &'static str, path: impl Into<String>, msg: impl Into<String>) -> Self {
        RemoteError::Backend { op, path: path.into(), msg: msg.into() }
    }

    pub fn transfer(op: &'static str, path: impl Into<String>, msg: impl Into<String>) -> Self {
        RemoteError::Transfer { op, path: path.into(), msg: msg.into() }
    }

    /// Whether this error was raised before any network activity (setup or
    /// local-storage problems). Useful to callers that distinguish broken
    /// configuration from a flaky remote.
    pub fn is_pre_network(&self) -> bool {
        matches!(self, RemoteError::Setup(_) | RemoteError::LocalStorage(_, _))
    }
}
