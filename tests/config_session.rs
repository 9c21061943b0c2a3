use ftpilot::backend::mock::MockRemote;
use ftpilot::{BackendKind, RemoteConfig, RemoteError, RemoteSession};

fn scratch(tag: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!("ftpilot_cfg_{}_{}", tag, std::process::id()))
}

#[test]
fn config_round_trips_through_json_file() {
    let path = scratch("json").with_extension("json");
    let json = r#"{
        "type": "sftp",
        "host": "files.internal",
        "port": 2222,
        "username": "ci",
        "password": "secret",
        "passive": false,
        "cleanup": false
    }"#;
    std::fs::write(&path, json).unwrap();

    let cfg = RemoteConfig::from_file(&path).unwrap();
    assert_eq!(cfg.backend, BackendKind::Sftp);
    assert_eq!(cfg.addr(), "files.internal:2222");
    assert_eq!(cfg.username, "ci");
    assert!(!cfg.passive);
    assert!(!cfg.cleanup);
    let _ = std::fs::remove_file(&path);
}

#[test]
fn login_with_missing_host_fails_before_any_connection() {
    let cfg = RemoteConfig { staging_dir: Some(scratch("nohost")), ..Default::default() };
    let mut sess = RemoteSession::new(cfg);
    let err = sess.login("user", "pw").unwrap_err();
    assert!(matches!(err, RemoteError::Setup(_)));
    assert!(err.is_pre_network());
    assert!(!sess.is_connected());
}

#[test]
fn before_test_surfaces_setup_errors_after_preparing_staging() {
    let dir = scratch("beforetest");
    let cfg = RemoteConfig { staging_dir: Some(dir.clone()), ..Default::default() };
    let mut sess = RemoteSession::new(cfg);
    let err = sess.before_test().unwrap_err();
    assert!(matches!(err, RemoteError::Setup(_)));
    // the staging directory was still prepared before login was attempted
    assert!(dir.is_dir());
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn logout_is_idempotent() {
    let cfg = RemoteConfig {
        host: "mock.local".to_string(),
        staging_dir: Some(scratch("logout")),
        ..Default::default()
    };
    let mut sess = RemoteSession::new(cfg);
    // nothing open yet: still fine
    sess.logout().unwrap();

    let remote = MockRemote::new();
    sess.attach(Box::new(remote.backend())).unwrap();
    assert!(sess.is_connected());
    sess.logout().unwrap();
    assert!(remote.is_closed());
    assert!(!sess.is_connected());
    sess.logout().unwrap();
}

#[test]
fn operations_without_an_open_session_are_reported() {
    let cfg = RemoteConfig {
        host: "mock.local".to_string(),
        staging_dir: Some(scratch("noconn")),
        ..Default::default()
    };
    let mut sess = RemoteSession::new(cfg);
    assert!(matches!(
        sess.list_files("", true).unwrap_err(),
        RemoteError::Connection(_, _)
    ));
    assert!(matches!(sess.make_directory("x").unwrap_err(), RemoteError::Connection(_, _)));
}

#[test]
fn after_test_removes_the_staging_file_when_cleanup_is_set() {
    let dir = scratch("cleanup_on");
    let cfg = RemoteConfig {
        host: "mock.local".to_string(),
        staging_dir: Some(dir.clone()),
        ..Default::default()
    };
    let remote = MockRemote::new();
    let mut sess = RemoteSession::new(cfg);
    sess.staging().prepare().unwrap();
    sess.attach(Box::new(remote.backend())).unwrap();

    sess.upload("/x.txt", b"payload").unwrap();
    assert!(sess.staging().file_path().exists());

    sess.after_test().unwrap();
    assert!(!sess.staging().file_path().exists());
    assert!(remote.is_closed());
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn after_test_keeps_the_staging_file_without_cleanup() {
    let dir = scratch("cleanup_off");
    let cfg = RemoteConfig {
        host: "mock.local".to_string(),
        staging_dir: Some(dir.clone()),
        cleanup: false,
        ..Default::default()
    };
    let remote = MockRemote::new();
    let mut sess = RemoteSession::new(cfg);
    sess.staging().prepare().unwrap();
    sess.attach(Box::new(remote.backend())).unwrap();

    sess.upload("/x.txt", b"payload").unwrap();
    sess.after_test().unwrap();
    assert!(sess.staging().file_path().exists());
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn fresh_login_replaces_an_existing_session() {
    // attach twice: the first backend must be closed when the second one
    // takes over, mirroring login's close-then-reconnect contract
    let cfg = RemoteConfig {
        host: "mock.local".to_string(),
        staging_dir: Some(scratch("relogin")),
        ..Default::default()
    };
    let first = MockRemote::new();
    let second = MockRemote::new().with_home("/home/two");
    let mut sess = RemoteSession::new(cfg);
    sess.attach(Box::new(first.backend())).unwrap();
    assert_eq!(sess.current_directory(), "/");

    // simulate what login does: drop the old session, adopt the new one
    sess.logout().unwrap();
    sess.attach(Box::new(second.backend())).unwrap();
    assert!(first.is_closed());
    assert_eq!(sess.current_directory(), "/home/two/");
}
