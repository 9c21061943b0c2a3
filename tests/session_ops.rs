use ftpilot::backend::mock::MockRemote;
use ftpilot::{RemoteConfig, RemoteError, RemoteSession};

fn test_session(tag: &str) -> (MockRemote, RemoteSession) {
    ftpilot::util::init_test_logging();
    let staging =
        std::env::temp_dir().join(format!("ftpilot_ops_{}_{}", tag, std::process::id()));
    let cfg = RemoteConfig {
        host: "mock.local".to_string(),
        staging_dir: Some(staging),
        ..Default::default()
    };
    let remote = MockRemote::new();
    let mut sess = RemoteSession::new(cfg);
    sess.staging().prepare().unwrap();
    sess.attach(Box::new(remote.backend())).unwrap();
    (remote, sess)
}

#[test]
fn full_upload_download_delete_scenario() {
    let (remote, mut sess) = test_session("scenario");
    assert_eq!(sess.current_directory(), "/");

    sess.make_directory("T").unwrap();
    sess.change_directory("T").unwrap();
    assert_eq!(sess.current_directory(), "/T/");

    sess.upload("a.txt", b"hello").unwrap();
    assert!(remote.has_file("/T/a.txt"));
    assert!(sess.list_files("", true).unwrap().contains(&"a.txt".to_string()));

    sess.download("a.txt").unwrap();
    let open = sess.open_file().unwrap();
    assert_eq!(open.path, "/T/a.txt");
    assert!(open.equals(b"hello"));
    assert!(open.contains("ell"));

    sess.delete("a.txt").unwrap();
    assert!(!sess.list_files("", true).unwrap().contains(&"a.txt".to_string()));
    assert!(!remote.has_file("/T/a.txt"));
}

#[test]
fn round_trip_preserves_bytes() {
    let (_remote, mut sess) = test_session("roundtrip");
    let payload: Vec<u8> = (0u8..=255).collect();
    sess.upload("/blob.bin", &payload).unwrap();
    sess.download("/blob.bin").unwrap();
    let first = sess.open_file().unwrap().contents.clone();
    sess.upload("/blob.bin", &first).unwrap();
    sess.download("/blob.bin").unwrap();
    assert_eq!(sess.open_file().unwrap().contents, payload);
}

#[test]
fn listing_strips_prefixes_and_filters_noise() {
    let (remote, mut sess) = test_session("listing");
    remote.seed_dir("/data");
    remote.seed_file("/data/a.txt", b"a");
    remote.seed_file("/data/b.txt", b"b");
    remote.list_with_prefix();
    remote.list_dot_entries();

    let filtered = sess.list_files("data", true).unwrap();
    assert_eq!(filtered, vec!["a.txt".to_string(), "b.txt".to_string()]);

    // unfiltered listings keep the noise entries, but names stay bare
    let raw = sess.list_files("data", false).unwrap();
    assert!(raw.contains(&".".to_string()));
    assert!(raw.contains(&"..".to_string()));
    assert!(raw.contains(&"Thumbs.db".to_string()));
    assert!(raw.contains(&"a.txt".to_string()));
    assert!(!raw.iter().any(|n| n.contains('/')));
}

#[test]
fn empty_directory_lists_empty_not_error() {
    let (remote, mut sess) = test_session("empty");
    remote.seed_dir("/void");
    assert!(sess.list_files("void", true).unwrap().is_empty());
}

#[test]
fn membership_checks_are_exact_and_case_sensitive() {
    let (remote, mut sess) = test_session("membership");
    remote.seed_dir("/docs");
    remote.seed_file("/docs/Report.txt", b"x");

    sess.file_exists("Report.txt", "docs").unwrap();
    assert!(matches!(
        sess.file_exists("report.txt", "docs").unwrap_err(),
        RemoteError::Assertion(_)
    ));

    sess.file_absent("report.txt", "docs").unwrap();
    assert!(matches!(
        sess.file_absent("Report.txt", "docs").unwrap_err(),
        RemoteError::Assertion(_)
    ));
}

#[test]
fn pattern_checks_scan_listings() {
    let (remote, mut sess) = test_session("patterns");
    remote.seed_dir("/out");
    remote.seed_file("/out/report_042.csv", b"x");
    remote.seed_file("/out/readme.md", b"x");

    sess.any_file_matches(r"^report_[0-9]{3}\.csv$", "out").unwrap();
    let err = sess.no_file_matches(r"^report_[0-9]{3}\.csv$", "out").unwrap_err();
    assert!(matches!(err, RemoteError::Assertion(_)));
    assert!(err.to_string().contains("report_042.csv"));

    sess.no_file_matches(r"\.exe$", "out").unwrap();
    assert!(matches!(
        sess.any_file_matches(r"\.exe$", "out").unwrap_err(),
        RemoteError::Assertion(_)
    ));

    // a broken pattern is an assertion-level failure, not a panic
    assert!(matches!(
        sess.any_file_matches("[", "out").unwrap_err(),
        RemoteError::Assertion(_)
    ));
}

#[test]
fn upload_sets_buffer_before_the_network_call() {
    let (remote, mut sess) = test_session("earlybuf");
    remote.fail_uploads();
    let err = sess.upload("/a.txt", b"written anyway").unwrap_err();
    assert!(matches!(err, RemoteError::Transfer { .. }));
    // the buffer reflects the file just written even though the remote
    // write never landed
    let open = sess.open_file().unwrap();
    assert_eq!(open.path, "/a.txt");
    assert!(open.equals(b"written anyway"));
    assert!(!remote.has_file("/a.txt"));
}

#[test]
fn failed_download_keeps_previous_buffer() {
    let (_remote, mut sess) = test_session("faildl");
    sess.upload("/keep.txt", b"kept").unwrap();
    assert!(sess.download("/missing.txt").is_err());
    let open = sess.open_file().unwrap();
    assert_eq!(open.path, "/keep.txt");
    assert!(open.equals(b"kept"));
}

#[test]
fn change_directory_failure_leaves_current_path() {
    let (_remote, mut sess) = test_session("cdfail");
    assert!(sess.change_directory("nope").is_err());
    assert_eq!(sess.current_directory(), "/");
}

#[test]
fn relative_and_absolute_paths_resolve_against_current() {
    let (remote, mut sess) = test_session("resolve");
    remote.seed_dir("/a");
    remote.seed_dir("/a/b");
    sess.change_directory("a").unwrap();
    assert_eq!(sess.current_directory(), "/a/");
    sess.change_directory("b").unwrap();
    assert_eq!(sess.current_directory(), "/a/b/");
    // absolute path escapes the current directory entirely
    sess.change_directory("/a").unwrap();
    assert_eq!(sess.current_directory(), "/a/");
}

#[test]
fn rename_moves_files_and_directories() {
    let (remote, mut sess) = test_session("rename");
    remote.seed_dir("/old");
    remote.seed_file("/old/f.txt", b"f");

    sess.rename_path("/old/f.txt", "/old/g.txt").unwrap();
    assert!(remote.has_file("/old/g.txt"));
    assert!(!remote.has_file("/old/f.txt"));

    sess.rename_path("/old", "/new").unwrap();
    assert!(remote.has_dir("/new"));
    assert!(remote.has_file("/new/g.txt"));
}

#[test]
fn clear_directory_leaves_an_empty_directory() {
    let (remote, mut sess) = test_session("clear");
    remote.seed_dir("/work");
    remote.seed_dir("/work/sub");
    remote.seed_file("/work/sub/deep.txt", b"x");
    remote.seed_file("/work/top.txt", b"y");

    sess.clear_directory("/work").unwrap();
    assert!(remote.has_dir("/work"));
    assert!(sess.list_files("/work", true).unwrap().is_empty());
}

#[test]
fn copy_directory_is_always_unsupported() {
    let (_remote, mut sess) = test_session("copy");
    assert!(matches!(
        sess.copy_directory("/a", "/b").unwrap_err(),
        RemoteError::Unsupported(_)
    ));
}

#[test]
fn metadata_queries_report_backend_values() {
    let (remote, mut sess) = test_session("meta");
    remote.seed_file("/m.bin", b"12345");
    remote.set_mtime("/m.bin", 1_700_000_000);

    assert_eq!(sess.file_size("/m.bin").unwrap(), 5);
    assert_eq!(sess.file_modified_time("/m.bin").unwrap().timestamp(), 1_700_000_000);
    assert!(sess.file_size("/absent.bin").is_err());
}
