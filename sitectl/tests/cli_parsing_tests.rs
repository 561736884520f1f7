//! CLI tests for sitectl
//!
//! These tests run the binary end to end: argument parsing, the text and JSON renderings of each
//! subcommand and the exit status and stderr of failures.

use assert_cmd::Command;
use predicates::prelude::*;

fn sitectl() -> Command {
    let mut cmd = Command::cargo_bin("sitectl").unwrap();
    cmd.env_remove("RUST_LOG");
    cmd
}

fn json_output(args: &[&str]) -> serde_json::Value {
    let output = sitectl().arg("--json").args(args).output().unwrap();
    assert!(output.status.success(), "{output:?}");
    serde_json::from_slice(&output.stdout).unwrap()
}

#[test]
fn test_help_runs() {
    sitectl().arg("--help").assert().success();
}

#[test]
fn test_version_runs() {
    sitectl().arg("--version").assert().success();
}

#[test]
fn test_subcommand_required() {
    sitectl().assert().failure();
}

// ============================================================================
// Global Flag Tests
// ============================================================================

#[test]
fn test_verbose_flags() {
    for flag in ["-v", "-vv", "-vvv", "--verbose"] {
        sitectl()
            .args([flag, "path", "/a/b"])
            .assert()
            .success()
            .stdout(predicate::str::contains("path: /a/b"));
    }
}

#[test]
fn test_global_flags_after_subcommand() {
    sitectl()
        .args(["path", "/a/b", "--json", "-q"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"path\": \"/a/b\""));
}

#[test]
fn test_error_reported_on_stderr() {
    sitectl()
        .args(["url", "ftp://host:99999"])
        .assert()
        .failure()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("Invalid port given"));
}

#[test]
fn test_quiet_suppresses_errors() {
    sitectl()
        .args(["-q", "url", "ftp://host:99999"])
        .assert()
        .failure()
        .stderr(predicate::str::is_empty());
}

#[test]
fn test_debug_log_file() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("debug.log");
    sitectl()
        .args(["--debug-log-file", log.to_str().unwrap(), "path", "/x/y"])
        .assert()
        .success();
    let contents = std::fs::read_to_string(&log).unwrap();
    assert!(contents.contains("/x/y"), "{contents}");
}

// ============================================================================
// url
// ============================================================================

#[test]
fn test_url_full() {
    sitectl()
        .args(["url", "ftp://user:pa@ss@host.example.com:2121/pub"])
        .assert()
        .success()
        .stdout(predicate::str::contains("protocol: ftp"))
        .stdout(predicate::str::contains("host: host.example.com"))
        .stdout(predicate::str::contains("port: 2121"))
        .stdout(predicate::str::contains("logon type: normal"))
        .stdout(predicate::str::contains("user: user"))
        .stdout(predicate::str::contains("server: ftp://user@host.example.com:2121"))
        .stdout(predicate::str::contains("path: /pub"))
        .stdout(predicate::str::contains("pa@ss").not());
}

#[test]
fn test_url_json() {
    let report = json_output(&["url", "sftp://bob@example.com/home/bob"]);
    assert_eq!(report["protocol"], "sftp");
    assert_eq!(report["port"], 22);
    assert_eq!(report["user"], "bob");
    assert_eq!(report["has_password"], false);
    assert_eq!(report["server"], "sftp://bob@example.com");
    assert_eq!(report["path"]["path"], "/home/bob");
    assert_eq!(report["path"]["server_type"], "unix");
}

#[test]
fn test_url_separate_fields() {
    let report = json_output(&[
        "url",
        "example.com",
        "--port",
        "22",
        "--user",
        "alice",
        "--pass",
        "secret",
    ]);
    assert_eq!(report["protocol"], "sftp");
    assert_eq!(report["host"], "example.com");
    assert_eq!(report["user"], "alice");
    assert_eq!(report["has_password"], true);
    assert!(report.get("path").is_none());
}

#[test]
fn test_url_at_sign_in_path() {
    let report = json_output(&["url", " ftp://host.example.com:000021/pub/release@v2"]);
    assert_eq!(report["host"], "host.example.com");
    assert_eq!(report["port"], 21);
    assert_eq!(report["logon_type"], "anonymous");
    assert_eq!(report["path"]["path"], "/pub/release@v2");
}

#[test]
fn test_url_ipv6() {
    let report = json_output(&["url", "[::1]:2121"]);
    assert_eq!(report["host"], "::1");
    assert_eq!(report["port"], 2121);
}

#[test]
fn test_url_anonymous() {
    sitectl()
        .args(["url", "ftp.example.com"])
        .assert()
        .success()
        .stdout(predicate::str::contains("logon type: anonymous"))
        .stdout(predicate::str::contains("port: 21"));
}

#[test]
fn test_url_errors() {
    for (url, message) in [
        ("gopher://host", "Invalid protocol specified"),
        ("[::1", "no closing bracket found"),
        ("[::1]x", "after closing bracket only colon and port may follow"),
        ("host:0", "Invalid port given"),
    ] {
        sitectl()
            .args(["url", url])
            .assert()
            .failure()
            .stderr(predicate::str::contains(message));
    }
}

#[test]
fn test_url_invalid_port_field() {
    sitectl()
        .args(["url", "example.com", "--port", "abc"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid port given"));
}

#[test]
fn test_url_invalid_logon_type() {
    sitectl()
        .args(["url", "example.com", "--logon-type", "sometimes"])
        .assert()
        .failure();
}

// ============================================================================
// path
// ============================================================================

#[test]
fn test_path_unix() {
    let report = json_output(&["path", "/a/b/../c/./d"]);
    assert_eq!(report["path"], "/a/c/d");
    assert_eq!(report["server_type"], "unix");
    assert_eq!(report["segments"], serde_json::json!(["a", "c", "d"]));
    assert_eq!(report["parent"], "/a/c");
    assert_eq!(report["safe"], "1 0 1 a 1 c 1 d");
}

#[test]
fn test_path_vms_file() {
    sitectl()
        .args(["path", "[FOLDER1.FOLDER2]FILE.TXT;1", "--file", "--type", "vms"])
        .assert()
        .success()
        .stdout(predicate::str::contains("path: [FOLDER1.FOLDER2]"))
        .stdout(predicate::str::contains("type: vms"))
        .stdout(predicate::str::contains("file: FILE.TXT;1"));
}

#[test]
fn test_path_mvs_parent() {
    let report = json_output(&["path", "'FOO.BAR.BAZ'"]);
    assert_eq!(report["server_type"], "mvs");
    assert_eq!(report["parent"], "'FOO.BAR.'");
}

#[test]
fn test_path_explicit_type() {
    let report = json_output(&["path", "C:\\foo\\..\\bar", "--type", "dos"]);
    assert_eq!(report["server_type"], "dos");
    assert_eq!(report["path"], "C:\\bar");
}

#[test]
fn test_path_cd() {
    let report = json_output(&["path", "/a/b", "--cd", "../c", "--cd", "d"]);
    assert_eq!(report["path"], "/a/c/d");
}

#[test]
fn test_path_cd_above_root_fails() {
    sitectl()
        .args(["path", "/a", "--cd", "../.."])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot change from /a"));
}

#[test]
fn test_path_relative_fails() {
    sitectl()
        .args(["path", "relative/path", "--type", "unix"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot parse remote path"));
}

#[test]
fn test_path_unknown_type() {
    sitectl()
        .args(["path", "/a", "--type", "amiga"])
        .assert()
        .failure();
}

// ============================================================================
// safe-decode
// ============================================================================

#[test]
fn test_safe_decode() {
    sitectl()
        .args(["safe-decode", "1 0 3 foo 7 bar baz"])
        .assert()
        .success()
        .stdout(predicate::str::contains("path: /foo/bar baz"))
        .stdout(predicate::str::contains("segments: foo | bar baz"));
}

#[test]
fn test_safe_decode_round_trip() {
    let encoded = json_output(&["path", "DISK:[dir1.dir2]"]);
    let safe = encoded["safe"].as_str().unwrap();
    let decoded = json_output(&["safe-decode", safe]);
    assert_eq!(decoded["path"], encoded["path"]);
    assert_eq!(decoded["server_type"], "vms");
    assert_eq!(decoded["prefix"], "DISK:");
}

#[test]
fn test_safe_decode_malformed() {
    for safe in ["x", "1 0 3 fo", "10 0", ""] {
        sitectl().args(["safe-decode", safe]).assert().failure();
    }
}

// ============================================================================
// local
// ============================================================================

#[test]
fn test_local_posix() {
    let report = json_output(&["local", "/a//b/./c/..", "--flavor", "posix"]);
    assert_eq!(report["path"], "/a/b/");
    assert_eq!(report["flavor"], "posix");
    assert_eq!(report["parent"], "/a/");
    assert_eq!(report["writeable"], true);
}

#[test]
fn test_local_windows() {
    sitectl()
        .args(["local", "C:\\a\\..\\b\\", "--flavor", "windows"])
        .assert()
        .success()
        .stdout(predicate::str::contains("path: C:\\b\\"))
        .stdout(predicate::str::contains("flavor: windows"));
}

#[test]
fn test_local_file() {
    let report = json_output(&["local", "/a/b/file.txt", "--file", "--flavor", "posix"]);
    assert_eq!(report["path"], "/a/b/");
    assert_eq!(report["file"], "file.txt");
}

#[test]
fn test_local_relative_fails() {
    sitectl()
        .args(["local", "relative", "--flavor", "posix"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot parse local path"));
}

#[cfg(unix)]
#[test]
fn test_local_check_existing() {
    let dir = tempfile::tempdir().unwrap();
    sitectl()
        .args(["local", dir.path().to_str().unwrap(), "--check"])
        .assert()
        .success();
}

#[cfg(unix)]
#[test]
fn test_local_check_missing() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing");
    sitectl()
        .args(["local", missing.to_str().unwrap(), "--check"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist or cannot be accessed"));
}

#[cfg(unix)]
#[test]
fn test_local_check_file_is_not_directory() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("plain");
    std::fs::write(&file, b"x").unwrap();
    sitectl()
        .args(["local", file.to_str().unwrap(), "--check"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("is not a directory"));
}

// ============================================================================
// site
// ============================================================================

#[test]
fn test_site_record() {
    let dir = tempfile::tempdir().unwrap();
    let record = dir.path().join("site.json");
    std::fs::write(
        &record,
        r#"{"protocol":"sftp","host":"example.com","port":22,"logon_type":"normal","user":"bob","pass":"secret","name":"work"}"#,
    )
    .unwrap();
    let report = json_output(&["site", record.to_str().unwrap()]);
    assert_eq!(report["server"], "sftp://bob@example.com");
    assert_eq!(report["has_password"], true);
}

#[test]
fn test_site_record_invalid() {
    let dir = tempfile::tempdir().unwrap();
    let record = dir.path().join("site.json");
    std::fs::write(
        &record,
        r#"{"protocol":"ftp","host":"example.com","port":21,"timezone_offset":5000}"#,
    )
    .unwrap();
    sitectl()
        .args(["site", record.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid site record"))
        .stderr(predicate::str::contains("out of range"));
}

#[test]
fn test_site_record_missing_file() {
    sitectl()
        .args(["site", "/nonexistent/site.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to read site record"));
}
