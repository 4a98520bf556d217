//! Argument handling and exit codes of the `pkgdive` binary.
//!
//! None of these reach the network: each fails or exits before a request.

#![allow(clippy::expect_used, clippy::unwrap_used, missing_docs)]

use assert_cmd::cargo::cargo_bin_cmd;

fn stderr_of(args: &[&str]) -> String {
    let assert = cargo_bin_cmd!("pkgdive").args(args).assert().failure();
    String::from_utf8(assert.get_output().stderr.clone()).expect("utf8 stderr")
}

#[test]
fn missing_source_prints_usage_and_fails() {
    let stderr = stderr_of(&[]);
    assert!(stderr.contains("Usage"), "usage missing: {stderr}");
    assert!(stderr.contains("<SOURCE>"), "source argument missing: {stderr}");
}

#[test]
fn extra_positional_argument_is_rejected() {
    let stderr = stderr_of(&["oci://r.io/a:1", "oci://r.io/b:1"]);
    assert!(stderr.contains("unexpected argument"), "{stderr}");
}

#[test]
fn invalid_source_fails_before_any_request() {
    let stderr = stderr_of(&["not-a-package"]);
    assert!(stderr.contains("invalid package reference"), "{stderr}");
}

#[test]
fn invalid_platform_is_rejected() {
    let stderr = stderr_of(&["oci://r.io/a:1", "--platform", "linux"]);
    assert!(stderr.contains("invalid platform"), "{stderr}");
}

#[test]
fn missing_config_file_is_reported() {
    let dir = tempfile::tempdir().expect("tempdir");
    let missing = dir.path().join("absent.yaml");
    let stderr = stderr_of(&[
        "oci://r.io/a:1",
        "--config",
        missing.to_str().expect("utf8 path"),
    ]);
    assert!(stderr.contains("absent.yaml"), "{stderr}");
}

#[test]
fn help_describes_the_source_argument() {
    let assert = cargo_bin_cmd!("pkgdive").arg("--help").assert().success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).expect("utf8 stdout");
    assert!(stdout.contains("Package source"), "{stdout}");
    assert!(stdout.contains("--components"), "{stdout}");
}
