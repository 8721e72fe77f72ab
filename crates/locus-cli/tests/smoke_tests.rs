//! Smoke tests for the locus CLI

#![allow(deprecated)] // Allow deprecated Command::cargo_bin until assert_cmd is updated
#![allow(clippy::expect_used, clippy::unwrap_used)]

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

const PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><script>var tracking = true;</script></head>
<body>
  <button id="go" onclick="x()">Go</button>
</body>
</html>"#;

/// Get a command for the locus binary with a clean environment
fn locus() -> Command {
    let mut cmd = Command::cargo_bin("locus").expect("locus binary should exist");
    cmd.env_remove("LOCUS_CACHE_DIR")
        .env_remove("LOCUS_API_KEY")
        .env_remove("OPENAI_API_KEY")
        .env_remove("LOCUS_BASE_URL")
        .env_remove("LOCUS_MODEL")
        .env_remove("RUST_LOG");
    cmd
}

fn seed_cache(dir: &TempDir, suite: &str, body: &str) {
    let cache = dir.path().join("cache");
    fs::create_dir_all(&cache).unwrap();
    fs::write(cache.join(format!("{suite}.json")), body).unwrap();
}

const LOGIN_CACHE: &str = r##"{
  "go-btn": {
    "selector": "#go",
    "description": "Go button",
    "lastUpdated": "2026-01-01T12:00:00Z"
  }
}"##;

// ============================================================================
// Basic CLI Tests
// ============================================================================

#[test]
fn test_version_flag() {
    locus()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("0.3.0"));
}

#[test]
fn test_help_lists_commands() {
    locus()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("cache"))
        .stdout(predicate::str::contains("reduce"))
        .stdout(predicate::str::contains("resolve"));
}

#[test]
fn test_no_args_fails() {
    locus().assert().failure();
}

// ============================================================================
// reduce
// ============================================================================

#[test]
fn test_reduce_prints_snapshot() {
    let dir = TempDir::new().unwrap();
    let page = dir.path().join("page.html");
    fs::write(&page, PAGE).unwrap();

    locus()
        .arg("reduce")
        .arg(&page)
        .assert()
        .success()
        .stdout(predicate::str::contains(r#"<button id="go">Go</button>"#))
        .stdout(predicate::str::contains("tracking").not())
        .stdout(predicate::str::contains("onclick").not());
}

#[test]
fn test_reduce_missing_file_fails() {
    locus()
        .args(["reduce", "/no/such/page.html"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot read"));
}

// ============================================================================
// cache
// ============================================================================

#[test]
fn test_cache_list_empty() {
    let dir = TempDir::new().unwrap();
    locus()
        .args(["cache", "list", "--dir"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("No cached suites"));
}

#[test]
fn test_cache_list_and_show() {
    let dir = TempDir::new().unwrap();
    seed_cache(&dir, "login", LOGIN_CACHE);

    locus()
        .args(["--color", "never", "cache", "list", "--dir"])
        .arg(dir.path().join("cache"))
        .assert()
        .success()
        .stdout(predicate::str::contains("login"))
        .stdout(predicate::str::contains("1 entry"));

    locus()
        .args(["--color", "never", "cache", "show", "login", "--dir"])
        .arg(dir.path().join("cache"))
        .assert()
        .success()
        .stdout(predicate::str::contains("go-btn"))
        .stdout(predicate::str::contains("#go"))
        .stdout(predicate::str::contains("2026-01-01 12:00:00 UTC"));
}

#[test]
fn test_cache_dir_from_env() {
    let dir = TempDir::new().unwrap();
    seed_cache(&dir, "login", LOGIN_CACHE);

    locus()
        .env("LOCUS_CACHE_DIR", dir.path().join("cache"))
        .args(["cache", "show", "login", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r##""selector": "#go""##));
}

#[test]
fn test_cache_forget_unknown_key_fails() {
    let dir = TempDir::new().unwrap();
    seed_cache(&dir, "login", LOGIN_CACHE);

    locus()
        .args(["cache", "forget", "login", "nope", "--dir"])
        .arg(dir.path().join("cache"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("no cached locator 'nope'"));

    locus()
        .args(["cache", "forget", "login", "go-btn", "--dir"])
        .arg(dir.path().join("cache"))
        .assert()
        .success();

    let text = fs::read_to_string(dir.path().join("cache").join("login.json")).unwrap();
    assert!(!text.contains("go-btn"));
}

#[test]
fn test_cache_clear_reports_blocked_write() {
    let dir = TempDir::new().unwrap();
    seed_cache(&dir, "login", LOGIN_CACHE);
    fs::create_dir(dir.path().join("cache").join("login.json.tmp")).unwrap();

    locus()
        .args(["cache", "clear", "login", "--dir"])
        .arg(dir.path().join("cache"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("cleared").not());

    let text = fs::read_to_string(dir.path().join("cache").join("login.json")).unwrap();
    assert!(text.contains("go-btn"));
}

// ============================================================================
// resolve
// ============================================================================

#[test]
fn test_resolve_requires_api_key() {
    let dir = TempDir::new().unwrap();
    let page = dir.path().join("page.html");
    fs::write(&page, PAGE).unwrap();

    locus()
        .args(["resolve", "--suite", "login", "--key", "go-btn", "--description", "Go button"])
        .arg("--html")
        .arg(&page)
        .arg("--dir")
        .arg(dir.path().join("cache"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("LOCUS_API_KEY"));
}

#[test]
fn test_resolve_uses_valid_cache_without_backend() {
    let dir = TempDir::new().unwrap();
    seed_cache(&dir, "login", LOGIN_CACHE);
    let page = dir.path().join("page.html");
    fs::write(&page, PAGE).unwrap();

    locus()
        .env("LOCUS_API_KEY", "sk-unused")
        .env("LOCUS_BASE_URL", "http://127.0.0.1:1")
        .args(["resolve", "--suite", "login", "--key", "go-btn", "--description", "Go button"])
        .arg("--html")
        .arg(&page)
        .arg("--dir")
        .arg(dir.path().join("cache"))
        .assert()
        .success()
        .stdout(predicate::str::diff("#go\n"));
}

#[test]
fn test_resolve_reports_unreachable_backend() {
    let dir = TempDir::new().unwrap();
    let page = dir.path().join("page.html");
    fs::write(&page, PAGE).unwrap();

    locus()
        .env("LOCUS_API_KEY", "sk-unused")
        .env("LOCUS_BASE_URL", "http://127.0.0.1:1")
        .args(["resolve", "--suite", "login", "--key", "go-btn", "--description", "Go button"])
        .arg("--html")
        .arg(&page)
        .arg("--dir")
        .arg(dir.path().join("cache"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Inference backend failed"));
}

#[cfg(not(feature = "browser"))]
#[test]
fn test_resolve_url_without_browser_feature() {
    locus()
        .env("LOCUS_API_KEY", "sk-unused")
        .args(["resolve", "--suite", "s", "--key", "k", "--description", "d"])
        .args(["--url", "http://localhost:9"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--features browser"));
}
