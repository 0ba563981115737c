//! CLI contract tests
//!
//! Runs the `keydiff` binary against a temp workspace. Contract guarantees:
//! - Exit 1 with remediation when a tester is missing, before any case runs
//! - Exit 0 after a run regardless of mismatches
//! - Progress and summary on stdout; artifacts written where configured

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

// =============================================================================
// Test fixture helpers
// =============================================================================

fn keydiff_in(dir: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("keydiff").expect("keydiff binary should be built");
    cmd.current_dir(dir)
        .env_remove("KEYDIFF_CONFIG")
        .env_remove("RUST_LOG");
    cmd
}

#[cfg(unix)]
mod fake_testers {
    use std::os::unix::fs::PermissionsExt;
    use std::path::{Path, PathBuf};
    use std::sync::OnceLock;

    use tempfile::TempDir;

    const REFERENCE: &str = r#"#!/bin/sh
key=""; flags=""
while [ $# -gt 0 ]; do
  case "$1" in
    --key) key="$2"; shift 2 ;;
    --kitty-flags) flags="$2"; shift 2 ;;
    *) shift ;;
  esac
done
printf '%s' "$key"
"#;

    const TARGET: &str = r#"#!/bin/sh
key=""; flags=""
while [ $# -gt 0 ]; do
  case "$1" in
    --key) key="$2"; shift 2 ;;
    --kitty-flags) flags="$2"; shift 2 ;;
    *) shift ;;
  esac
done
if [ "$flags" = 5 ]; then printf 'X'; else printf '%s' "$key"; fi
"#;

    pub struct Testers {
        _dir: TempDir,
        pub kitty: PathBuf,
        pub target: PathBuf,
    }

    fn write_script(path: &Path, body: &str) {
        std::fs::write(path, body).expect("write tester script");
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
            .expect("chmod tester script");
    }

    /// Scripts are written once, before any test spawns a process.
    pub fn get() -> &'static Testers {
        static TESTERS: OnceLock<Testers> = OnceLock::new();
        TESTERS.get_or_init(|| {
            let dir = TempDir::new().expect("create tester dir");
            let kitty = dir.path().join("kitty_tester");
            let target = dir.path().join("fake_tester");
            write_script(&kitty, REFERENCE);
            write_script(&target, TARGET);
            Testers {
                _dir: dir,
                kitty,
                target,
            }
        })
    }

    /// Config with the fake reference and a `fake` target.
    pub fn write_config(dir: &Path) -> PathBuf {
        let testers = get();
        let path = dir.join("keydiff.toml");
        let config = format!(
            r#"
[testers]
kitty = "{kitty}"

[run]
progress_interval = 10
save_interval = 15
default_target = "fake"

[[targets]]
name = "fake"
executable = "{target}"
pass_keycode = true
fallback_markers = ["[EMPTY]"]
"#,
            kitty = testers.kitty.display(),
            target = testers.target.display(),
        );
        std::fs::write(&path, config).expect("write config");
        path
    }
}

// =============================================================================
// Pre-flight and listing
// =============================================================================

#[test]
fn missing_testers_exit_one_with_remediation() {
    let dir = TempDir::new().unwrap();
    keydiff_in(dir.path())
        .args(["--limit", "1"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains(
            "Tester executable for 'kitty' not found",
        ))
        .stderr(predicate::str::contains("make"));
    assert!(!dir.path().join("test_results.json").exists());
}

#[test]
fn list_targets_skips_preflight() {
    let dir = TempDir::new().unwrap();
    keydiff_in(dir.path())
        .arg("--list-targets")
        .assert()
        .success()
        .stdout(predicate::str::contains("kitty (reference)"))
        .stdout(predicate::str::contains("vte (default)"))
        .stdout(predicate::str::contains("far2l"));
}

#[test]
fn start_at_percent_out_of_range_is_usage_error() {
    let dir = TempDir::new().unwrap();
    keydiff_in(dir.path())
        .args(["--start-at-percent", "100"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("start-at-percent"));
}

#[test]
fn invalid_config_is_rejected() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("keydiff.toml");
    std::fs::write(&config, "[run]\nsave_interval = 0\n").unwrap();
    keydiff_in(dir.path())
        .arg("--config")
        .arg(&config)
        .arg("--list-targets")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("save_interval"));
}

#[test]
fn missing_config_file_is_reported() {
    let dir = TempDir::new().unwrap();
    keydiff_in(dir.path())
        .env("KEYDIFF_CONFIG", dir.path().join("absent.toml"))
        .arg("--list-targets")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Config file not found"));
}

// =============================================================================
// Runs against fake testers
// =============================================================================

#[cfg(unix)]
#[test]
fn list_targets_includes_configured_target() {
    let dir = TempDir::new().unwrap();
    let config = fake_testers::write_config(dir.path());
    keydiff_in(dir.path())
        .arg("--config")
        .arg(&config)
        .arg("--list-targets")
        .assert()
        .success()
        .stdout(predicate::str::contains("fake (default)"));
}

#[cfg(unix)]
#[test]
fn unknown_target_exits_one() {
    let dir = TempDir::new().unwrap();
    let config = fake_testers::write_config(dir.path());
    keydiff_in(dir.path())
        .arg("--config")
        .arg(&config)
        .args(["--target", "xterm"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Unknown target 'xterm'"))
        .stderr(predicate::str::contains("--list-targets"));
}

#[cfg(unix)]
#[test]
fn limited_run_writes_artifacts_and_summary() {
    let dir = TempDir::new().unwrap();
    let config = fake_testers::write_config(dir.path());
    keydiff_in(dir.path())
        .arg("--config")
        .arg(&config)
        .args(["--limit", "40"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Starting tests against 'fake'. Combinations to check: 40",
        ))
        .stdout(predicate::str::contains("Progress: 25% (10/40)"))
        .stdout(predicate::str::contains("--- Test Summary ---"))
        .stdout(predicate::str::contains("Total tests run: 40"))
        .stdout(predicate::str::contains("  Mismatches: 2"))
        .stdout(predicate::str::contains("  Matches: 38"));

    let json = std::fs::read_to_string(dir.path().join("test_results.json")).unwrap();
    let records: serde_json::Value = serde_json::from_str(&json).unwrap();
    let records = records.as_array().unwrap();
    assert_eq!(records.len(), 40);
    assert_eq!(records[0]["combo"], "Key: a, Flags: 0");
    assert_eq!(records[5]["status"], "mismatch");
    assert_eq!(records[32]["combo"], "Key: caps+a, Flags: 0");

    let log = std::fs::read_to_string(dir.path().join("mismatches.log")).unwrap();
    assert!(log.starts_with("Found 2 mismatches for target 'fake'.\n\n"));
    assert!(log.contains("Key: a, Flags: 5      -> kitty: a | fake: X"));
    assert!(!dir.path().join("test_results.json.tmp").exists());
}

#[cfg(unix)]
#[test]
fn artifact_paths_can_be_overridden() {
    let dir = TempDir::new().unwrap();
    let config = fake_testers::write_config(dir.path());
    keydiff_in(dir.path())
        .arg("--config")
        .arg(&config)
        .args([
            "--limit",
            "3",
            "--results-file",
            "out/results.json",
            "--mismatch-log",
            "out/diff.log",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Full results are in 'out/results.json'"));
    assert!(dir.path().join("out/results.json").exists());
    assert!(dir.path().join("out/diff.log").exists());
    assert!(!dir.path().join("test_results.json").exists());
}

#[cfg(unix)]
#[test]
fn resume_reports_start_offset() {
    let dir = TempDir::new().unwrap();
    let config = fake_testers::write_config(dir.path());
    keydiff_in(dir.path())
        .arg("--config")
        .arg(&config)
        .args(["--start-at-percent", "50", "--limit", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Resuming at case 49664 of 99328."))
        .stdout(predicate::str::contains("Total tests run: 2"));
}

#[cfg(unix)]
#[test]
fn debug_echoes_tester_command_lines() {
    let dir = TempDir::new().unwrap();
    let config = fake_testers::write_config(dir.path());
    let testers = fake_testers::get();
    let reference_line = format!("{} --key a --kitty-flags 0", testers.kitty.display());
    let target_line = format!(
        "{} --key a --keycode 38 --kitty-flags 0",
        testers.target.display()
    );
    keydiff_in(dir.path())
        .arg("--config")
        .arg(&config)
        .args(["--debug", "--limit", "1"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Running tester"))
        .stderr(predicate::str::contains(reference_line))
        .stderr(predicate::str::contains(target_line))
        .stdout(predicate::str::contains("  Matches: 1"));
}
