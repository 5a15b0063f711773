//! CLI Integration Tests for Hostpaths
//!
//! Runs the `hostpaths` binary end to end.

#![cfg(unix)]

use std::fs;
use std::process::{Command, Output};
use tempfile::TempDir;

fn hostpaths(dir: &TempDir, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_hostpaths"))
        .current_dir(dir.path())
        .args(args)
        .output()
        .expect("Failed to run hostpaths")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn test_list_all_builtins() {
    let dir = TempDir::new().unwrap();
    let output = hostpaths(&dir, &["list"]);
    assert!(output.status.success());

    let text = stdout(&output);
    for name in ["path_sep_str", "read_directory_contents", "rename_file", "chdir"] {
        assert!(text.contains(name), "missing {name} in:\n{text}");
    }
}

#[test]
fn test_list_json_by_category() {
    let dir = TempDir::new().unwrap();
    let output = hostpaths(&dir, &["list", "--category", "listing", "--json"]);
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let entries = json.as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["id"], 12);
    assert_eq!(entries[0]["name"], "read_directory_contents");
    assert_eq!(entries[0]["returns"], "nullable_list");
}

#[test]
fn test_call_predicate_exit_status() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().to_str().unwrap();

    let output = hostpaths(&dir, &["call", "check_path_is_dir", path]);
    assert!(output.status.success());
    assert_eq!(stdout(&output).trim(), "true");

    let output = hostpaths(&dir, &["call", "check_path_is_file", path]);
    assert_eq!(output.status.code(), Some(1));
    assert_eq!(stdout(&output).trim(), "false");
}

#[test]
fn test_call_mutation_and_listing() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("made.txt");

    let output = hostpaths(&dir, &["call", "make_file", file.to_str().unwrap()]);
    assert!(output.status.success());
    assert!(file.is_file());

    let output = hostpaths(
        &dir,
        &["call", "read_directory_contents", dir.path().to_str().unwrap()],
    );
    assert!(output.status.success());
    assert_eq!(stdout(&output).trim(), "made.txt");
}

#[test]
fn test_call_absent_result() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("nope");

    let output = hostpaths(&dir, &["call", "resolve_real_path", missing.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(1));
    assert_eq!(stdout(&output).trim(), "(absent)");
}

#[test]
fn test_call_separator() {
    let dir = TempDir::new().unwrap();
    let output = hostpaths(&dir, &["call", "path_sep_chr"]);
    assert!(output.status.success());
    assert_eq!(stdout(&output).trim(), "/");
}

#[test]
fn test_call_rejects_bad_usage() {
    let dir = TempDir::new().unwrap();

    let output = hostpaths(&dir, &["call", "no_such_builtin"]);
    assert!(!output.status.success());

    let output = hostpaths(&dir, &["call", "make_symlink", "only-one"]);
    assert!(!output.status.success());
}

#[test]
fn test_info_uses_config_file() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("hostpaths.toml"),
        "[listing]\ninclude_dot_entries = true\n",
    )
    .unwrap();

    let output = hostpaths(&dir, &["info"]);
    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("Separator:      /"));
    assert!(text.contains("include_dot_entries = true"));
}

#[test]
fn test_invalid_config_is_reported() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("broken.toml");
    fs::write(&config, "[fs\n").unwrap();

    let output = hostpaths(&dir, &["--config", config.to_str().unwrap(), "info"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Failed to load config"));
}
