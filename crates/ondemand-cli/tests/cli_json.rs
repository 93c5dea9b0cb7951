//! Integration tests for `ondemand --json` output.
//!
//! These tests verify:
//! - `transform`, `lock` and `cache clear` always print valid JSON
//! - `ok` is present and failures carry a SCREAMING_SNAKE_CASE code
//! - No Node.js installation is needed for any of them

use std::process::Command;
use tempfile::tempdir;

fn cargo_bin() -> Command {
    let mut cmd = Command::new(env!("CARGO"));
    cmd.args(["run", "-p", "ondemand-cli", "--bin", "ondemand", "--"]);
    cmd
}

fn run_json(args: &[&str], cwd: &std::path::Path) -> (serde_json::Value, bool) {
    let output = cargo_bin()
        .args(args)
        .arg("--json")
        .arg("--cwd")
        .arg(cwd)
        .output()
        .expect("Failed to run ondemand");

    let stdout = String::from_utf8_lossy(&output.stdout);
    let json: serde_json::Value =
        serde_json::from_str(&stdout).expect("Output should be valid JSON");
    (json, output.status.success())
}

fn project() -> tempfile::TempDir {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("package.json"), r#"{"name": "app"}"#).unwrap();
    dir
}

#[test]
fn test_version_prints_name() {
    let output = cargo_bin().arg("version").output().unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).starts_with("ondemand "));
}

#[test]
fn test_transform_json_reports_imports() {
    let dir = project();
    std::fs::create_dir_all(dir.path().join("src")).unwrap();
    std::fs::write(
        dir.path().join("src/App.ts"),
        "import { useState } from 'react';\nimport './app.css';\nexport const count: number = 1;\n",
    )
    .unwrap();

    let (json, success) = run_json(&["transform", "src/App.ts"], dir.path());
    assert!(success);
    assert_eq!(json["ok"], true);

    let code = json["code"].as_str().unwrap();
    assert!(code.contains("data:text/javascript;base64,"));
    assert!(!code.contains("app.css"));
    assert!(!code.contains(": number"));

    let imports = json["imports"].as_array().unwrap();
    assert_eq!(imports[0]["specifier"], "react");
    assert_eq!(imports[0]["kind"], "RuntimeShim");
    assert_eq!(imports[0]["rewritten"], true);
    assert!(json["warnings"].as_array().unwrap().is_empty());
}

#[test]
fn test_transform_missing_file_error_code() {
    let dir = project();

    let (json, success) = run_json(&["transform", "src/Missing.tsx"], dir.path());
    assert!(!success);
    assert_eq!(json["ok"], false);

    let code = json["error"]["code"].as_str().unwrap();
    assert_eq!(code, "FILE_NOT_FOUND");
    assert!(
        code.chars().all(|c| c.is_ascii_uppercase() || c == '_'),
        "error code should be SCREAMING_SNAKE_CASE"
    );
}

#[test]
fn test_transform_syntax_error_code() {
    let dir = project();
    std::fs::write(dir.path().join("Broken.tsx"), "export const = <div>;\n").unwrap();

    let (json, success) = run_json(&["transform", "Broken.tsx"], dir.path());
    assert!(!success);
    assert_eq!(json["error"]["code"], "SYNTAX_TRANSFORM_ERROR");
}

#[test]
fn test_lock_json_reports_installed_runtime() {
    let dir = project();
    let react = dir.path().join("node_modules/react");
    std::fs::create_dir_all(&react).unwrap();
    std::fs::write(
        react.join("package.json"),
        r#"{"name": "react", "main": "index.js"}"#,
    )
    .unwrap();
    std::fs::write(react.join("index.js"), "module.exports = {};\n").unwrap();

    let (json, success) = run_json(&["lock"], dir.path());
    assert!(success);
    assert_eq!(json["ok"], true);
    assert!(json["lock"]["uiRuntimePath"]
        .as_str()
        .unwrap()
        .ends_with("index.js"));
    assert!(json["lock"]["rendererPath"].is_null());
}

#[test]
fn test_cache_clear_json() {
    let dir = project();
    let cache = dir.path().join(".ondemand");
    std::fs::create_dir_all(&cache).unwrap();
    std::fs::write(cache.join("dep-0000000000000000.mjs"), "").unwrap();

    let (json, success) = run_json(&["cache", "clear"], dir.path());
    assert!(success);
    assert_eq!(json["removed"], true);
    assert!(!cache.exists());

    let (json, _) = run_json(&["cache", "clear"], dir.path());
    assert_eq!(json["removed"], false);
}

#[test]
fn test_config_file_overrides_cache_dir() {
    let dir = project();
    std::fs::write(
        dir.path().join("ondemand.json"),
        r#"{"cacheDir": "tmp/modules"}"#,
    )
    .unwrap();
    std::fs::create_dir_all(dir.path().join("tmp/modules")).unwrap();

    let (json, _) = run_json(&["cache", "clear"], dir.path());
    assert!(json["cache_dir"]
        .as_str()
        .unwrap()
        .ends_with("tmp/modules"));
    assert!(!dir.path().join("tmp/modules").exists());
}
