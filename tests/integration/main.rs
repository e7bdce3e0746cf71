//! Integration tests for the strata binary
//!
//! Each test builds a small repository in a temporary directory and runs the
//! compiled CLI against it.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

fn strata(root: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_strata"))
        .arg("--root")
        .arg(root)
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute strata")
}

fn sample_repo() -> TempDir {
    let dir = TempDir::new().unwrap();
    for (path, content) in [
        ("src/lib.rs", "//! Sample\npub mod a;\npub mod b;\n"),
        ("src/a.rs", "use crate::b::B;\npub struct A;\n"),
        ("src/b.rs", "use crate::a::A;\npub struct B;\n"),
        ("README.md", "# Sample\n\nSee [lib](src/lib.rs).\n"),
        ("Cargo.toml", "[package]\nname = \"sample\"\n"),
    ] {
        let full = dir.path().join(path);
        fs::create_dir_all(full.parent().unwrap()).unwrap();
        fs::write(full, content).unwrap();
    }
    dir
}

#[test]
fn test_cli_invocation() {
    let output = Command::new(env!("CARGO_BIN_EXE_strata"))
        .arg("--help")
        .output()
        .expect("Failed to execute strata");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success());
    assert!(stdout.contains("analyze"));
    assert!(stdout.contains("evolution"));
}

#[test]
fn test_version() {
    let repo = TempDir::new().unwrap();
    let output = strata(repo.path(), &["version"]);
    assert!(String::from_utf8_lossy(&output.stdout).starts_with("Strata v"));
}

#[test]
fn test_analyze_writes_outputs() {
    let repo = sample_repo();
    let output = strata(repo.path(), &["analyze"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let graph: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(repo.path().join("dependency_graph.json")).unwrap()).unwrap();
    let nodes = graph["nodes"].as_array().unwrap();
    assert_eq!(nodes.len(), 5);
    let links = graph["links"].as_array().unwrap();
    assert!(links.iter().any(|l| l["source"] == "README.md" && l["target"] == "src/lib.rs"));
    assert_eq!(links.iter().filter(|l| l["broken"] == true).count(), 1);

    let report = fs::read_to_string(repo.path().join("DEPENDENCY_ANALYSIS.md")).unwrap();
    assert!(report.contains("# Dependency Analysis"));
    assert!(report.contains("bidirectional-link"));
    assert!(repo.path().join(".strata/state.bin").is_file());
    assert!(repo.path().join(".strata/evolution.json").is_file());
}

#[test]
fn test_second_run_is_fully_cached_and_tracks_evolution() {
    let repo = sample_repo();
    assert!(strata(repo.path(), &["analyze"]).status.success());
    let first = fs::read_to_string(repo.path().join("dependency_graph.json")).unwrap();

    assert!(strata(repo.path(), &["analyze"]).status.success());
    let second = fs::read_to_string(repo.path().join("dependency_graph.json")).unwrap();
    assert_eq!(first, second);

    let report = fs::read_to_string(repo.path().join("DEPENDENCY_ANALYSIS.md")).unwrap();
    assert!(report.contains("| Cache hit rate | 100.0% |"));
    assert!(report.contains("## Repository Evolution"));

    let evolution = strata(repo.path(), &["evolution"]);
    assert!(String::from_utf8_lossy(&evolution.stdout).contains("**Snapshots recorded:** 2"));
}

#[test]
fn test_dry_run_prints_and_writes_nothing() {
    let repo = sample_repo();
    let output = strata(repo.path(), &["analyze", "--dry-run"]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("# Dependency Analysis"));
    assert!(!repo.path().join("dependency_graph.json").exists());
    assert!(!repo.path().join(".strata").exists());
}

#[test]
fn test_custom_output_paths() {
    let repo = sample_repo();
    let out = TempDir::new().unwrap();
    let graph = out.path().join("graph/out.json");
    let report = out.path().join("report.md");
    let output = strata(
        repo.path(),
        &["analyze", "--full", "--graph-out", graph.to_str().unwrap(), "--report-out", report.to_str().unwrap()],
    );
    assert!(output.status.success());
    assert!(graph.is_file());
    assert!(report.is_file());
    assert!(!repo.path().join("dependency_graph.json").exists());
}

#[test]
fn test_custom_outputs_inside_root_are_not_scanned() {
    let repo = TempDir::new().unwrap();
    fs::write(repo.path().join("a.md"), "# A\n[b](b.md)\n").unwrap();
    fs::write(repo.path().join("b.md"), "# B\n[a](a.md)\n").unwrap();
    let graph = repo.path().join("out.json");
    let report = repo.path().join("reports/out.md");
    let args = [
        "analyze",
        "--graph-out",
        graph.to_str().unwrap(),
        "--report-out",
        report.to_str().unwrap(),
    ];

    let node_ids = |json: &str| -> Vec<String> {
        let value: serde_json::Value = serde_json::from_str(json).unwrap();
        value["nodes"]
            .as_array()
            .unwrap()
            .iter()
            .map(|node| node["id"].as_str().unwrap().to_string())
            .collect()
    };

    assert!(strata(repo.path(), &args).status.success());
    let first = fs::read_to_string(&graph).unwrap();
    assert_eq!(node_ids(&first), vec!["a.md", "b.md"]);

    assert!(strata(repo.path(), &args).status.success());
    let second = fs::read_to_string(&graph).unwrap();
    assert_eq!(node_ids(&second), vec!["a.md", "b.md"]);
    assert_eq!(first, second);
    assert!(fs::read_to_string(&report).unwrap().contains("| Cache hit rate | 100.0% |"));
}

#[test]
fn test_clear_removes_cache() {
    let repo = sample_repo();
    assert!(strata(repo.path(), &["analyze"]).status.success());
    assert!(repo.path().join(".strata").exists());
    assert!(strata(repo.path(), &["clear"]).status.success());
    assert!(!repo.path().join(".strata").exists());
}

#[test]
fn test_missing_root_fails() {
    let dir = TempDir::new().unwrap();
    let output = strata(&dir.path().join("missing"), &["analyze"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("root directory not found"));
}
