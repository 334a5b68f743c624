//! CLI integration tests for the Gantry command-line interface.
//!
//! The parsing tests need no repository. The workflow tests build a real git
//! repository and config file in a temp directory and drive the binary
//! against them.

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use git2::{Repository, Signature};
use predicates::prelude::*;
use tempfile::TempDir;

/// Get a command for the gantry binary, isolated from the user's config.
fn gantry(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("gantry").unwrap();
    cmd.env("GANTRY_CONFIG_DIR", home).env_remove("GANTRY_CONFIG");
    cmd
}

const BUILD: &str = r#"
name: Build
run-name: Build ${{ github.ref_name }} for ${{ github.actor }}
on:
  workflow_dispatch:
    inputs:
      level:
        type: choice
        options: [low, high]
        default: low
jobs:
  test:
    runs-on: ubuntu-latest
    strategy:
      matrix:
        os: [linux, mac]
    steps:
      - run: make test
  package:
    needs: test
    runs-on: ubuntu-latest
    steps:
      - run: make package
"#;

struct Fixture {
    dir: TempDir,
    config: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let repo_dir = dir.path().join("widgets");
        let mut opts = git2::RepositoryInitOptions::new();
        opts.initial_head("main");
        let repo = Repository::init_opts(&repo_dir, &opts).unwrap();
        commit_file(&repo, ".gitea/workflows/build.yml", BUILD);

        let config = dir.path().join("gantry.toml");
        std::fs::write(
            &config,
            format!(
                r#"
[store]
path = '{store}'

[logging]
dir = '{logs}'

[user]
id = 7
login = "octo"
email = "octo@example.com"

[repositories.widgets]
path = '{repo}'
id = 42
owner = "acme"
owner_id = 3
"#,
                store = dir.path().join("runs.db").display(),
                logs = dir.path().join("logs").display(),
                repo = repo_dir.display(),
            ),
        )
        .unwrap();

        Self { dir, config }
    }

    fn cmd(&self) -> Command {
        let mut cmd = gantry(self.dir.path());
        cmd.arg("--config").arg(&self.config);
        cmd
    }
}

fn commit_file(repo: &Repository, path: &str, content: &str) {
    let workdir = repo.workdir().unwrap().to_path_buf();
    let full = workdir.join(path);
    std::fs::create_dir_all(full.parent().unwrap()).unwrap();
    std::fs::write(&full, content).unwrap();
    let mut index = repo.index().unwrap();
    index.add_path(Path::new(path)).unwrap();
    index.write().unwrap();
    let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
    let sig = Signature::now("Test", "test@example.com").unwrap();
    repo.commit(Some("HEAD"), &sig, &sig, "add workflow", &tree, &[])
        .unwrap();
}

fn dispatch_json(fixture: &Fixture) -> serde_json::Value {
    let output = fixture
        .cmd()
        .args(["--json", "dispatch", "widgets", "build.yml", "--ref", "main"])
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "{}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).unwrap()
}

// ─────────────────────────────────────────────────────────────────────────────
// Help and Version Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_help_displays() {
    let home = TempDir::new().unwrap();
    gantry(home.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Gantry"))
        .stdout(predicate::str::contains("workflow dispatch"));
}

#[test]
fn test_version_displays() {
    let home = TempDir::new().unwrap();
    gantry(home.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("gantry"));
}

#[test]
fn test_help_lists_subcommands() {
    let home = TempDir::new().unwrap();
    gantry(home.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("dispatch"))
        .stdout(predicate::str::contains("workflows"))
        .stdout(predicate::str::contains("runs"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_dispatch_requires_ref() {
    let home = TempDir::new().unwrap();
    gantry(home.path())
        .args(["dispatch", "widgets", "build.yml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--ref"));
}

#[test]
fn test_unknown_subcommand_fails() {
    let home = TempDir::new().unwrap();
    gantry(home.path()).arg("launch").assert().failure();
}

// ─────────────────────────────────────────────────────────────────────────────
// Workflow Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_dispatch_creates_run() {
    let fixture = Fixture::new();
    let out = dispatch_json(&fixture);

    assert_eq!(out["run"]["title"], "Build main for octo");
    assert_eq!(out["run"]["ref_name"], "refs/heads/main");
    assert_eq!(out["run"]["index"], 1);
    assert_eq!(out["run"]["event"], "workflow_dispatch");

    let names: Vec<_> = out["jobs"]
        .as_array()
        .unwrap()
        .iter()
        .map(|j| j["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["test (linux)", "test (mac)", "package"]);
    assert_eq!(out["superseded"], serde_json::json!([]));

    let payload: serde_json::Value =
        serde_json::from_str(out["run"]["event_payload"].as_str().unwrap()).unwrap();
    assert_eq!(payload["inputs"]["level"], "low");
    assert_eq!(payload["ref"], "main");
}

#[test]
fn test_second_dispatch_supersedes_first() {
    let fixture = Fixture::new();
    let first = dispatch_json(&fixture);
    let second = dispatch_json(&fixture);

    assert_eq!(second["run"]["index"], 2);
    assert_eq!(second["superseded"], serde_json::json!([first["run"]["id"]]));
}

#[test]
fn test_dispatch_rejects_unknown_choice() {
    let fixture = Fixture::new();
    fixture
        .cmd()
        .args(["dispatch", "widgets", "build.yml", "--ref", "main"])
        .args(["-i", "level=extreme"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("level"));
}

#[test]
fn test_dispatch_unknown_ref_fails() {
    let fixture = Fixture::new();
    fixture
        .cmd()
        .args(["dispatch", "widgets", "build.yml", "--ref", "nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not_found"));
}

#[test]
fn test_disabled_workflow_is_refused() {
    let fixture = Fixture::new();
    fixture
        .cmd()
        .args(["workflows", "disable", "widgets", "build.yml"])
        .assert()
        .success();

    fixture
        .cmd()
        .args(["dispatch", "widgets", "build.yml", "--ref", "main"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("disabled"));

    fixture
        .cmd()
        .args(["workflows", "enable", "widgets", "build.yml"])
        .assert()
        .success();
    dispatch_json(&fixture);
}

#[test]
fn test_workflows_list_json() {
    let fixture = Fixture::new();
    let output = fixture
        .cmd()
        .args(["--json", "workflows", "list", "widgets"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let list: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(list[0]["id"], "build.yml");
    assert_eq!(list[0]["name"], "Build");
    assert_eq!(list[0]["dispatchable"], true);
    assert_eq!(list[0]["disabled"], false);
}

#[test]
fn test_runs_list_and_jobs() {
    let fixture = Fixture::new();
    let out = dispatch_json(&fixture);
    let run_id = out["run"]["id"].as_i64().unwrap();

    fixture
        .cmd()
        .args(["runs", "list", "widgets"])
        .assert()
        .success()
        .stdout(predicate::str::contains("build.yml"));

    fixture
        .cmd()
        .args(["runs", "jobs", &run_id.to_string()])
        .assert()
        .success()
        .stdout(predicate::str::contains("needs test"));
}

#[test]
fn test_unknown_repository_fails() {
    let fixture = Fixture::new();
    fixture
        .cmd()
        .args(["workflows", "list", "gadgets"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("gadgets"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Config Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_config_init_then_which() {
    let home = TempDir::new().unwrap();
    gantry(home.path())
        .current_dir(home.path())
        .args(["config", "init"])
        .assert()
        .success();
    assert!(home.path().join("config.toml").is_file());

    gantry(home.path())
        .current_dir(home.path())
        .args(["config", "init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    let output = gantry(home.path())
        .current_dir(home.path())
        .args(["--json", "config", "which"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let sources: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(sources[0]["layer"], "user");
    assert_eq!(sources[0]["loaded"], true);
    assert_eq!(sources[1]["layer"], "project");
    assert_eq!(sources[1]["loaded"], false);
}

#[test]
fn test_explicit_config_must_exist() {
    let home = TempDir::new().unwrap();
    gantry(home.path())
        .args(["--config", "missing.toml", "config", "show"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing.toml"));
}
