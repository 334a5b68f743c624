//! Integration tests for the libgit2 backend against real repositories.

use std::path::Path;

use gantry_git::{EntryKind, Git2Repository, GitError, GitRepository, RefKind};
use git2::{Oid, Repository, Signature};
use tempfile::TempDir;

/// Write `files` into the work tree and commit them on HEAD.
fn commit_files(repo: &Repository, message: &str, files: &[(&str, &str)]) -> Oid {
    let workdir = repo.workdir().unwrap().to_path_buf();
    let mut index = repo.index().unwrap();
    for (path, content) in files {
        let full = workdir.join(path);
        std::fs::create_dir_all(full.parent().unwrap()).unwrap();
        std::fs::write(&full, content).unwrap();
        index.add_path(Path::new(path)).unwrap();
    }
    index.write().unwrap();
    let tree_id = index.write_tree().unwrap();
    let tree = repo.find_tree(tree_id).unwrap();
    let sig = Signature::now("Test", "test@example.com").unwrap();

    let parents = match repo.head() {
        Ok(head) => vec![head.peel_to_commit().unwrap()],
        Err(_) => vec![],
    };
    let parent_refs: Vec<_> = parents.iter().collect();
    repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parent_refs)
        .unwrap()
}

fn init_repo() -> (TempDir, Repository) {
    let dir = TempDir::new().unwrap();
    let mut opts = git2::RepositoryInitOptions::new();
    opts.initial_head("main");
    let repo = Repository::init_opts(dir.path(), &opts).unwrap();
    (dir, repo)
}

#[test]
fn test_branch_and_default_branch() {
    let (dir, repo) = init_repo();
    let oid = commit_files(&repo, "fix bug\nbody", &[("README.md", "hi")]);

    let git = Git2Repository::open(dir.path()).unwrap();
    assert_eq!(git.default_branch().unwrap(), "main");

    let commit = git.branch_commit("main").unwrap();
    assert_eq!(commit.id, oid.to_string());
    assert_eq!(commit.summary(), "fix bug");
}

#[test]
fn test_missing_branch_is_ref_not_found() {
    let (dir, repo) = init_repo();
    commit_files(&repo, "init", &[("README.md", "hi")]);

    let git = Git2Repository::open(dir.path()).unwrap();
    let err = git.branch_commit("nope").unwrap_err();
    assert!(matches!(
        err,
        GitError::RefNotFound {
            kind: RefKind::Branch,
            ..
        }
    ));
}

#[test]
fn test_annotated_tag_is_peeled() {
    let (dir, repo) = init_repo();
    let oid = commit_files(&repo, "release", &[("README.md", "hi")]);
    let target = repo.find_object(oid, None).unwrap();
    let sig = Signature::now("Test", "test@example.com").unwrap();
    repo.tag("v1.0", &target, &sig, "release v1.0", false)
        .unwrap();
    repo.tag_lightweight("light", &target, false).unwrap();

    let git = Git2Repository::open(dir.path()).unwrap();
    assert_eq!(git.tag_commit("v1.0").unwrap().id, oid.to_string());
    assert_eq!(git.tag_commit("light").unwrap().id, oid.to_string());
    assert!(git.tag_commit("v2.0").unwrap_err().is_not_found());
}

#[test]
fn test_tree_entries_and_read_blob() {
    let (dir, repo) = init_repo();
    commit_files(
        &repo,
        "workflows",
        &[
            (".gitea/workflows/build.yml", "name: build\n"),
            (".gitea/workflows/lint.yaml", "name: lint\n"),
            (".gitea/workflows/scripts/run.sh", "echo\n"),
        ],
    );

    let git = Git2Repository::open(dir.path()).unwrap();
    let commit = git.branch_commit("main").unwrap();

    let entries = git.tree_entries(&commit, ".gitea/workflows").unwrap();
    let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["build.yml", "lint.yaml", "scripts"]);
    assert_eq!(entries[2].kind, EntryKind::Tree);
    assert_eq!(entries[0].path, ".gitea/workflows/build.yml");

    assert_eq!(git.read_blob(&entries[0]).unwrap(), b"name: build\n");

    let err = git.tree_entries(&commit, ".github/workflows").unwrap_err();
    assert!(matches!(err, GitError::PathNotFound(_)));
}

#[test]
fn test_open_missing_repository() {
    let dir = TempDir::new().unwrap();
    let err = Git2Repository::open(dir.path().join("nope")).err().unwrap();
    assert!(matches!(err, GitError::Open { .. }));
}
