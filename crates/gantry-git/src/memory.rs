//! In-memory repository for tests and fixtures.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::RwLock;

use crate::{Commit, EntryKind, GitError, GitRepository, RefKind, Result, TreeEntry};

#[derive(Debug, Default)]
struct State {
    default_branch: String,
    branches: HashMap<String, Commit>,
    tags: HashMap<String, Commit>,
    /// Commit id → (path → content).
    trees: HashMap<String, BTreeMap<String, Vec<u8>>>,
}

/// A repository held entirely in memory.
///
/// Every trait call increments a counter so tests can assert that a code
/// path performed no repository I/O.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    state: RwLock<State>,
    calls: AtomicUsize,
}

impl MemoryRepository {
    /// Create an empty repository whose HEAD points at `default_branch`.
    pub fn new(default_branch: &str) -> Self {
        Self {
            state: RwLock::new(State {
                default_branch: default_branch.to_string(),
                ..Default::default()
            }),
            calls: AtomicUsize::new(0),
        }
    }

    /// Record a commit with the given files (path → content).
    pub fn commit(&self, id: &str, message: &str, files: &[(&str, &str)]) -> Commit {
        let commit = Commit {
            id: id.to_string(),
            message: message.to_string(),
        };
        let tree = files
            .iter()
            .map(|(path, content)| (path.to_string(), content.as_bytes().to_vec()))
            .collect();
        self.state.write().trees.insert(id.to_string(), tree);
        commit
    }

    /// Point a branch at a commit.
    pub fn set_branch(&self, name: &str, commit: &Commit) {
        self.state
            .write()
            .branches
            .insert(name.to_string(), commit.clone());
    }

    /// Point a tag at a commit.
    pub fn set_tag(&self, name: &str, commit: &Commit) {
        self.state
            .write()
            .tags
            .insert(name.to_string(), commit.clone());
    }

    /// Number of [`GitRepository`] calls made so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn record_call(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

impl GitRepository for MemoryRepository {
    fn tag_commit(&self, name: &str) -> Result<Commit> {
        self.record_call();
        self.state
            .read()
            .tags
            .get(name)
            .cloned()
            .ok_or_else(|| GitError::RefNotFound {
                kind: RefKind::Tag,
                name: name.to_string(),
            })
    }

    fn branch_commit(&self, name: &str) -> Result<Commit> {
        self.record_call();
        self.state
            .read()
            .branches
            .get(name)
            .cloned()
            .ok_or_else(|| GitError::RefNotFound {
                kind: RefKind::Branch,
                name: name.to_string(),
            })
    }

    fn default_branch(&self) -> Result<String> {
        self.record_call();
        Ok(self.state.read().default_branch.clone())
    }

    fn tree_entries(&self, commit: &Commit, dir: &str) -> Result<Vec<TreeEntry>> {
        self.record_call();
        let state = self.state.read();
        let tree = state
            .trees
            .get(&commit.id)
            .ok_or_else(|| GitError::ObjectNotFound(commit.id.clone()))?;

        let dir = dir.trim_matches('/');
        let prefix = if dir.is_empty() {
            String::new()
        } else {
            format!("{dir}/")
        };

        let mut entries: BTreeMap<String, TreeEntry> = BTreeMap::new();
        for path in tree.keys() {
            let Some(rest) = path.strip_prefix(&prefix) else {
                continue;
            };
            let (name, kind) = match rest.split_once('/') {
                Some((subdir, _)) => (subdir, EntryKind::Tree),
                None => (rest, EntryKind::Blob),
            };
            let entry_path = format!("{prefix}{name}");
            entries.entry(name.to_string()).or_insert_with(|| TreeEntry {
                name: name.to_string(),
                id: format!("{}:{}", commit.id, entry_path),
                path: entry_path,
                kind,
            });
        }

        if entries.is_empty() && !dir.is_empty() {
            return Err(GitError::PathNotFound(dir.to_string()));
        }
        Ok(entries.into_values().collect())
    }

    fn read_blob(&self, entry: &TreeEntry) -> Result<Vec<u8>> {
        self.record_call();
        let (commit_id, path) = entry
            .id
            .split_once(':')
            .ok_or_else(|| GitError::ObjectNotFound(entry.id.clone()))?;
        self.state
            .read()
            .trees
            .get(commit_id)
            .and_then(|tree| tree.get(path))
            .cloned()
            .ok_or_else(|| GitError::ObjectNotFound(entry.id.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> (MemoryRepository, Commit) {
        let repo = MemoryRepository::new("main");
        let commit = repo.commit(
            "c1",
            "init",
            &[
                (".gitea/workflows/build.yml", "jobs: {}"),
                (".gitea/workflows/nested/skip.yml", "jobs: {}"),
                ("README.md", "hello"),
            ],
        );
        repo.set_branch("main", &commit);
        (repo, commit)
    }

    #[test]
    fn test_tree_entries_lists_one_level() {
        let (repo, commit) = fixture();
        let entries = repo.tree_entries(&commit, ".gitea/workflows").unwrap();
        let names: Vec<_> = entries.iter().map(|e| (e.name.as_str(), e.kind)).collect();
        assert_eq!(
            names,
            vec![("build.yml", EntryKind::Blob), ("nested", EntryKind::Tree)]
        );
        assert_eq!(entries[0].path, ".gitea/workflows/build.yml");
    }

    #[test]
    fn test_missing_dir_is_not_found() {
        let (repo, commit) = fixture();
        let err = repo.tree_entries(&commit, ".github/workflows").unwrap_err();
        assert!(matches!(err, GitError::PathNotFound(_)));
        assert!(err.is_not_found());
    }

    #[test]
    fn test_read_blob() {
        let (repo, commit) = fixture();
        let root = repo.tree_entries(&commit, "").unwrap();
        let readme = root.iter().find(|e| e.name == "README.md").unwrap();
        assert_eq!(repo.read_blob(readme).unwrap(), b"hello");
    }

    #[test]
    fn test_refs_and_call_count() {
        let (repo, commit) = fixture();
        assert_eq!(repo.call_count(), 0);

        assert_eq!(repo.branch_commit("main").unwrap(), commit);
        let err = repo.tag_commit("v1").unwrap_err();
        assert!(matches!(
            err,
            GitError::RefNotFound {
                kind: RefKind::Tag,
                ..
            }
        ));
        assert_eq!(repo.default_branch().unwrap(), "main");
        assert_eq!(repo.call_count(), 3);
    }
}
