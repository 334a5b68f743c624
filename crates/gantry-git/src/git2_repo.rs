//! libgit2-backed repository access.

use std::path::{Path, PathBuf};

use git2::{BranchType, ErrorCode, ObjectType, Oid, Repository};
use parking_lot::Mutex;
use tracing::debug;

use crate::{Commit, EntryKind, GitError, GitRepository, RefKind, Result, TreeEntry};

/// A repository on disk, opened through libgit2.
///
/// `git2::Repository` is not `Sync`, so access is serialized.
pub struct Git2Repository {
    repo: Mutex<Repository>,
    path: PathBuf,
}

impl Git2Repository {
    /// Open an existing repository (bare or with a work tree).
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let repo = Repository::open(path).map_err(|source| GitError::Open {
            path: path.display().to_string(),
            source,
        })?;
        debug!(path = %path.display(), "Opened git repository");
        Ok(Self {
            repo: Mutex::new(repo),
            path: path.to_path_buf(),
        })
    }

    /// Path the repository was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn to_commit(commit: &git2::Commit<'_>) -> Commit {
    Commit {
        id: commit.id().to_string(),
        message: String::from_utf8_lossy(commit.message_bytes()).into_owned(),
    }
}

fn ref_not_found(kind: RefKind, name: &str) -> impl FnOnce(git2::Error) -> GitError + '_ {
    move |e| {
        if e.code() == ErrorCode::NotFound || e.code() == ErrorCode::InvalidSpec {
            GitError::RefNotFound {
                kind,
                name: name.to_string(),
            }
        } else {
            GitError::Backend(e)
        }
    }
}

impl GitRepository for Git2Repository {
    fn tag_commit(&self, name: &str) -> Result<Commit> {
        let repo = self.repo.lock();
        let reference = repo
            .find_reference(&format!("refs/tags/{name}"))
            .map_err(ref_not_found(RefKind::Tag, name))?;
        let commit = reference.peel_to_commit()?;
        Ok(to_commit(&commit))
    }

    fn branch_commit(&self, name: &str) -> Result<Commit> {
        let repo = self.repo.lock();
        let branch = repo
            .find_branch(name, BranchType::Local)
            .map_err(ref_not_found(RefKind::Branch, name))?;
        let commit = branch.get().peel_to_commit()?;
        Ok(to_commit(&commit))
    }

    fn default_branch(&self) -> Result<String> {
        let repo = self.repo.lock();
        let head = repo.find_reference("HEAD")?;
        match head.symbolic_target() {
            Some(target) => Ok(target
                .strip_prefix("refs/heads/")
                .unwrap_or(target)
                .to_string()),
            // Detached HEAD has no default branch.
            None => Err(GitError::RefNotFound {
                kind: RefKind::Branch,
                name: "HEAD".to_string(),
            }),
        }
    }

    fn tree_entries(&self, commit: &Commit, dir: &str) -> Result<Vec<TreeEntry>> {
        let repo = self.repo.lock();
        let oid = Oid::from_str(&commit.id)
            .map_err(|_| GitError::ObjectNotFound(commit.id.clone()))?;
        let root = repo
            .find_commit(oid)
            .map_err(|_| GitError::ObjectNotFound(commit.id.clone()))?
            .tree()?;

        let dir = dir.trim_matches('/');
        let tree = if dir.is_empty() {
            root
        } else {
            let entry = root.get_path(Path::new(dir)).map_err(|e| {
                if e.code() == ErrorCode::NotFound {
                    GitError::PathNotFound(dir.to_string())
                } else {
                    GitError::Backend(e)
                }
            })?;
            if entry.kind() != Some(ObjectType::Tree) {
                return Err(GitError::PathNotFound(dir.to_string()));
            }
            repo.find_tree(entry.id())?
        };

        Ok(tree
            .iter()
            .map(|entry| {
                let name = String::from_utf8_lossy(entry.name_bytes()).into_owned();
                let path = if dir.is_empty() {
                    name.clone()
                } else {
                    format!("{dir}/{name}")
                };
                let kind = match entry.kind() {
                    Some(ObjectType::Blob) => EntryKind::Blob,
                    Some(ObjectType::Tree) => EntryKind::Tree,
                    _ => EntryKind::Other,
                };
                TreeEntry {
                    name,
                    path,
                    id: entry.id().to_string(),
                    kind,
                }
            })
            .collect())
    }

    fn read_blob(&self, entry: &TreeEntry) -> Result<Vec<u8>> {
        let repo = self.repo.lock();
        let oid =
            Oid::from_str(&entry.id).map_err(|_| GitError::ObjectNotFound(entry.id.clone()))?;
        let blob = repo
            .find_blob(oid)
            .map_err(|_| GitError::ObjectNotFound(entry.id.clone()))?;
        Ok(blob.content().to_vec())
    }
}
