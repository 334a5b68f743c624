//! The repository collaborator trait.

use crate::Result;

/// An immutable commit handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    /// Full hex object id.
    pub id: String,
    /// Full commit message.
    pub message: String,
}

impl Commit {
    /// First line of the commit message.
    pub fn summary(&self) -> &str {
        self.message.split('\n').next().unwrap_or_default()
    }
}

/// Kind of object a tree entry points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Blob,
    Tree,
    Other,
}

/// One entry of a directory listing at a commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    /// File name within its directory.
    pub name: String,
    /// Path from the repository root.
    pub path: String,
    /// Backend-specific object id used by [`GitRepository::read_blob`].
    pub id: String,
    pub kind: EntryKind,
}

impl TreeEntry {
    pub fn is_blob(&self) -> bool {
        self.kind == EntryKind::Blob
    }
}

/// Read access to a version-controlled repository.
///
/// All calls are blocking.
pub trait GitRepository: Send + Sync {
    /// Commit a tag points at (annotated tags are peeled).
    fn tag_commit(&self, name: &str) -> Result<Commit>;

    /// Tip commit of a local branch.
    fn branch_commit(&self, name: &str) -> Result<Commit>;

    /// Short name of the branch HEAD points at.
    fn default_branch(&self) -> Result<String>;

    /// Entries directly inside `dir` at `commit`. An empty `dir` lists the root.
    fn tree_entries(&self, commit: &Commit, dir: &str) -> Result<Vec<TreeEntry>>;

    /// Raw content of a blob entry.
    fn read_blob(&self, entry: &TreeEntry) -> Result<Vec<u8>>;
}
