//! Error types for git access.

use thiserror::Error;

use crate::RefKind;

/// Result type for git operations.
pub type Result<T> = std::result::Result<T, GitError>;

/// Errors that can occur while reading a repository.
#[derive(Debug, Error)]
pub enum GitError {
    /// A tag or branch does not exist.
    #[error("{kind} '{name}' not found")]
    RefNotFound { kind: RefKind, name: String },

    /// A path does not exist in the commit's tree.
    #[error("path '{0}' not found")]
    PathNotFound(String),

    /// A blob or commit id does not resolve to an object.
    #[error("object '{0}' not found")]
    ObjectNotFound(String),

    /// Failed to open the repository.
    #[error("failed to open repository {path}: {source}")]
    Open {
        path: String,
        source: git2::Error,
    },

    /// libgit2 error.
    #[error("git error: {0}")]
    Backend(#[from] git2::Error),
}

impl GitError {
    /// Whether this error means "the thing asked for does not exist".
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::RefNotFound { .. } | Self::PathNotFound(_) | Self::ObjectNotFound(_) => true,
            Self::Backend(e) => e.code() == git2::ErrorCode::NotFound,
            Self::Open { .. } => false,
        }
    }
}
