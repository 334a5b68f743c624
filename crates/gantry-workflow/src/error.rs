//! Error types for workflow parsing.

use thiserror::Error;

/// Result type for workflow operations.
pub type Result<T> = std::result::Result<T, WorkflowError>;

/// Errors that can occur while loading or parsing a workflow.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// The document is not valid YAML or does not match the workflow shape.
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Structurally valid YAML that is not a valid workflow.
    #[error("Invalid workflow: {0}")]
    Invalid(String),

    /// A `${{ }}` expression could not be evaluated.
    #[error("Expression error: {0}")]
    Expression(String),

    /// A job's `strategy.matrix` could not be expanded.
    #[error("Invalid matrix in job '{job}': {reason}")]
    Matrix { job: String, reason: String },

    /// Reading the repository failed.
    #[error("Repository error: {0}")]
    Git(#[from] gantry_git::GitError),
}
