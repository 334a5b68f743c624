//! Dispatch error types.

use std::fmt;

use gantry_git::GitError;
use gantry_store::StoreError;
use gantry_workflow::WorkflowError;
use thiserror::Error;

/// Coarse classification callers branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed request; nothing was read or written.
    Validation,
    NotFound,
    PermissionDenied,
    /// A collaborator failed.
    Upstream,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Validation => "validation",
            Self::NotFound => "not_found",
            Self::PermissionDenied => "permission_denied",
            Self::Upstream => "upstream",
        })
    }
}

/// A translatable message: a locale key plus its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocaleMessage {
    pub key: &'static str,
    pub args: Vec<String>,
}

impl LocaleMessage {
    fn new(key: &'static str, args: impl IntoIterator<Item = String>) -> Self {
        Self {
            key,
            args: args.into_iter().collect(),
        }
    }
}

/// Errors returned by dispatch operations.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("workflow id is required")]
    MissingWorkflowId,

    #[error("ref is required")]
    MissingRef,

    #[error("workflow {0:?} is disabled")]
    WorkflowDisabled(String),

    #[error("ref {ref_name:?} doesn't exist")]
    RefNotFound {
        ref_name: String,
        #[source]
        source: GitError,
    },

    #[error("workflow {0:?} doesn't exist")]
    WorkflowNotFound(String),

    #[error("invalid input {name:?}: {reason}")]
    InvalidInput { name: String, reason: String },

    #[error("{context}: {source}")]
    Git {
        context: &'static str,
        #[source]
        source: GitError,
    },

    #[error("{context}: {source}")]
    Workflow {
        context: &'static str,
        #[source]
        source: WorkflowError,
    },

    #[error("JSONPayload: {0}")]
    Payload(#[source] serde_json::Error),

    #[error("{context}: {source}")]
    Store {
        context: &'static str,
        #[source]
        source: StoreError,
    },
}

impl DispatchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingWorkflowId | Self::MissingRef | Self::InvalidInput { .. } => {
                ErrorKind::Validation
            }
            Self::RefNotFound { .. } | Self::WorkflowNotFound(_) => ErrorKind::NotFound,
            Self::WorkflowDisabled(_) => ErrorKind::PermissionDenied,
            Self::Git { .. } | Self::Workflow { .. } | Self::Payload(_) | Self::Store { .. } => {
                ErrorKind::Upstream
            }
        }
    }

    /// The message key callers should render instead of the error text.
    ///
    /// Upstream failures carry no key.
    pub fn locale(&self) -> Option<LocaleMessage> {
        match self {
            Self::MissingWorkflowId => Some(LocaleMessage::new(
                "actions.workflow.not_found",
                [String::new()],
            )),
            Self::WorkflowNotFound(id) => {
                Some(LocaleMessage::new("actions.workflow.not_found", [id.clone()]))
            }
            Self::MissingRef => Some(LocaleMessage::new(
                "form.target_ref_not_exist",
                [String::new()],
            )),
            Self::RefNotFound { ref_name, .. } => Some(LocaleMessage::new(
                "form.target_ref_not_exist",
                [ref_name.clone()],
            )),
            Self::WorkflowDisabled(_) => {
                Some(LocaleMessage::new("actions.workflow.disabled", Vec::new()))
            }
            _ => None,
        }
    }

    pub(crate) fn git(context: &'static str) -> impl FnOnce(GitError) -> Self {
        move |source| Self::Git { context, source }
    }

    pub(crate) fn workflow(context: &'static str) -> impl FnOnce(WorkflowError) -> Self {
        move |source| Self::Workflow { context, source }
    }

    pub(crate) fn store(context: &'static str) -> impl FnOnce(StoreError) -> Self {
        move |source| Self::Store { context, source }
    }
}

/// Result type for dispatch operations.
pub type Result<T> = std::result::Result<T, DispatchError>;
