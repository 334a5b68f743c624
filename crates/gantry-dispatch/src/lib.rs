//! Workflow dispatch for gantry.
//!
//! [`DispatchService`] turns "run workflow X at ref Y" into a persisted run:
//!
//! ```text
//! validate → disabled? → resolve ref → find workflow → parse → inputs
//!          → persist run + jobs (atomic)
//!          → cancel superseded runs (best-effort)
//!          → notify (best-effort)
//! ```
//!
//! Storage ([`RunStorage`](gantry_store::RunStorage)), git access
//! ([`GitRepository`](gantry_git::GitRepository)), input processing
//! ([`InputProcessor`]) and notification ([`Notifier`]) are injected so the
//! orchestrator can run against in-memory fakes.

pub mod builder;
pub mod convert;
pub mod error;
pub mod inputs;
pub mod notify;
pub mod resolver;
pub mod service;
pub mod supersede;

pub use convert::{to_api_repo, to_api_user};
pub use error::{DispatchError, ErrorKind, LocaleMessage, Result};
pub use inputs::{InputProcessor, SuppliedInputs};
pub use notify::{CommitState, CommitStatus, LogNotifier, Notifier, NotifyError};
pub use resolver::{ResolvedRef, resolve_ref};
pub use service::{
    DispatchConfig, DispatchOutcome, DispatchRequest, DispatchService, DispatchStage,
    WorkflowSummary,
};
pub use supersede::{Supersession, cancel_previous_runs};
