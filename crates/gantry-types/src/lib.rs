//! Shared types for the gantry workflow-dispatch system.
//!
//! These are the records every other crate agrees on: persisted runs and
//! jobs, the repository/user identities that trigger them, and the event
//! payload stored verbatim on each run.

pub mod payload;
pub mod repo;
pub mod run;
pub mod status;

pub use payload::{EVENT_WORKFLOW_DISPATCH, WorkflowDispatchPayload};
pub use repo::{AccessMode, ApiRepository, ApiUser, Permission, Repository, User};
pub use run::{Job, Run};
pub use status::{ParseStatusError, Status};

/// Timestamp type used on persisted records.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Current UTC time.
pub fn now() -> Timestamp {
    chrono::Utc::now()
}
