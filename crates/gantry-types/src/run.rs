//! Persisted run and job records.

use serde::{Deserialize, Serialize};

use crate::{Status, Timestamp};

/// One dispatch of a workflow, pinned to the commit it was dispatched against.
///
/// `ref_name` and `commit_sha` are set when the run is built and never
/// change afterwards, even if the ref later moves.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Run {
    /// Store-assigned identifier, `0` until persisted.
    pub id: i64,
    pub title: String,
    pub repo_id: i64,
    pub owner_id: i64,
    pub workflow_id: String,
    /// Per-repository sequence number, assigned on insert.
    pub index: i64,
    pub trigger_user_id: i64,
    /// Fully-qualified ref, e.g. `refs/heads/main`.
    pub ref_name: String,
    pub commit_sha: String,
    pub is_fork_pull_request: bool,
    pub event: String,
    pub trigger_event: String,
    /// Serialized event payload, stored verbatim.
    pub event_payload: String,
    pub status: Status,
    pub created: Timestamp,
    pub updated: Timestamp,
    pub started: Option<Timestamp>,
    pub stopped: Option<Timestamp>,
}

impl Run {
    /// Short form of the ref (`main` for `refs/heads/main`).
    pub fn ref_short_name(&self) -> &str {
        self.ref_name
            .strip_prefix("refs/heads/")
            .or_else(|| self.ref_name.strip_prefix("refs/tags/"))
            .unwrap_or(&self.ref_name)
    }
}

/// One node of a run's job graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Job {
    /// Store-assigned identifier, `0` until persisted.
    pub id: i64,
    pub run_id: i64,
    pub repo_id: i64,
    pub owner_id: i64,
    pub commit_sha: String,
    pub is_fork_pull_request: bool,
    /// Display name (the job's `name:`, or its id, plus any matrix suffix).
    pub name: String,
    pub attempt: i64,
    /// Single-job workflow document handed to runners.
    pub workflow_payload: String,
    /// Job key in the workflow's `jobs:` mapping.
    pub job_id: String,
    pub needs: Vec<String>,
    pub runs_on: Vec<String>,
    pub status: Status,
    pub created: Timestamp,
    pub updated: Timestamp,
    pub started: Option<Timestamp>,
    pub stopped: Option<Timestamp>,
}
