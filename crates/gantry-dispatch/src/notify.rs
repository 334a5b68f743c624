//! Outbound status notifications.
//!
//! Dispatch never waits on or retries a notification: every failure is
//! logged by the caller and dropped.

use std::fmt;

use async_trait::async_trait;
use gantry_types::{Job, Repository, Run, Status, User};
use serde::Serialize;
use thiserror::Error;

/// A notification could not be delivered.
#[derive(Debug, Error)]
#[error("notification failed: {0}")]
pub struct NotifyError(pub String);

/// Receives status changes of runs and jobs.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn workflow_run_status_update(
        &self,
        repo: &Repository,
        trigger_user: &User,
        run: &Run,
    ) -> Result<(), NotifyError>;

    async fn workflow_job_status_update(
        &self,
        repo: &Repository,
        doer: &User,
        job: &Job,
    ) -> Result<(), NotifyError>;

    /// Create or update the commit-status markers for `jobs` of `run`.
    async fn create_commit_status(
        &self,
        repo: &Repository,
        run: &Run,
        jobs: &[Job],
    ) -> Result<(), NotifyError>;
}

/// State of a commit-status marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitState {
    Pending,
    Success,
    Failure,
    Error,
    Skipped,
}

impl fmt::Display for CommitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pending => "pending",
            Self::Success => "success",
            Self::Failure => "failure",
            Self::Error => "error",
            Self::Skipped => "skipped",
        })
    }
}

/// A commit-status marker derived from one job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitStatus {
    pub sha: String,
    /// `<workflow> / <job> (<event>)`.
    pub context: String,
    pub state: CommitState,
    pub description: String,
}

impl CommitStatus {
    pub fn for_job(run: &Run, job: &Job) -> Self {
        let workflow = run
            .workflow_id
            .strip_suffix(".yml")
            .or_else(|| run.workflow_id.strip_suffix(".yaml"))
            .unwrap_or(&run.workflow_id);

        let (state, description) = match job.status {
            Status::Success => (CommitState::Success, "Successful"),
            Status::Failure => (CommitState::Failure, "Failing"),
            Status::Cancelled => (CommitState::Error, "Has been cancelled"),
            Status::Skipped => (CommitState::Skipped, "Has been skipped"),
            Status::Running => (CommitState::Pending, "Has started running"),
            Status::Blocked => (CommitState::Pending, "Blocked by required conditions"),
            Status::Waiting | Status::Unknown => (CommitState::Pending, "Waiting to run"),
        };

        Self {
            sha: job.commit_sha.clone(),
            context: format!("{workflow} / {} ({})", job.name, run.event),
            state,
            description: description.to_string(),
        }
    }
}

/// Notifier that records every notification as a `tracing` event.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn workflow_run_status_update(
        &self,
        repo: &Repository,
        trigger_user: &User,
        run: &Run,
    ) -> Result<(), NotifyError> {
        tracing::info!(
            repo = %repo.full_name(),
            run_id = run.id,
            index = run.index,
            status = %run.status,
            trigger_user = %trigger_user.login,
            "Workflow run status update"
        );
        Ok(())
    }

    async fn workflow_job_status_update(
        &self,
        repo: &Repository,
        doer: &User,
        job: &Job,
    ) -> Result<(), NotifyError> {
        tracing::info!(
            repo = %repo.full_name(),
            run_id = job.run_id,
            job_id = job.id,
            job = %job.name,
            status = %job.status,
            doer = %doer.login,
            "Workflow job status update"
        );
        Ok(())
    }

    async fn create_commit_status(
        &self,
        repo: &Repository,
        run: &Run,
        jobs: &[Job],
    ) -> Result<(), NotifyError> {
        for job in jobs {
            let status = CommitStatus::for_job(run, job);
            tracing::info!(
                repo = %repo.full_name(),
                sha = %status.sha,
                context = %status.context,
                state = %status.state,
                description = %status.description,
                "Commit status"
            );
        }
        Ok(())
    }
}
