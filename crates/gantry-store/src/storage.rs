//! Storage abstraction for runs and jobs.

use gantry_types::{Job, Run, Status};

use crate::{ActionsConfig, Result};

/// Selects runs sharing a workflow identity.
///
/// `None` fields match anything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunFilter {
    pub repo_id: i64,
    pub ref_name: Option<String>,
    pub workflow_id: Option<String>,
    pub event: Option<String>,
}

impl RunFilter {
    /// Runs of the same repository, ref, workflow and event as `run`.
    pub fn same_workflow(run: &Run) -> Self {
        Self {
            repo_id: run.repo_id,
            ref_name: Some(run.ref_name.clone()),
            workflow_id: Some(run.workflow_id.clone()),
            event: Some(run.event.clone()),
        }
    }

    pub fn matches(&self, run: &Run) -> bool {
        run.repo_id == self.repo_id
            && self.ref_name.as_ref().is_none_or(|r| *r == run.ref_name)
            && self.workflow_id.as_ref().is_none_or(|w| *w == run.workflow_id)
            && self.event.as_ref().is_none_or(|e| *e == run.event)
    }
}

/// Status a freshly inserted job starts in.
///
/// Jobs waiting on other jobs are blocked until those finish.
pub fn initial_job_status(job: &Job) -> Status {
    if job.needs.is_empty() {
        Status::Waiting
    } else {
        Status::Blocked
    }
}

/// Persistence operations used by dispatch.
///
/// All calls are blocking.
pub trait RunStorage: Send + Sync {
    // ── Runs ────────────────────────────────────────────────────────────

    /// Insert a run and its jobs atomically.
    ///
    /// Assigns the run id, the next per-repository run index, job ids, and
    /// each job's initial status. Either everything is written or nothing.
    fn insert_run(&self, run: Run, jobs: Vec<Job>) -> Result<(Run, Vec<Job>)>;

    fn get_run(&self, id: i64) -> Result<Run>;

    /// Most recent runs of a repository first.
    fn list_runs(&self, repo_id: i64, limit: usize) -> Result<Vec<Run>>;

    /// Runs matching `filter` whose status is not terminal, oldest first.
    fn find_active_runs(&self, filter: &RunFilter) -> Result<Vec<Run>>;

    /// Mark a run and its unfinished jobs cancelled.
    ///
    /// Returns `false` when the run had already finished.
    fn cancel_run(&self, run_id: i64) -> Result<bool>;

    // ── Jobs ────────────────────────────────────────────────────────────

    /// Jobs of a run in insertion order.
    fn find_jobs(&self, run_id: i64) -> Result<Vec<Job>>;

    /// The run a job belongs to.
    fn load_run_for_job(&self, job: &Job) -> Result<Run> {
        self.get_run(job.run_id)
    }

    // ── Actions settings ────────────────────────────────────────────────

    /// Settings of a repository; defaults when never saved.
    fn actions_config(&self, repo_id: i64) -> Result<ActionsConfig>;

    fn set_actions_config(&self, repo_id: i64, config: &ActionsConfig) -> Result<()>;
}
