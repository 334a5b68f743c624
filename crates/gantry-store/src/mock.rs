//! In-memory [`RunStorage`] for tests.

use std::collections::HashMap;

use gantry_types::{Job, Run, Status, now};
use parking_lot::Mutex;

use crate::storage::{RunFilter, RunStorage, initial_job_status};
use crate::{ActionsConfig, Result, StoreError};

#[derive(Debug, Default)]
struct State {
    runs: Vec<Run>,
    jobs: Vec<Job>,
    configs: HashMap<i64, ActionsConfig>,
    next_run_id: i64,
    next_job_id: i64,
}

/// Mock implementation of [`RunStorage`].
#[derive(Debug, Default)]
pub struct MockRunStorage {
    state: Mutex<State>,
}

impl MockRunStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every stored run, in insertion order.
    pub fn runs(&self) -> Vec<Run> {
        self.state.lock().runs.clone()
    }
}

impl RunStorage for MockRunStorage {
    fn insert_run(&self, mut run: Run, mut jobs: Vec<Job>) -> Result<(Run, Vec<Job>)> {
        let mut state = self.state.lock();
        let now = now();

        state.next_run_id += 1;
        run.id = state.next_run_id;
        run.index = state
            .runs
            .iter()
            .filter(|r| r.repo_id == run.repo_id)
            .map(|r| r.index)
            .max()
            .unwrap_or(0)
            + 1;
        run.created = now;
        run.updated = now;

        for job in &mut jobs {
            state.next_job_id += 1;
            job.id = state.next_job_id;
            job.run_id = run.id;
            job.repo_id = run.repo_id;
            job.owner_id = run.owner_id;
            job.commit_sha = run.commit_sha.clone();
            job.is_fork_pull_request = run.is_fork_pull_request;
            job.status = initial_job_status(job);
            job.created = now;
            job.updated = now;
        }

        state.runs.push(run.clone());
        state.jobs.extend(jobs.iter().cloned());
        Ok((run, jobs))
    }

    fn get_run(&self, id: i64) -> Result<Run> {
        self.state
            .lock()
            .runs
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or_else(|| StoreError::run_not_found(id))
    }

    fn list_runs(&self, repo_id: i64, limit: usize) -> Result<Vec<Run>> {
        Ok(self
            .state
            .lock()
            .runs
            .iter()
            .rev()
            .filter(|r| r.repo_id == repo_id)
            .take(limit)
            .cloned()
            .collect())
    }

    fn find_active_runs(&self, filter: &RunFilter) -> Result<Vec<Run>> {
        Ok(self
            .state
            .lock()
            .runs
            .iter()
            .filter(|r| r.status.is_active() && filter.matches(r))
            .cloned()
            .collect())
    }

    fn cancel_run(&self, run_id: i64) -> Result<bool> {
        let mut state = self.state.lock();
        let stopped = now();

        let run = state
            .runs
            .iter_mut()
            .find(|r| r.id == run_id)
            .ok_or_else(|| StoreError::run_not_found(run_id))?;
        if !run.status.is_active() {
            return Ok(false);
        }
        run.status = Status::Cancelled;
        run.stopped = Some(stopped);
        run.updated = stopped;

        for job in state
            .jobs
            .iter_mut()
            .filter(|j| j.run_id == run_id && j.status.is_active())
        {
            job.status = Status::Cancelled;
            job.stopped = Some(stopped);
            job.updated = stopped;
        }
        Ok(true)
    }

    fn find_jobs(&self, run_id: i64) -> Result<Vec<Job>> {
        Ok(self
            .state
            .lock()
            .jobs
            .iter()
            .filter(|j| j.run_id == run_id)
            .cloned()
            .collect())
    }

    fn actions_config(&self, repo_id: i64) -> Result<ActionsConfig> {
        Ok(self
            .state
            .lock()
            .configs
            .get(&repo_id)
            .cloned()
            .unwrap_or_default())
    }

    fn set_actions_config(&self, repo_id: i64, config: &ActionsConfig) -> Result<()> {
        self.state.lock().configs.insert(repo_id, config.clone());
        Ok(())
    }
}
