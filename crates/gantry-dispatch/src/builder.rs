//! Run and job construction.

use gantry_types::{
    AccessMode, EVENT_WORKFLOW_DISPATCH, Job, Repository, Run, Status, User,
    WorkflowDispatchPayload,
};
use gantry_workflow::SingleWorkflow;
use serde_json::{Map, Value};

use crate::convert::{to_api_repo, to_api_user};
use crate::error::{DispatchError, Result};
use crate::resolver::ResolvedRef;

/// Longest run title or job name stored; longer ones are cut with an
/// ellipsis.
const MAX_NAME_CHARS: usize = 255;

/// A new, unpersisted run for a manual dispatch.
///
/// The title defaults to the first line of the commit message. The event
/// payload is filled in once inputs are known.
pub fn new_run(doer: &User, repo: &Repository, workflow_id: &str, resolved: &ResolvedRef) -> Run {
    Run {
        title: run_title(resolved.commit.summary()),
        repo_id: repo.id,
        owner_id: repo.owner_id,
        workflow_id: workflow_id.to_string(),
        trigger_user_id: doer.id,
        ref_name: resolved.full_name(),
        commit_sha: resolved.commit.id.clone(),
        is_fork_pull_request: false,
        event: EVENT_WORKFLOW_DISPATCH.to_string(),
        trigger_event: EVENT_WORKFLOW_DISPATCH.to_string(),
        status: Status::Waiting,
        ..Default::default()
    }
}

/// Title text as stored on a run.
pub fn run_title(text: &str) -> String {
    ellipsis(text, MAX_NAME_CHARS)
}

/// Serialized event payload for a dispatch.
///
/// `raw_ref` is the ref as the caller supplied it. Repository and sender
/// are embedded as permission-stripped snapshots.
pub fn event_payload(
    workflow_id: &str,
    raw_ref: &str,
    repo: &Repository,
    doer: &User,
    inputs: Map<String, Value>,
) -> Result<String> {
    WorkflowDispatchPayload {
        workflow: workflow_id.to_string(),
        git_ref: raw_ref.to_string(),
        inputs,
        repository: to_api_repo(repo, AccessMode::None),
        sender: to_api_user(doer, AccessMode::None),
    }
    .json_payload()
    .map_err(DispatchError::Payload)
}

/// One unpersisted job per parsed single-job workflow, in order.
pub fn expand_jobs(workflows: &[SingleWorkflow]) -> Result<Vec<Job>> {
    workflows
        .iter()
        .map(|workflow| {
            let payload = workflow
                .to_yaml()
                .map_err(DispatchError::workflow("marshal job workflow"))?;
            Ok(Job {
                name: ellipsis(workflow.job_name(), MAX_NAME_CHARS),
                job_id: workflow.job_id.clone(),
                workflow_payload: payload,
                needs: workflow.needs().to_vec(),
                runs_on: workflow.runs_on(),
                ..Default::default()
            })
        })
        .collect()
}

fn ellipsis(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let mut cut: String = s.chars().take(max_chars - 1).collect();
    cut.push('…');
    cut
}
