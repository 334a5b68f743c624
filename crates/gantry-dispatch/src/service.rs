//! The dispatch orchestrator.

use std::fmt;
use std::sync::Arc;

use gantry_config::{DEFAULT_SERVER_URL, DEFAULT_WORKFLOW_DIRS, GantryConfig};
use gantry_git::{Commit, GitRepository, TreeEntry};
use gantry_store::RunStorage;
use gantry_types::{Job, Repository, Run, User};
use gantry_workflow::{
    GitContext, WorkflowDocument, content_from_entry, find_workflow, list_workflows, parse,
};
use serde::Serialize;
use serde_json::Map;

use crate::builder::{event_payload, expand_jobs, new_run, run_title};
use crate::error::{DispatchError, Result};
use crate::inputs::InputProcessor;
use crate::notify::Notifier;
use crate::resolver::resolve_ref;
use crate::supersede::{Supersession, cancel_previous_runs};

/// Settings for [`DispatchService`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchConfig {
    /// Workflow directories, first existing one wins.
    pub workflow_dirs: Vec<String>,
    /// Base URL exposed to workflow expressions.
    pub server_url: String,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            workflow_dirs: DEFAULT_WORKFLOW_DIRS.iter().map(|d| d.to_string()).collect(),
            server_url: DEFAULT_SERVER_URL.to_string(),
        }
    }
}

impl From<&GantryConfig> for DispatchConfig {
    fn from(config: &GantryConfig) -> Self {
        Self {
            workflow_dirs: config.workflow_dirs(),
            server_url: config.server_url(),
        }
    }
}

/// Stages of one dispatch attempt, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchStage {
    Validating,
    Resolving,
    Loading,
    Parsing,
    BuildingInputs,
    Persisting,
    Superseding,
    Notifying,
    Done,
}

impl fmt::Display for DispatchStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Validating => "validating",
            Self::Resolving => "resolving",
            Self::Loading => "loading",
            Self::Parsing => "parsing",
            Self::BuildingInputs => "building_inputs",
            Self::Persisting => "persisting",
            Self::Superseding => "superseding",
            Self::Notifying => "notifying",
            Self::Done => "done",
        })
    }
}

/// A request to dispatch one workflow at one ref.
pub struct DispatchRequest<'a> {
    pub doer: &'a User,
    pub repo: &'a Repository,
    pub git: &'a dyn GitRepository,
    /// Workflow file name, e.g. `build.yml`.
    pub workflow_id: &'a str,
    /// Tag, branch or bare branch name.
    pub ref_name: &'a str,
    pub inputs: &'a dyn InputProcessor,
}

/// Result of a successful dispatch.
#[derive(Debug, Clone)]
pub struct DispatchOutcome {
    pub run: Run,
    pub jobs: Vec<Job>,
    pub superseded: Supersession,
}

/// A workflow file found at a repository's default branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkflowSummary {
    /// File name, used as the workflow id.
    pub id: String,
    pub path: String,
    /// The document's `name:`, when it parses.
    pub name: Option<String>,
    /// Declares a `workflow_dispatch` trigger.
    pub dispatchable: bool,
    pub disabled: bool,
}

/// Dispatch orchestration over injected storage and notification.
#[derive(Clone)]
pub struct DispatchService {
    store: Arc<dyn RunStorage>,
    notifier: Arc<dyn Notifier>,
    config: DispatchConfig,
}

impl DispatchService {
    pub fn new(
        store: Arc<dyn RunStorage>,
        notifier: Arc<dyn Notifier>,
        config: DispatchConfig,
    ) -> Self {
        Self {
            store,
            notifier,
            config,
        }
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn RunStorage> {
        &self.store
    }

    /// Dispatch a workflow.
    ///
    /// Everything up to and including persistence either succeeds or leaves
    /// no trace. Once the run is committed the dispatch has succeeded:
    /// superseding older runs and notifying are best-effort and only logged.
    pub async fn dispatch(&self, req: DispatchRequest<'_>) -> Result<DispatchOutcome> {
        let DispatchRequest {
            doer,
            repo,
            git,
            workflow_id,
            ref_name,
            inputs,
        } = req;

        stage(DispatchStage::Validating, workflow_id, ref_name);
        if workflow_id.is_empty() {
            return Err(DispatchError::MissingWorkflowId);
        }
        if ref_name.is_empty() {
            return Err(DispatchError::MissingRef);
        }

        let actions = self
            .store
            .actions_config(repo.id)
            .map_err(DispatchError::store("load actions config"))?;
        if actions.is_workflow_disabled(workflow_id) {
            return Err(DispatchError::WorkflowDisabled(workflow_id.to_string()));
        }

        stage(DispatchStage::Resolving, workflow_id, ref_name);
        let resolved = resolve_ref(git, ref_name)?;

        stage(DispatchStage::Loading, workflow_id, ref_name);
        let entry = self.find_entry(git, &resolved.commit, workflow_id)?;
        let content = content_from_entry(git, &entry)
            .map_err(DispatchError::workflow("read workflow"))?;

        stage(DispatchStage::Parsing, workflow_id, ref_name);
        let mut run = new_run(doer, repo, workflow_id, &resolved);
        let ctx = GitContext::for_run(&run, repo, &doer.login, &self.config.server_url);
        let workflows =
            parse(&content, &ctx).map_err(DispatchError::workflow("parse workflow"))?;
        let Some(first) = workflows.first() else {
            return Err(DispatchError::WorkflowNotFound(workflow_id.to_string()));
        };
        if !first.run_name.is_empty() {
            run.title = run_title(&first.run_name);
        }

        stage(DispatchStage::BuildingInputs, workflow_id, ref_name);
        let mut values = Map::new();
        let schema = first
            .triggers()
            .and_then(|t| t.workflow_dispatch_config())
            .map_err(DispatchError::workflow("decode triggers"))?;
        if let Some(schema) = schema {
            inputs.process(&schema, &mut values)?;
        }
        run.event_payload = event_payload(workflow_id, ref_name, repo, doer, values)?;
        let jobs = expand_jobs(&workflows)?;

        stage(DispatchStage::Persisting, workflow_id, ref_name);
        let (run, inserted) = self
            .store
            .insert_run(run, jobs)
            .map_err(DispatchError::store("InsertRun"))?;
        tracing::info!(
            run_id = run.id,
            index = run.index,
            repo = %repo.full_name(),
            workflow = workflow_id,
            git_ref = %run.ref_name,
            commit = %run.commit_sha,
            jobs = inserted.len(),
            "Created workflow run"
        );

        stage(DispatchStage::Superseding, workflow_id, ref_name);
        let superseded = match cancel_previous_runs(self.store.as_ref(), &run) {
            Ok(ids) => Supersession::Cancelled(ids),
            Err(e) => {
                tracing::error!(run_id = run.id, error = %e, "CancelPreviousRuns failed");
                Supersession::Failed(e.to_string())
            }
        };

        stage(DispatchStage::Notifying, workflow_id, ref_name);
        let jobs = match self.store.find_jobs(run.id) {
            Ok(jobs) => jobs,
            Err(e) => {
                tracing::error!(run_id = run.id, error = %e, "FindRunJobs failed");
                Vec::new()
            }
        };
        self.notify(repo, doer, &run, &jobs).await;

        stage(DispatchStage::Done, workflow_id, ref_name);
        Ok(DispatchOutcome {
            run,
            jobs: if jobs.is_empty() { inserted } else { jobs },
            superseded,
        })
    }

    async fn notify(&self, repo: &Repository, doer: &User, run: &Run, jobs: &[Job]) {
        if let Err(e) = self.notifier.create_commit_status(repo, run, jobs).await {
            tracing::error!(run_id = run.id, error = %e, "CreateCommitStatus failed");
        }

        if let Some(job) = jobs.first() {
            match self.store.load_run_for_job(job) {
                Ok(loaded) => {
                    if let Err(e) = self
                        .notifier
                        .workflow_run_status_update(repo, doer, &loaded)
                        .await
                    {
                        tracing::error!(run_id = loaded.id, error = %e, "WorkflowRunStatusUpdate failed");
                    }
                }
                Err(e) => tracing::error!(job_id = job.id, error = %e, "LoadRun failed"),
            }
        }

        for job in jobs {
            if let Err(e) = self
                .notifier
                .workflow_job_status_update(repo, doer, job)
                .await
            {
                tracing::error!(job_id = job.id, error = %e, "WorkflowJobStatusUpdate failed");
            }
        }
    }

    fn find_entry(
        &self,
        git: &dyn GitRepository,
        commit: &Commit,
        workflow_id: &str,
    ) -> Result<TreeEntry> {
        let (_, entries) = list_workflows(git, commit, &self.config.workflow_dirs)
            .map_err(DispatchError::workflow("list workflows"))?;
        find_workflow(&entries, workflow_id)
            .cloned()
            .ok_or_else(|| DispatchError::WorkflowNotFound(workflow_id.to_string()))
    }

    /// Commit at the repository's default branch.
    fn default_commit(&self, repo: &Repository, git: &dyn GitRepository) -> Result<Commit> {
        let branch = if repo.default_branch.is_empty() {
            git.default_branch()
                .map_err(DispatchError::git("read default branch"))?
        } else {
            repo.default_branch.clone()
        };
        git.branch_commit(&branch)
            .map_err(|source| DispatchError::RefNotFound {
                ref_name: branch,
                source,
            })
    }

    /// Enable or disable dispatching of a workflow.
    ///
    /// The workflow must exist at the default branch.
    pub fn set_workflow_enabled(
        &self,
        repo: &Repository,
        git: &dyn GitRepository,
        workflow_id: &str,
        enabled: bool,
    ) -> Result<()> {
        if workflow_id.is_empty() {
            return Err(DispatchError::MissingWorkflowId);
        }
        let commit = self.default_commit(repo, git)?;
        self.find_entry(git, &commit, workflow_id)?;

        let mut config = self
            .store
            .actions_config(repo.id)
            .map_err(DispatchError::store("load actions config"))?;
        if enabled {
            config.enable_workflow(workflow_id);
        } else {
            config.disable_workflow(workflow_id);
        }
        self.store
            .set_actions_config(repo.id, &config)
            .map_err(DispatchError::store("save actions config"))?;

        tracing::info!(
            repo = %repo.full_name(),
            workflow = workflow_id,
            enabled,
            "Updated workflow state"
        );
        Ok(())
    }

    /// Workflows at the default branch with their enabled state.
    pub fn list_workflows(
        &self,
        repo: &Repository,
        git: &dyn GitRepository,
    ) -> Result<Vec<WorkflowSummary>> {
        let commit = self.default_commit(repo, git)?;
        let (_, entries) = list_workflows(git, &commit, &self.config.workflow_dirs)
            .map_err(DispatchError::workflow("list workflows"))?;
        let actions = self
            .store
            .actions_config(repo.id)
            .map_err(DispatchError::store("load actions config"))?;

        let mut summaries = Vec::with_capacity(entries.len());
        for entry in entries {
            let (name, dispatchable) = match describe(git, &entry) {
                Ok(described) => described,
                Err(e) => {
                    tracing::warn!(path = %entry.path, error = %e, "Unreadable workflow");
                    (None, false)
                }
            };
            summaries.push(WorkflowSummary {
                disabled: actions.is_workflow_disabled(&entry.name),
                id: entry.name,
                path: entry.path,
                name,
                dispatchable,
            });
        }
        Ok(summaries)
    }

    /// Most recent runs of a repository.
    pub fn list_runs(&self, repo: &Repository, limit: usize) -> Result<Vec<Run>> {
        self.store
            .list_runs(repo.id, limit)
            .map_err(DispatchError::store("list runs"))
    }

    /// Jobs of a run.
    pub fn run_jobs(&self, run_id: i64) -> Result<Vec<Job>> {
        self.store
            .find_jobs(run_id)
            .map_err(DispatchError::store("find jobs"))
    }
}

fn describe(
    git: &dyn GitRepository,
    entry: &TreeEntry,
) -> gantry_workflow::Result<(Option<String>, bool)> {
    let content = content_from_entry(git, entry)?;
    let doc = WorkflowDocument::from_slice(&content)?;
    let dispatchable = gantry_workflow::Triggers::decode(&doc.on)?
        .workflow_dispatch_config()?
        .is_some();
    Ok((doc.name, dispatchable))
}

fn stage(stage: DispatchStage, workflow_id: &str, ref_name: &str) {
    tracing::debug!(%stage, workflow = workflow_id, git_ref = ref_name, "Dispatch stage");
}
