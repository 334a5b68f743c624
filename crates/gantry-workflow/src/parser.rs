//! Job-graph parsing.
//!
//! [`parse`] is a pure transformation from workflow bytes plus a
//! [`GitContext`] to one [`SingleWorkflow`] per job, in declaration order,
//! with matrix jobs expanded in place.

use std::collections::{HashMap, HashSet};

use serde_yaml::{Mapping, Value};

use crate::context::GitContext;
use crate::error::{Result, WorkflowError};
use crate::expression::render_template;
use crate::matrix;
use crate::model::{Job, WorkflowDocument};
use crate::triggers::Triggers;

/// A workflow narrowed down to a single job.
#[derive(Debug, Clone, PartialEq)]
pub struct SingleWorkflow {
    /// The workflow's `name:`.
    pub name: String,
    /// `run-name:` rendered against the git context; empty when undeclared.
    pub run_name: String,
    pub raw_on: Value,
    pub env: Mapping,
    /// Top-level keys other than the ones above (`defaults`, `concurrency`...).
    pub extra: Mapping,
    pub job_id: String,
    /// The job, with its `name` always set.
    pub job: Job,
}

impl SingleWorkflow {
    pub fn job_name(&self) -> &str {
        self.job.name.as_deref().unwrap_or(&self.job_id)
    }

    pub fn needs(&self) -> &[String] {
        &self.job.needs
    }

    pub fn runs_on(&self) -> Vec<String> {
        self.job.runs_on_labels()
    }

    pub fn triggers(&self) -> Result<Triggers> {
        Triggers::decode(&self.raw_on)
    }

    /// The single-job workflow document stored on a persisted job.
    pub fn to_yaml(&self) -> Result<String> {
        let mut jobs = Mapping::new();
        jobs.insert(
            Value::String(self.job_id.clone()),
            serde_yaml::to_value(&self.job)?,
        );
        let doc = WorkflowDocument {
            name: (!self.name.is_empty()).then(|| self.name.clone()),
            run_name: (!self.run_name.is_empty()).then(|| self.run_name.clone()),
            on: self.raw_on.clone(),
            env: self.env.clone(),
            jobs,
            extra: self.extra.clone(),
        };
        Ok(serde_yaml::to_string(&doc)?)
    }
}

/// Parse workflow content into its single-job workflows.
///
/// A document without jobs yields an empty list.
pub fn parse(content: &[u8], ctx: &GitContext) -> Result<Vec<SingleWorkflow>> {
    let doc = WorkflowDocument::from_slice(content)?;
    let jobs = doc.jobs()?;
    validate_needs(&jobs)?;

    let data = ctx.expression_data();
    let run_name = match doc.run_name.as_deref() {
        Some(template) => render_template(template, &data).trim().to_string(),
        None => String::new(),
    };
    let name = doc.name.clone().unwrap_or_default();

    let mut workflows = Vec::with_capacity(jobs.len());
    for (job_id, job) in &jobs {
        for mut expanded in matrix::expand(job_id, job, &data)? {
            if expanded.name.is_none() {
                expanded.name = Some(job_id.clone());
            }
            workflows.push(SingleWorkflow {
                name: name.clone(),
                run_name: run_name.clone(),
                raw_on: doc.on.clone(),
                env: doc.env.clone(),
                extra: doc.extra.clone(),
                job_id: job_id.clone(),
                job: expanded,
            });
        }
    }

    tracing::debug!(
        workflow = %name,
        jobs = jobs.len(),
        expanded = workflows.len(),
        "Parsed workflow"
    );
    Ok(workflows)
}

/// Every `needs` entry must name a job, and the graph must be acyclic.
fn validate_needs(jobs: &[(String, Job)]) -> Result<()> {
    let ids: HashSet<&str> = jobs.iter().map(|(id, _)| id.as_str()).collect();
    for (id, job) in jobs {
        for need in &job.needs {
            if !ids.contains(need.as_str()) {
                return Err(WorkflowError::Invalid(format!(
                    "Job '{id}' needs unknown job '{need}'"
                )));
            }
        }
    }
    detect_cycles(jobs)
}

/// Kahn's algorithm over the `needs` edges.
fn detect_cycles(jobs: &[(String, Job)]) -> Result<()> {
    let id_to_idx: HashMap<&str, usize> = jobs
        .iter()
        .enumerate()
        .map(|(i, (id, _))| (id.as_str(), i))
        .collect();

    let n = jobs.len();
    let mut in_degree = vec![0usize; n];
    let mut adj: Vec<Vec<usize>> = vec![vec![]; n];

    for (idx, (_, job)) in jobs.iter().enumerate() {
        for need in &job.needs {
            let need_idx = id_to_idx[need.as_str()];
            adj[need_idx].push(idx);
            in_degree[idx] += 1;
        }
    }

    let mut queue: Vec<usize> = (0..n).filter(|&i| in_degree[i] == 0).collect();
    let mut visited = 0;

    while let Some(node) = queue.pop() {
        visited += 1;
        for &neighbor in &adj[node] {
            in_degree[neighbor] -= 1;
            if in_degree[neighbor] == 0 {
                queue.push(neighbor);
            }
        }
    }

    if visited != n {
        return Err(WorkflowError::Invalid(
            "Cycle detected in job dependencies".into(),
        ));
    }
    Ok(())
}
