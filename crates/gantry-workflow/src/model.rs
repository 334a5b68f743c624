//! Serde model of a workflow document.
//!
//! Only the parts dispatch needs are typed. Everything else is carried in
//! `extra` so a job can be re-serialized without losing keys.

use serde::{Deserialize, Deserializer, Serialize};
use serde_yaml::{Mapping, Value};

use crate::error::{Result, WorkflowError};

/// A whole workflow file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Title template for runs of this workflow.
    #[serde(rename = "run-name", default, skip_serializing_if = "Option::is_none")]
    pub run_name: Option<String>,

    /// Raw trigger block, decoded lazily by [`Triggers`](crate::Triggers).
    #[serde(rename = "on", default)]
    pub on: Value,

    #[serde(default, skip_serializing_if = "Mapping::is_empty")]
    pub env: Mapping,

    /// Job id → job, in declaration order.
    #[serde(default)]
    pub jobs: Mapping,

    /// `defaults`, `concurrency`, `permissions` and anything else.
    #[serde(flatten)]
    pub extra: Mapping,
}

impl WorkflowDocument {
    /// Parse a document from raw bytes.
    pub fn from_slice(content: &[u8]) -> Result<Self> {
        if content.iter().all(u8::is_ascii_whitespace) {
            return Err(WorkflowError::Invalid("workflow file is empty".into()));
        }
        Ok(serde_yaml::from_slice(content)?)
    }

    /// Typed jobs in declaration order.
    pub fn jobs(&self) -> Result<Vec<(String, Job)>> {
        self.jobs
            .iter()
            .map(|(key, value)| {
                let id = key
                    .as_str()
                    .ok_or_else(|| WorkflowError::Invalid(format!("job id {key:?} is not a string")))?;
                let job: Job = if value.is_null() {
                    Job::default()
                } else {
                    serde_yaml::from_value(value.clone()).map_err(|e| {
                        WorkflowError::Invalid(format!("job '{id}': {e}"))
                    })?
                };
                Ok((id.to_string(), job))
            })
            .collect()
    }
}

/// One entry of `jobs:`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Job {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// `needs: a` and `needs: [a, b]` are both accepted.
    #[serde(
        default,
        deserialize_with = "one_or_many",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub needs: Vec<String>,

    /// A label, a list of labels, or a `{ group, labels }` mapping.
    #[serde(rename = "runs-on", default, skip_serializing_if = "Value::is_null")]
    pub runs_on: Value,

    #[serde(rename = "if", default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<Strategy>,

    #[serde(default, skip_serializing_if = "Mapping::is_empty")]
    pub env: Mapping,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<Value>,

    #[serde(flatten)]
    pub extra: Mapping,
}

impl Job {
    /// Runner labels from `runs-on`.
    pub fn runs_on_labels(&self) -> Vec<String> {
        match &self.runs_on {
            Value::String(label) => vec![label.clone()],
            Value::Sequence(labels) => labels.iter().filter_map(scalar_to_string).collect(),
            Value::Mapping(map) => match map.get("labels") {
                Some(Value::String(label)) => vec![label.clone()],
                Some(Value::Sequence(labels)) => {
                    labels.iter().filter_map(scalar_to_string).collect()
                }
                _ => Vec::new(),
            },
            _ => Vec::new(),
        }
    }
}

/// `strategy:` block of a job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Strategy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matrix: Option<Value>,

    /// `fail-fast`, `max-parallel`.
    #[serde(flatten)]
    pub extra: Mapping,
}

/// Text form of a scalar YAML value. Collections yield `None`.
pub(crate) fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn one_or_many<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(OneOrMany::One(s)) => vec![s],
        Some(OneOrMany::Many(v)) => v,
    })
}
