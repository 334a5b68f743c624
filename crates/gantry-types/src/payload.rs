//! Event payload stored on dispatched runs.

use serde::{Deserialize, Serialize};

use crate::{ApiRepository, ApiUser};

/// Event name recorded on runs created by a manual dispatch.
pub const EVENT_WORKFLOW_DISPATCH: &str = "workflow_dispatch";

/// Envelope serialized once into `Run::event_payload`.
///
/// `git_ref` is the ref exactly as the caller supplied it, not the
/// normalized form stored on the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowDispatchPayload {
    pub workflow: String,
    #[serde(rename = "ref")]
    pub git_ref: String,
    pub inputs: serde_json::Map<String, serde_json::Value>,
    pub repository: ApiRepository,
    pub sender: ApiUser,
}

impl WorkflowDispatchPayload {
    /// Indented JSON form persisted on the run.
    pub fn json_payload(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
