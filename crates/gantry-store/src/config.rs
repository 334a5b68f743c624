//! Per-repository actions settings.

use serde::{Deserialize, Serialize};

/// Actions settings of one repository.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionsConfig {
    /// Workflow ids (file names) that may not be dispatched.
    #[serde(default)]
    pub disabled_workflows: Vec<String>,
}

impl ActionsConfig {
    pub fn is_workflow_disabled(&self, workflow_id: &str) -> bool {
        self.disabled_workflows.iter().any(|w| w == workflow_id)
    }

    pub fn disable_workflow(&mut self, workflow_id: &str) {
        if !self.is_workflow_disabled(workflow_id) {
            self.disabled_workflows.push(workflow_id.to_string());
        }
    }

    pub fn enable_workflow(&mut self, workflow_id: &str) {
        self.disabled_workflows.retain(|w| w != workflow_id);
    }
}
