//! Workflow configuration.

use serde::{Deserialize, Serialize};

/// Settings applied to every run and resume of a workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Name used in tracing spans and log lines.
    #[serde(default = "WorkflowConfig::default_name")]
    pub name: String,
    /// Maximum number of transitions one call may take. Unlimited when `None`.
    #[serde(default)]
    pub max_transitions: Option<u32>,
}

impl WorkflowConfig {
    /// Creates a configuration with the given workflow name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_max_transitions(mut self, max_transitions: u32) -> Self {
        self.max_transitions = Some(max_transitions);
        self
    }

    fn default_name() -> String {
        "workflow".to_string()
    }
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            name: Self::default_name(),
            max_transitions: None,
        }
    }
}
