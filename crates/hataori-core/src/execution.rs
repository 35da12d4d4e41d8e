//! The persisted execution record and execution observers.

use crate::node::NodeName;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

/// Overall state of a workflow execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum WorkflowState {
    /// Running, or suspended on a pending activity.
    #[default]
    InProgress,
    /// Reached `end` successfully.
    Complete,
    /// Reached `fail`.
    Failed,
    /// The graph could not be walked; see [`Execution::error`].
    Corrupted,
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkflowState::InProgress => write!(f, "InProgress"),
            WorkflowState::Complete => write!(f, "Complete"),
            WorkflowState::Failed => write!(f, "Failed"),
            WorkflowState::Corrupted => write!(f, "Corrupted"),
        }
    }
}

/// An activity invocation that is in flight at a given node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityExecution {
    /// Unique id of the invocation.
    pub id: Uuid,
    /// Node the activity is bound to.
    pub node: NodeName,
}

impl ActivityExecution {
    /// Creates an activity execution with a fresh id.
    pub fn new(node: impl Into<NodeName>) -> Self {
        Self::with_id(node, Uuid::new_v4())
    }

    /// Creates an activity execution with a known id.
    pub fn with_id(node: impl Into<NodeName>, id: Uuid) -> Self {
        Self {
            id,
            node: node.into(),
        }
    }
}

/// Bookkeeping for one workflow run, saved after every run or resume.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Execution {
    pub state: WorkflowState,
    pub error: Option<String>,
    /// Suspended activities. Holds at most one entry.
    pub executing_activities: Vec<ActivityExecution>,
}

impl Execution {
    /// Creates a fresh, in-progress execution.
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up an in-flight activity by id.
    pub fn find_activity(&self, id: Uuid) -> Option<&ActivityExecution> {
        self.executing_activities.iter().find(|a| a.id == id)
    }

    /// Makes `activity` the only in-flight activity.
    pub fn track(&mut self, activity: ActivityExecution) {
        self.executing_activities.clear();
        self.executing_activities.push(activity);
    }

    /// Drops the in-flight activity with the given id.
    pub fn release(&mut self, id: Uuid) {
        self.executing_activities.retain(|a| a.id != id);
    }

    /// Marks the execution corrupted with an explanation.
    pub fn corrupt(&mut self, error: impl Into<String>) {
        self.state = WorkflowState::Corrupted;
        self.error = Some(error.into());
    }

    /// Returns `true` once the state is no longer `InProgress`.
    pub fn is_finished(&self) -> bool {
        self.state != WorkflowState::InProgress
    }
}

/// Receives activity lifecycle notifications.
///
/// Every method defaults to doing nothing.
pub trait ExecutionObserver: Send + Sync {
    /// An activity is about to run. `input` is `None` when the activity hides
    /// its input, or a diagnostic string when the input could not be obtained.
    fn activity_started(
        &self,
        _execution_id: Uuid,
        _node: &str,
        _activity_type: &str,
        _input: Option<&Value>,
    ) {
    }

    fn activity_finished(
        &self,
        _execution_id: Uuid,
        _node: &str,
        _activity_type: &str,
        _output: Option<&Value>,
    ) {
    }

    fn activity_failed(
        &self,
        _execution_id: Uuid,
        _node: &str,
        _activity_type: &str,
        _output: Option<&Value>,
    ) {
    }

    /// An activity produced no definitive result.
    fn activity_corrupted(&self, _execution_id: Uuid, _node: &str, _activity_type: &str) {}
}

/// An observer that ignores every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullObserver;

impl ExecutionObserver for NullObserver {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_keeps_single_activity() {
        let mut execution = Execution::new();
        assert_eq!(execution.state, WorkflowState::InProgress);

        let first = ActivityExecution::new("node1");
        let second = ActivityExecution::new("node2");
        execution.track(first.clone());
        execution.track(second.clone());

        assert_eq!(execution.executing_activities, vec![second.clone()]);
        assert!(execution.find_activity(first.id).is_none());
        assert_eq!(execution.find_activity(second.id), Some(&second));

        execution.release(second.id);
        assert!(execution.executing_activities.is_empty());
    }

    #[test]
    fn test_corrupt() {
        let mut execution = Execution::new();
        assert!(!execution.is_finished());

        execution.corrupt("broken");
        assert_eq!(execution.state, WorkflowState::Corrupted);
        assert_eq!(execution.error.as_deref(), Some("broken"));
        assert!(execution.is_finished());
    }

    #[test]
    fn test_execution_json_shape() {
        let id = Uuid::nil();
        let mut execution = Execution::new();
        execution.track(ActivityExecution::with_id("node2", id));

        let json = serde_json::to_value(&execution).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "state": "InProgress",
                "error": null,
                "executing_activities": [
                    { "id": "00000000-0000-0000-0000-000000000000", "node": "node2" }
                ]
            })
        );

        let back: Execution = serde_json::from_value(json).unwrap();
        assert_eq!(back, execution);
    }
}
