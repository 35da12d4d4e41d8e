//! Workflow error types.

use crate::node::NodeName;
use thiserror::Error;

/// Errors raised while obtaining input for, creating, or running an activity.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ActivityError {
    /// The activity input could not be produced.
    #[error("{0}")]
    Input(String),

    /// The factory has no constructor for the activity type.
    #[error("Activity type '{0}' is not registered")]
    NotRegistered(String),

    /// The factory returned an instance of a different type than the slot expects.
    #[error("Factory produced an unexpected instance for activity type '{0}'")]
    UnexpectedInstance(String),

    /// An externally supplied output does not fit the activity output type.
    #[error("Output does not match the activity output type: {0}")]
    Output(String),

    /// The activity does not implement the requested operation.
    #[error("Activity does not support {0}")]
    Unsupported(&'static str),

    /// A value could not be converted to or from JSON.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Any other failure raised by an activity implementation.
    #[error("{0}")]
    Other(String),
}

impl ActivityError {
    /// Creates an input error, typically from an input selector.
    pub fn input(message: impl Into<String>) -> Self {
        Self::Input(message.into())
    }

    /// Creates a free-form activity error.
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }
}

/// Errors raised by a [`WorkflowPersister`](crate::WorkflowPersister).
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum PersistError {
    /// Nothing has been saved for the given key.
    #[error("No execution persisted for '{0}'")]
    NotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors that can occur while configuring or executing a workflow.
///
/// Only [`WorkflowError::Configuration`] and [`WorkflowError::Persistence`]
/// ever reach the caller of the workflow entry points; everything raised
/// during traversal is recorded into the returned execution instead.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum WorkflowError {
    /// A node name could not be resolved.
    #[error("Node not found: {0}")]
    NodeNotFound(NodeName),

    /// The workflow graph or builder configuration is invalid.
    #[error("Invalid workflow configuration: {0}")]
    Configuration(String),

    /// An activity slot raised an error while visiting a node.
    #[error("Activity '{activity_type}' failed in node '{node}': {source}")]
    Activity {
        /// The node being visited.
        node: NodeName,
        /// The activity type bound to the node.
        activity_type: String,
        /// What went wrong.
        #[source]
        source: ActivityError,
    },

    /// The traversal took more transitions than the configured limit.
    #[error("Transition limit of {0} exceeded")]
    TransitionLimitExceeded(u32),

    /// Loading or saving the execution record failed.
    #[error("Persistence failed: {0}")]
    Persistence(#[from] PersistError),
}
