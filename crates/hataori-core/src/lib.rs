//! Core traits and types for the hataori workflow engine.
//!
//! This crate holds the contracts that activities, persisters and observers
//! are written against, without the graph engine itself.
//!
//! # Core Types
//!
//! - [`Activity`] - A unit of work bound to a graph node
//! - [`ActivityResult`] - Outcome of an activity invocation
//! - [`ActivityFactory`] / [`ActivityRegistry`] - Activity instance creation
//! - [`Execution`] - The persisted record of a workflow run
//! - [`WorkflowPersister`] - Where execution records live between calls
//! - [`ExecutionObserver`] - Activity lifecycle notifications
//! - [`WorkflowError`] - Error types

mod activity;
mod delegate;
mod error;
mod execution;
mod factory;
mod node;
mod persist;
mod provider;

pub use activity::{Activity, ActivityOutput, ActivityResult, OutputSink};
pub use delegate::DelegateActivity;
pub use error::{ActivityError, PersistError, WorkflowError};
pub use execution::{ActivityExecution, Execution, ExecutionObserver, NullObserver, WorkflowState};
pub use factory::{ActivityFactory, ActivityInstance, ActivityRegistry};
pub use node::{NodeName, NodeRole};
pub use persist::WorkflowPersister;
pub use provider::{InputProvider, LiteralInput, LiteralOutput, OutputProvider};
pub use uuid::Uuid;
