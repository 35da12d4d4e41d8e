//! Execution record persistence.

use crate::error::PersistError;
use crate::execution::Execution;
use async_trait::async_trait;

/// Loads and saves the [`Execution`] belonging to a workflow context.
///
/// The engine calls [`save`](WorkflowPersister::save) exactly once per run or
/// resume, after traversal, and [`load`](WorkflowPersister::load) before
/// re-entering the graph. Concurrency control between callers resuming the
/// same context is up to the implementation.
#[async_trait]
pub trait WorkflowPersister<C>: Send + Sync {
    /// Stores `execution` for `context`.
    async fn save(&self, context: &C, execution: &Execution) -> Result<(), PersistError>;

    /// Returns the execution last saved for `context`.
    async fn load(&self, context: &C) -> Result<Execution, PersistError>;
}
