//! A durable, graph-based workflow engine for Rust.
//!
//! A workflow is a directed graph of named nodes. Each node holds one activity
//! and a list of conditional edges. Running a workflow walks the graph from
//! `start` until it reaches `end` (complete), `fail` (failed), an activity
//! that suspends (pending), or an error (corrupted). The resulting
//! [`Execution`] is saved through a [`WorkflowPersister`], so a suspended run
//! can be resumed later, possibly from another process.
//!
//! # Example
//!
//! ```rust,ignore
//! use hataori::prelude::*;
//! use std::sync::Arc;
//!
//! #[derive(Debug, Default)]
//! struct Order {
//!     id: String,
//!     total: u64,
//!     discounted: u64,
//! }
//!
//! type Discount = DelegateActivity<u64, u64>;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), WorkflowError> {
//!     let registry = ActivityRegistry::new()
//!         .with("Discount", || Discount::new(|total: u64| Ok::<_, String>(total * 9 / 10)));
//!
//!     let workflow = Workflow::builder()
//!         .node("discount")
//!         .activity(
//!             "discount",
//!             ActivitySlot::<Order, Discount>::new("Discount", |order| order.total)
//!                 .process_output(|order, value| order.discounted = value),
//!         )
//!         .on_success("start", "discount")
//!         .on_success("discount", "end")
//!         .factory(Arc::new(registry))
//!         .persister(Arc::new(InMemoryPersister::new(|order: &Order| order.id.clone())))
//!         .build()?;
//!
//!     let mut order = Order { id: "42".into(), total: 100, ..Order::default() };
//!     let execution = workflow.run(&mut order).await?;
//!     assert_eq!(execution.state, WorkflowState::Complete);
//!     Ok(())
//! }
//! ```

mod config;
mod executor;
mod graph;
mod graphviz;
mod persister;
mod slot;
mod workflow;
mod yuml;

// Re-export core types
pub use hataori_core::*;

pub use config::WorkflowConfig;
pub use executor::{
    Executor, NodeVisitor, ResumeAfterExecutor, ResumeExecutor, ResumeFromExecutor,
    WorkflowExecutor,
};
pub use graph::{Condition, Graph, GraphEdge, GraphNode, NodeResolver};
pub use persister::{InMemoryPersister, JsonFilePersister};
pub use slot::{ActivitySlot, EmptySlot, Slot, SlotOutcome};
pub use workflow::{Workflow, WorkflowBuilder};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{
        Activity, ActivityError, ActivityRegistry, ActivityResult, ActivitySlot,
        DelegateActivity, Execution, ExecutionObserver, GraphEdge, InMemoryPersister,
        JsonFilePersister, OutputSink, Uuid, Workflow, WorkflowBuilder, WorkflowConfig,
        WorkflowError, WorkflowPersister, WorkflowState,
    };
}
