//! Graph traversal.
//!
//! [`Executor`] walks the graph from an entry node. How the entry node's
//! activity is carried out depends on the [`NodeVisitor`] passed in: the
//! plain [`WorkflowExecutor`] runs it, the resume variants resume it, run it
//! with injected input, or complete it with injected output. Every node after
//! the entry node is visited with [`WorkflowExecutor`].

use crate::config::WorkflowConfig;
use crate::graph::{GraphEdge, GraphNode, NodeResolver};
use crate::slot::SlotOutcome;
use async_trait::async_trait;
use hataori_core::{
    ActivityError, ActivityExecution, ActivityFactory, ActivityResult, Execution,
    ExecutionObserver, InputProvider, NodeRole, OutputProvider, WorkflowError, WorkflowState,
};
use serde_json::Value;
use tracing::{debug, debug_span, error, info, warn, Instrument};

/// Carries out the activity of a single node.
#[async_trait]
pub trait NodeVisitor<C>: Send + Sync {
    /// The activity execution recorded for this visit. A fresh one by default.
    fn activity_execution(&self, node: &GraphNode<C>, _execution: &Execution) -> ActivityExecution {
        ActivityExecution::new(node.name().clone())
    }

    async fn visit_node(
        &self,
        node: &GraphNode<C>,
        activity: &ActivityExecution,
        context: &mut C,
        factory: &dyn ActivityFactory,
        observer: &dyn ExecutionObserver,
    ) -> Result<SlotOutcome, ActivityError>;
}

/// Runs the node's activity normally.
#[derive(Debug, Clone, Copy, Default)]
pub struct WorkflowExecutor;

#[async_trait]
impl<C: Send + Sync> NodeVisitor<C> for WorkflowExecutor {
    async fn visit_node(
        &self,
        node: &GraphNode<C>,
        activity: &ActivityExecution,
        context: &mut C,
        factory: &dyn ActivityFactory,
        observer: &dyn ExecutionObserver,
    ) -> Result<SlotOutcome, ActivityError> {
        execute_with_input(node, activity, context, factory, observer, None).await
    }
}

/// Resumes the suspended activity of the entry node with a closure payload.
#[derive(Debug)]
pub struct ResumeExecutor<'a> {
    activity: ActivityExecution,
    closure: &'a Value,
}

impl<'a> ResumeExecutor<'a> {
    pub fn new(activity: ActivityExecution, closure: &'a Value) -> Self {
        Self { activity, closure }
    }
}

#[async_trait]
impl<C: Send + Sync> NodeVisitor<C> for ResumeExecutor<'_> {
    fn activity_execution(&self, _node: &GraphNode<C>, _execution: &Execution) -> ActivityExecution {
        self.activity.clone()
    }

    async fn visit_node(
        &self,
        node: &GraphNode<C>,
        activity: &ActivityExecution,
        context: &mut C,
        factory: &dyn ActivityFactory,
        _observer: &dyn ExecutionObserver,
    ) -> Result<SlotOutcome, ActivityError> {
        node.slot()
            .resume(activity.id, factory, context, self.closure)
            .await
    }
}

/// Re-runs the entry node with input taken from a provider.
pub struct ResumeFromExecutor<'a> {
    input: &'a dyn InputProvider,
}

impl<'a> ResumeFromExecutor<'a> {
    pub fn new(input: &'a dyn InputProvider) -> Self {
        Self { input }
    }
}

#[async_trait]
impl<C: Send + Sync> NodeVisitor<C> for ResumeFromExecutor<'_> {
    async fn visit_node(
        &self,
        node: &GraphNode<C>,
        activity: &ActivityExecution,
        context: &mut C,
        factory: &dyn ActivityFactory,
        observer: &dyn ExecutionObserver,
    ) -> Result<SlotOutcome, ActivityError> {
        execute_with_input(node, activity, context, factory, observer, Some(self.input)).await
    }
}

/// Completes the entry node without running its activity.
pub struct ResumeAfterExecutor<'a> {
    output: &'a dyn OutputProvider,
}

impl<'a> ResumeAfterExecutor<'a> {
    pub fn new(output: &'a dyn OutputProvider) -> Self {
        Self { output }
    }
}

#[async_trait]
impl<C: Send + Sync> NodeVisitor<C> for ResumeAfterExecutor<'_> {
    async fn visit_node(
        &self,
        node: &GraphNode<C>,
        activity: &ActivityExecution,
        context: &mut C,
        factory: &dyn ActivityFactory,
        observer: &dyn ExecutionObserver,
    ) -> Result<SlotOutcome, ActivityError> {
        let fake_type = format!("{} [FAKE]", node.activity_type());
        observer.activity_started(activity.id, node.name().as_str(), &fake_type, None);
        node.slot()
            .complete(activity.id, factory, context, self.output)
            .await
    }
}

async fn execute_with_input<C: Send + Sync>(
    node: &GraphNode<C>,
    activity: &ActivityExecution,
    context: &mut C,
    factory: &dyn ActivityFactory,
    observer: &dyn ExecutionObserver,
    input: Option<&dyn InputProvider>,
) -> Result<SlotOutcome, ActivityError> {
    let id = activity.id;
    let name = node.name().as_str();
    let activity_type = node.activity_type();
    let before_execute = |input: Option<Value>| {
        observer.activity_started(id, name, activity_type, input.as_ref());
    };
    node.slot()
        .execute(id, factory, context, input, &before_execute)
        .await
}

/// Walks the graph, updating an [`Execution`] as it goes.
pub struct Executor<'a, C> {
    resolver: &'a dyn NodeResolver<C>,
    factory: &'a dyn ActivityFactory,
    observer: &'a dyn ExecutionObserver,
    config: &'a WorkflowConfig,
}

impl<'a, C: Send + Sync> Executor<'a, C> {
    pub fn new(
        resolver: &'a dyn NodeResolver<C>,
        factory: &'a dyn ActivityFactory,
        observer: &'a dyn ExecutionObserver,
        config: &'a WorkflowConfig,
    ) -> Self {
        Self {
            resolver,
            factory,
            observer,
            config,
        }
    }

    /// Visits `entry` with `visitor`, then follows transitions with the plain
    /// executor until traversal stops.
    ///
    /// Errors raised by a visit are logged and returned; the execution keeps
    /// whatever state the failed visit left behind.
    pub async fn run(
        &self,
        entry: &'a GraphNode<C>,
        visitor: &dyn NodeVisitor<C>,
        context: &mut C,
        execution: &mut Execution,
    ) -> Result<(), WorkflowError> {
        let mut node = entry;
        let mut visitor = visitor;
        let mut transitions: u32 = 0;

        loop {
            let next = match self.visit(node, visitor, context, execution).await {
                Ok(next) => next,
                Err(e) => {
                    error!(
                        "Workflow '{}' failed in node '{}': {}",
                        self.config.name,
                        node.name(),
                        e
                    );
                    return Err(e);
                }
            };

            let Some(target) = next else {
                return Ok(());
            };

            if let Some(limit) = self.config.max_transitions {
                if transitions >= limit {
                    error!(
                        "Workflow '{}' exceeded {} transitions at node '{}'",
                        self.config.name,
                        limit,
                        node.name()
                    );
                    return Err(WorkflowError::TransitionLimitExceeded(limit));
                }
            }
            transitions += 1;
            node = target;
            visitor = &WorkflowExecutor;
        }
    }

    async fn visit(
        &self,
        node: &'a GraphNode<C>,
        visitor: &dyn NodeVisitor<C>,
        context: &mut C,
        execution: &mut Execution,
    ) -> Result<Option<&'a GraphNode<C>>, WorkflowError> {
        let activity = visitor.activity_execution(node, execution);
        execution.track(activity.clone());

        let span = debug_span!(
            "visit",
            workflow = %self.config.name,
            node = %node.name(),
            activity_type = node.activity_type(),
            execution_id = %activity.id,
        );
        self.step(node, visitor, &activity, context, execution)
            .instrument(span)
            .await
    }

    async fn step(
        &self,
        node: &'a GraphNode<C>,
        visitor: &dyn NodeVisitor<C>,
        activity: &ActivityExecution,
        context: &mut C,
        execution: &mut Execution,
    ) -> Result<Option<&'a GraphNode<C>>, WorkflowError> {
        let name = node.name().as_str();
        let activity_type = node.activity_type();

        let outcome = visitor
            .visit_node(node, activity, context, self.factory, self.observer)
            .await
            .map_err(|source| WorkflowError::Activity {
                node: node.name().clone(),
                activity_type: activity_type.to_string(),
                source,
            })?;

        match outcome.result {
            ActivityResult::None => {
                warn!("Activity '{}' in node '{}' returned no result", activity_type, name);
                self.observer.activity_corrupted(activity.id, name, activity_type);
                execution.corrupt(format!(
                    "Activity '{}' in node '{}' returned no result",
                    activity_type, name
                ));
                return Ok(None);
            }
            ActivityResult::Pending => {
                info!("Activity '{}' in node '{}' suspended", activity_type, name);
                execution.state = WorkflowState::InProgress;
                return Ok(None);
            }
            ActivityResult::Failed => {
                warn!("Activity '{}' in node '{}' failed", activity_type, name);
                self.observer
                    .activity_failed(activity.id, name, activity_type, outcome.output.as_ref());
                execution.release(activity.id);
            }
            ActivityResult::Succeeded => {
                debug!("Activity '{}' in node '{}' succeeded", activity_type, name);
                self.observer
                    .activity_finished(activity.id, name, activity_type, outcome.output.as_ref());
                execution.release(activity.id);
            }
        }

        let matching = node.matching_edges(context, outcome.result);
        match matching.as_slice() {
            [] => {
                self.finish(node, outcome.result, execution);
                Ok(None)
            }
            [edge] => {
                let resolver = self.resolver;
                let target = resolver
                    .resolve(edge.target().as_str())
                    .ok_or_else(|| WorkflowError::NodeNotFound(edge.target().clone()))?;
                debug!("Transition {}", edge.describe(node.name()));
                Ok(Some(target))
            }
            edges => {
                let message = format!(
                    "Failed to get next node - more then one transition condition was met: \n{}",
                    describe_all(node, edges.iter().copied())
                );
                warn!("{}", message);
                execution.corrupt(message);
                Ok(None)
            }
        }
    }

    /// Settles the execution state when no edge matched.
    fn finish(&self, node: &GraphNode<C>, result: ActivityResult, execution: &mut Execution) {
        match (node.role(), result) {
            (NodeRole::End, ActivityResult::Succeeded) => {
                info!("Workflow '{}' complete", self.config.name);
                execution.state = WorkflowState::Complete;
            }
            (NodeRole::Fail, _) => {
                info!("Workflow '{}' reached node 'fail'", self.config.name);
                execution.state = WorkflowState::Failed;
            }
            (NodeRole::End, result) => {
                let message = format!("Node '{}' reached with activity result {}", node.name(), result);
                warn!("{}", message);
                execution.corrupt(message);
            }
            _ => {
                let message = format!(
                    "Failed to get next node - none of transition condition was met: \n{}",
                    describe_all(node, node.edges().iter())
                );
                warn!("{}", message);
                execution.corrupt(message);
            }
        }
    }
}

fn describe_all<'e, C: 'e>(
    node: &GraphNode<C>,
    edges: impl Iterator<Item = &'e GraphEdge<C>>,
) -> String {
    edges
        .map(|edge| edge.describe(node.name()))
        .collect::<Vec<_>>()
        .join("\n")
}
