//! The workflow facade: building, running and resuming a graph.

use crate::config::WorkflowConfig;
use crate::executor::{
    Executor, NodeVisitor, ResumeAfterExecutor, ResumeExecutor, ResumeFromExecutor,
    WorkflowExecutor,
};
use crate::graph::{Graph, GraphEdge, GraphNode, NodeResolver};
use crate::graphviz;
use crate::slot::{ActivitySlot, Slot};
use crate::yuml;
use hataori_core::{
    ActivityError, ActivityFactory, ActivityInstance, ActivityRegistry, DelegateActivity,
    Execution, ExecutionObserver, InputProvider, LiteralInput, LiteralOutput, NodeName,
    NullObserver, OutputProvider, Uuid, WorkflowError, WorkflowPersister, WorkflowState,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

/// A validated workflow graph together with its collaborators.
///
/// Every entry point returns the resulting [`Execution`] after saving it with
/// the configured persister. Problems met while walking the graph are recorded
/// in the execution (state [`WorkflowState::Corrupted`] plus `error`); only
/// persistence failures are returned as `Err`.
pub struct Workflow<C> {
    graph: Graph<C>,
    persister: Arc<dyn WorkflowPersister<C>>,
    factory: Arc<dyn ActivityFactory>,
    observer: Arc<dyn ExecutionObserver>,
    config: WorkflowConfig,
}

impl<C> fmt::Debug for Workflow<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Workflow")
            .field("name", &self.config.name)
            .field("nodes", &self.graph.nodes().map(|n| n.name()).collect::<Vec<_>>())
            .finish()
    }
}

impl<C: Send + Sync + 'static> Workflow<C> {
    /// Creates a new workflow builder.
    pub fn builder() -> WorkflowBuilder<C> {
        WorkflowBuilder::new()
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    /// Looks up a node by name or alias.
    pub fn node(&self, name: &str) -> Option<&GraphNode<C>> {
        self.graph.resolve(name)
    }

    pub fn graph(&self) -> &Graph<C> {
        &self.graph
    }

    /// Renders the graph in Graphviz DOT format.
    pub fn to_graphviz(&self) -> String {
        graphviz::render(&self.graph, self.graph.start())
    }

    /// Renders the graph as a yUML activity diagram.
    pub fn to_yuml_activity(&self) -> String {
        yuml::render_activity(&self.graph, self.graph.start())
    }

    /// Renders the graph as yUML class-diagram lines.
    pub fn to_yuml_class(&self) -> String {
        yuml::render_class(&self.graph, self.graph.start())
    }

    /// Walks the graph from `start` with a fresh execution.
    pub async fn run(&self, context: &mut C) -> Result<Execution, WorkflowError> {
        info!("Workflow '{}' started", self.config.name);
        let mut execution = Execution::new();
        self.traverse(self.graph.start(), &WorkflowExecutor, context, &mut execution)
            .await;
        self.persist(context, execution).await
    }

    /// Resumes the suspended activity `activity_execution_id` with `closure`
    /// and continues from there.
    ///
    /// An id that is not in flight corrupts the execution without touching
    /// the graph.
    pub async fn resume(
        &self,
        context: &mut C,
        activity_execution_id: Uuid,
        closure: Value,
    ) -> Result<Execution, WorkflowError> {
        let mut execution = self.persister.load(context).await?;
        match execution.find_activity(activity_execution_id).cloned() {
            Some(activity) => {
                info!(
                    "Workflow '{}' resuming activity {} in node '{}'",
                    self.config.name, activity.id, activity.node
                );
                let entry = activity.node.clone();
                let visitor = ResumeExecutor::new(activity, &closure);
                self.reenter(entry.as_str(), &visitor, context, &mut execution)
                    .await;
            }
            None => {
                warn!(
                    "Workflow '{}' has no activity {} in flight",
                    self.config.name, activity_execution_id
                );
                execution.corrupt(format!(
                    "Failed to resume. Provided activity execution id '{}' not found",
                    activity_execution_id
                ));
            }
        }
        self.persist(context, execution).await
    }

    /// Re-runs `node` with `input` in place of its input selector, then
    /// continues. `None` or JSON `null` keeps the node's own selector.
    pub async fn resume_from(
        &self,
        context: &mut C,
        node: &str,
        input: Option<Value>,
    ) -> Result<Execution, WorkflowError> {
        self.resume_from_provider(context, node, &LiteralInput(input))
            .await
    }

    /// Like [`resume_from`](Workflow::resume_from), asking `input` for the value.
    pub async fn resume_from_provider(
        &self,
        context: &mut C,
        node: &str,
        input: &dyn InputProvider,
    ) -> Result<Execution, WorkflowError> {
        info!("Workflow '{}' resuming from node '{}'", self.config.name, node);
        let mut execution = self.persister.load(context).await?;
        let visitor = ResumeFromExecutor::new(input);
        self.reenter(node, &visitor, context, &mut execution).await;
        self.persist(context, execution).await
    }

    /// Treats `node` as succeeded with the output from `output` without
    /// running its activity, then continues.
    pub async fn resume_after(
        &self,
        context: &mut C,
        node: &str,
        output: &dyn OutputProvider,
    ) -> Result<Execution, WorkflowError> {
        info!("Workflow '{}' resuming after node '{}'", self.config.name, node);
        let mut execution = self.persister.load(context).await?;
        let visitor = ResumeAfterExecutor::new(output);
        self.reenter(node, &visitor, context, &mut execution).await;
        self.persist(context, execution).await
    }

    /// [`resume_after`](Workflow::resume_after) with a literal output.
    pub async fn resume_after_with(
        &self,
        context: &mut C,
        node: &str,
        output: Value,
    ) -> Result<Execution, WorkflowError> {
        self.resume_after(context, node, &LiteralOutput(output))
            .await
    }

    async fn reenter(
        &self,
        node: &str,
        visitor: &dyn NodeVisitor<C>,
        context: &mut C,
        execution: &mut Execution,
    ) {
        execution.state = WorkflowState::InProgress;
        execution.error = None;

        match self.graph.resolve(node) {
            Some(entry) => self.traverse(entry, visitor, context, execution).await,
            None => {
                let error = WorkflowError::NodeNotFound(NodeName::new(node));
                warn!("Workflow '{}' can not re-enter: {}", self.config.name, error);
                execution.corrupt(error.to_string());
            }
        }
    }

    async fn traverse(
        &self,
        entry: &GraphNode<C>,
        visitor: &dyn NodeVisitor<C>,
        context: &mut C,
        execution: &mut Execution,
    ) {
        let executor = Executor::new(
            &self.graph,
            self.factory.as_ref(),
            self.observer.as_ref(),
            &self.config,
        );
        if let Err(e) = executor.run(entry, visitor, context, execution).await {
            execution.corrupt(e.to_string());
        }
    }

    async fn persist(&self, context: &C, execution: Execution) -> Result<Execution, WorkflowError> {
        self.persister.save(context, &execution).await?;
        info!(
            "Workflow '{}' stopped in state {}",
            self.config.name, execution.state
        );
        Ok(execution)
    }
}

/// Builder for constructing [`Workflow`] instances.
///
/// Registration problems are collected and reported by
/// [`build`](WorkflowBuilder::build).
pub struct WorkflowBuilder<C> {
    graph: Graph<C>,
    persister: Option<Arc<dyn WorkflowPersister<C>>>,
    factory: Arc<dyn ActivityFactory>,
    delegates: ActivityRegistry,
    observer: Arc<dyn ExecutionObserver>,
    config: WorkflowConfig,
    errors: Vec<String>,
}

impl<C: Send + Sync + 'static> Default for WorkflowBuilder<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Send + Sync + 'static> WorkflowBuilder<C> {
    /// Creates a builder with an empty activity registry and no observer.
    pub fn new() -> Self {
        Self {
            graph: Graph::new(),
            persister: None,
            factory: Arc::new(ActivityRegistry::new()),
            delegates: ActivityRegistry::new(),
            observer: Arc::new(NullObserver),
            config: WorkflowConfig::default(),
            errors: Vec::new(),
        }
    }

    /// Adds a node with an empty slot.
    pub fn node(self, name: &str) -> Self {
        self.node_with_aliases(name, &[])
    }

    /// Adds a node reachable under several names.
    pub fn node_with_aliases(mut self, name: &str, aliases: &[&str]) -> Self {
        match self.graph.add_node(name, aliases) {
            Ok(()) => {}
            Err(WorkflowError::Configuration(message)) => self.errors.push(message),
            Err(other) => self.errors.push(other.to_string()),
        }
        self
    }

    /// Attaches an activity slot to an existing node.
    pub fn activity<S: Slot<C> + 'static>(mut self, node: &str, slot: S) -> Self {
        match self.graph.node_mut(node) {
            Some(target) => target.set_slot(Box::new(slot)),
            None => self
                .errors
                .push(format!("Can not attach activity to unknown node '{}'", node)),
        }
        self
    }

    /// Binds `method` to `node` as a `DelegateActivity <method_name>`.
    ///
    /// The activity is registered with the workflow itself, so the configured
    /// factory does not need to know it. `select_input` reads the argument
    /// from the context and `process_output` stores the result; an `Err` from
    /// `method` fails the node.
    pub fn delegate<I, O, E, S, F, P>(
        mut self,
        node: &str,
        method_name: &str,
        select_input: S,
        method: F,
        process_output: P,
    ) -> Self
    where
        I: Serialize + DeserializeOwned + Send + 'static,
        O: Serialize + DeserializeOwned + Send + 'static,
        E: fmt::Display + 'static,
        S: Fn(&C) -> I + Send + Sync + 'static,
        F: Fn(I) -> Result<O, E> + Send + Sync + 'static,
        P: Fn(&mut C, O) + Send + Sync + 'static,
    {
        let activity_type = delegate_type(method_name);
        let method = Arc::new(method);
        self.delegates.register(activity_type.clone(), move || {
            let method = Arc::clone(&method);
            DelegateActivity::new(move |input: I| method(input))
        });
        self.activity(
            node,
            ActivitySlot::<C, DelegateActivity<I, O>>::new(activity_type, select_input)
                .process_output(process_output),
        )
    }

    /// Adds an outgoing edge to `from`.
    pub fn transition(mut self, from: &str, edge: GraphEdge<C>) -> Self {
        match self.graph.node_mut(from) {
            Some(node) => node.add_edge(edge),
            None => self
                .errors
                .push(format!("Can not add transition from unknown node '{}'", from)),
        }
        self
    }

    /// `from` goes to `to` when its activity succeeded.
    pub fn on_success(self, from: &str, to: &str) -> Self {
        self.transition(from, GraphEdge::on_success(to))
    }

    /// `from` goes to `to` when its activity failed.
    pub fn on_fail(self, from: &str, to: &str) -> Self {
        self.transition(from, GraphEdge::on_fail(to))
    }

    /// `from` goes to `to` when `predicate` holds for the context,
    /// whatever the activity result.
    pub fn when<F>(self, from: &str, to: &str, description: &str, predicate: F) -> Self
    where
        F: Fn(&C) -> bool + Send + Sync + 'static,
    {
        self.transition(
            from,
            GraphEdge::conditional(to, description, move |context, _| predicate(context)),
        )
    }

    /// `from` always goes to `to`.
    pub fn always(self, from: &str, to: &str, description: &str) -> Self {
        self.transition(from, GraphEdge::new(to, description, None))
    }

    pub fn persister<P: WorkflowPersister<C> + 'static>(mut self, persister: Arc<P>) -> Self {
        self.persister = Some(persister);
        self
    }

    pub fn factory<F: ActivityFactory + 'static>(mut self, factory: Arc<F>) -> Self {
        self.factory = factory;
        self
    }

    pub fn observer<O: ExecutionObserver + 'static>(mut self, observer: Arc<O>) -> Self {
        self.observer = observer;
        self
    }

    pub fn config(mut self, config: WorkflowConfig) -> Self {
        self.config = config;
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.name = name.into();
        self
    }

    pub fn max_transitions(mut self, max_transitions: u32) -> Self {
        self.config.max_transitions = Some(max_transitions);
        self
    }

    /// Builds the workflow.
    ///
    /// Fails with registration errors first, then a missing persister, then
    /// graph validation errors.
    pub fn build(self) -> Result<Workflow<C>, WorkflowError> {
        if !self.errors.is_empty() {
            return Err(WorkflowError::Configuration(self.errors.join("\n")));
        }

        let persister = self.persister.ok_or_else(|| {
            WorkflowError::Configuration("Persister must be specified".to_string())
        })?;

        self.graph.validate()?;

        let factory: Arc<dyn ActivityFactory> = if self.delegates.is_empty() {
            self.factory
        } else {
            Arc::new(BoundDelegates {
                delegates: self.delegates,
                fallback: self.factory,
            })
        };

        Ok(Workflow {
            graph: self.graph,
            persister,
            factory,
            observer: self.observer,
            config: self.config,
        })
    }
}

fn delegate_type(method_name: &str) -> String {
    if method_name.is_empty() {
        "DelegateActivity".to_string()
    } else {
        format!("DelegateActivity {method_name}")
    }
}

/// Serves delegates bound on the builder ahead of the configured factory.
struct BoundDelegates {
    delegates: ActivityRegistry,
    fallback: Arc<dyn ActivityFactory>,
}

impl ActivityFactory for BoundDelegates {
    fn create(&self, activity_type: &str) -> Result<ActivityInstance, ActivityError> {
        if self.delegates.contains(activity_type) {
            self.delegates.create(activity_type)
        } else {
            self.fallback.create(activity_type)
        }
    }

    fn release(&self, activity_type: &str, instance: ActivityInstance) {
        if !self.delegates.contains(activity_type) {
            self.fallback.release(activity_type, instance);
        }
    }
}
