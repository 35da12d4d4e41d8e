//! Graph model: edges, nodes, and name resolution.

use crate::slot::{EmptySlot, Slot};
use hataori_core::{ActivityResult, NodeName, NodeRole, WorkflowError};
use std::collections::HashMap;
use std::fmt;

/// Predicate deciding whether an edge may be taken.
pub type Condition<C> = Box<dyn Fn(&C, ActivityResult) -> bool + Send + Sync>;

/// A conditional transition to another node.
pub struct GraphEdge<C> {
    target: NodeName,
    description: String,
    condition: Condition<C>,
}

impl<C> GraphEdge<C> {
    /// Creates an edge. A missing condition always matches.
    pub fn new(
        target: impl Into<NodeName>,
        description: impl Into<String>,
        condition: Option<Condition<C>>,
    ) -> Self {
        Self {
            target: target.into(),
            description: description.into(),
            condition: condition.unwrap_or_else(|| Box::new(|_: &C, _: ActivityResult| true)),
        }
    }

    /// Creates an edge guarded by `condition`.
    pub fn conditional<F>(
        target: impl Into<NodeName>,
        description: impl Into<String>,
        condition: F,
    ) -> Self
    where
        F: Fn(&C, ActivityResult) -> bool + Send + Sync + 'static,
    {
        Self::new(target, description, Some(Box::new(condition)))
    }

    /// Taken when the node's activity succeeded. Labelled `Success`.
    pub fn on_success(target: impl Into<NodeName>) -> Self {
        Self::conditional(target, "Success", |_, result| {
            result == ActivityResult::Succeeded
        })
    }

    /// Taken when the node's activity failed. Labelled `Fail`.
    pub fn on_fail(target: impl Into<NodeName>) -> Self {
        Self::conditional(target, "Fail", |_, result| result == ActivityResult::Failed)
    }

    pub fn target(&self) -> &NodeName {
        &self.target
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Evaluates the edge condition.
    pub fn accepts(&self, context: &C, result: ActivityResult) -> bool {
        (self.condition)(context, result)
    }

    /// Renders the edge as `[<from>]-<description>-> [<target>]`.
    pub fn describe(&self, from: &NodeName) -> String {
        format!("[{}]-{}-> [{}]", from, self.description, self.target)
    }
}

impl<C> fmt::Debug for GraphEdge<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphEdge")
            .field("target", &self.target)
            .field("description", &self.description)
            .finish()
    }
}

/// A named vertex holding one activity slot and its outgoing edges.
pub struct GraphNode<C> {
    name: NodeName,
    slot: Box<dyn Slot<C>>,
    edges: Vec<GraphEdge<C>>,
}

impl<C: Send + Sync> GraphNode<C> {
    /// Creates a node with an empty slot and no edges.
    pub fn new(name: impl Into<NodeName>) -> Self {
        let name = name.into();
        Self {
            slot: Box::new(EmptySlot::new(name.as_str())),
            name,
            edges: Vec::new(),
        }
    }
}

impl<C> GraphNode<C> {
    pub fn name(&self) -> &NodeName {
        &self.name
    }

    pub fn role(&self) -> NodeRole {
        self.name.role()
    }

    /// Activity type reported to observers and diagrams.
    pub fn activity_type(&self) -> &str {
        self.slot.activity_type()
    }

    pub fn slot(&self) -> &dyn Slot<C> {
        self.slot.as_ref()
    }

    /// Outgoing edges in the order they were added.
    pub fn edges(&self) -> &[GraphEdge<C>] {
        &self.edges
    }

    pub fn add_edge(&mut self, edge: GraphEdge<C>) {
        self.edges.push(edge);
    }

    pub fn set_slot(&mut self, slot: Box<dyn Slot<C>>) {
        self.slot = slot;
    }

    /// Edges whose condition accepts `(context, result)`, in edge order.
    pub fn matching_edges(&self, context: &C, result: ActivityResult) -> Vec<&GraphEdge<C>> {
        self.edges
            .iter()
            .filter(|edge| edge.accepts(context, result))
            .collect()
    }
}

impl<C> fmt::Debug for GraphNode<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphNode")
            .field("name", &self.name)
            .field("activity_type", &self.activity_type())
            .field("edges", &self.edges)
            .finish()
    }
}

/// Maps node names (and aliases) to nodes.
pub trait NodeResolver<C>: Send + Sync {
    fn resolve(&self, name: &str) -> Option<&GraphNode<C>>;
}

/// The node dictionary of a workflow.
///
/// `start`, `end` and `fail` always exist.
pub struct Graph<C> {
    nodes: Vec<GraphNode<C>>,
    index: HashMap<NodeName, usize>,
}

impl<C: Send + Sync> Default for Graph<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Send + Sync> Graph<C> {
    /// Creates a graph holding only the sentinel nodes.
    pub fn new() -> Self {
        let mut graph = Self {
            nodes: Vec::new(),
            index: HashMap::new(),
        };
        for name in [NodeName::START, NodeName::END, NodeName::FAIL] {
            graph.index.insert(NodeName::new(name), graph.nodes.len());
            graph.nodes.push(GraphNode::new(name));
        }
        graph
    }

    /// Registers a node under its name and every alias.
    pub fn add_node(&mut self, name: &str, aliases: &[&str]) -> Result<(), WorkflowError> {
        for key in std::iter::once(&name).chain(aliases) {
            if self.index.contains_key(*key) {
                return Err(WorkflowError::Configuration(format!(
                    "Can not create node '{}', node with this name already exists",
                    key
                )));
            }
        }

        let position = self.nodes.len();
        self.nodes.push(GraphNode::new(name));
        for key in std::iter::once(&name).chain(aliases) {
            self.index.insert(NodeName::new(*key), position);
        }
        Ok(())
    }
}

impl<C> Graph<C> {
    /// The traversal entry node.
    pub fn start(&self) -> &GraphNode<C> {
        &self.nodes[0]
    }

    pub fn node_mut(&mut self, name: &str) -> Option<&mut GraphNode<C>> {
        let position = *self.index.get(name)?;
        self.nodes.get_mut(position)
    }

    /// Nodes in registration order, aliases excluded.
    pub fn nodes(&self) -> impl Iterator<Item = &GraphNode<C>> {
        self.nodes.iter()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Checks that every edge target exists and that every non-terminal node
    /// has at least one outgoing edge. All violations are reported together.
    pub fn validate(&self) -> Result<(), WorkflowError> {
        let mut errors: Vec<String> = Vec::new();
        let mut report = |message: String| {
            if !errors.contains(&message) {
                errors.push(message);
            }
        };

        for node in &self.nodes {
            for edge in node.edges() {
                if !self.contains(edge.target().as_str()) {
                    report(format!(
                        "Node '{}' references unknown node '{}'",
                        node.name(),
                        edge.target()
                    ));
                }
            }
        }
        for node in &self.nodes {
            if !node.role().is_terminal() && node.edges().is_empty() {
                report(format!(
                    "Node '{}' is not connected with any other node.",
                    node.name()
                ));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(WorkflowError::Configuration(errors.join("\n")))
        }
    }
}

impl<C> NodeResolver<C> for Graph<C> {
    fn resolve(&self, name: &str) -> Option<&GraphNode<C>> {
        self.index
            .get(name)
            .and_then(|&position| self.nodes.get(position))
    }
}

impl<C> fmt::Debug for Graph<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Graph").field("nodes", &self.nodes).finish()
    }
}
