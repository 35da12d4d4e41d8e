//! Node names and the reserved node roles.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of a node in a workflow graph.
///
/// Three names are reserved: [`NodeName::START`], [`NodeName::END`] and
/// [`NodeName::FAIL`]. See [`NodeRole`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeName(String);

impl NodeName {
    /// Entry node of every traversal started by `run`.
    pub const START: &'static str = "start";
    /// Success terminal.
    pub const END: &'static str = "end";
    /// Failure terminal.
    pub const FAIL: &'static str = "fail";

    /// Creates a new NodeName.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the node name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the role implied by this name.
    pub fn role(&self) -> NodeRole {
        NodeRole::of(&self.0)
    }
}

impl fmt::Display for NodeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for NodeName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for NodeName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for NodeName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::borrow::Borrow<str> for NodeName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for NodeName {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for NodeName {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Role of a node, derived from its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeRole {
    /// The `start` node.
    Start,
    /// The `end` node. Finishing here with `Succeeded` completes the run.
    End,
    /// The `fail` node. Finishing here fails the run.
    Fail,
    /// Any other node.
    Activity,
}

impl NodeRole {
    /// Classifies a node name.
    pub fn of(name: &str) -> Self {
        match name {
            NodeName::START => NodeRole::Start,
            NodeName::END => NodeRole::End,
            NodeName::FAIL => NodeRole::Fail,
            _ => NodeRole::Activity,
        }
    }

    /// `end` and `fail` may have no outgoing edges.
    pub fn is_terminal(self) -> bool {
        matches!(self, NodeRole::End | NodeRole::Fail)
    }
}
