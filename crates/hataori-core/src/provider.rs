//! Externally supplied activity inputs and outputs, used when resuming.

use serde_json::Value;

/// Supplies the input for a node re-entered with `resume_from`.
///
/// `None` (or JSON `null`) means "no override": the node's own input
/// selector is used instead. Closures returning `Option<Value>` implement
/// this trait.
pub trait InputProvider: Send + Sync {
    /// Returns the input to run the node with.
    fn input(&self) -> Option<Value>;
}

/// Supplies the output for a node completed out of band with `resume_after`.
pub trait OutputProvider: Send + Sync {
    /// Returns the output the node is deemed to have produced.
    ///
    /// `None` is handed to the slot as JSON `null`. That only works for
    /// activities whose output type accepts `null` (such as `Option<T>` or
    /// `()`); any other output type fails the node with
    /// [`ActivityError::Output`](crate::ActivityError::Output).
    fn output(&self) -> Option<Value>;
}

impl<F> InputProvider for F
where
    F: Fn() -> Option<Value> + Send + Sync,
{
    fn input(&self) -> Option<Value> {
        self()
    }
}

impl<F> OutputProvider for F
where
    F: Fn() -> Option<Value> + Send + Sync,
{
    fn output(&self) -> Option<Value> {
        self()
    }
}

/// A fixed input value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LiteralInput(pub Option<Value>);

impl InputProvider for LiteralInput {
    fn input(&self) -> Option<Value> {
        self.0.clone()
    }
}

/// A fixed output value.
#[derive(Debug, Clone, PartialEq)]
pub struct LiteralOutput(pub Value);

impl OutputProvider for LiteralOutput {
    fn output(&self) -> Option<Value> {
        Some(self.0.clone())
    }
}
