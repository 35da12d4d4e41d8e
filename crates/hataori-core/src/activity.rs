//! Activity trait and related types.

use crate::error::ActivityError;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

/// Outcome of running, resuming or completing an activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ActivityResult {
    /// No definitive outcome. The engine treats this as corruption.
    #[default]
    None,
    /// The activity finished successfully.
    Succeeded,
    /// The activity finished with a failure.
    Failed,
    /// The activity is still running elsewhere; the workflow suspends.
    Pending,
}

impl fmt::Display for ActivityResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActivityResult::None => write!(f, "None"),
            ActivityResult::Succeeded => write!(f, "Succeeded"),
            ActivityResult::Failed => write!(f, "Failed"),
            ActivityResult::Pending => write!(f, "Pending"),
        }
    }
}

/// A value produced by an activity.
#[derive(Debug, Clone, PartialEq)]
pub enum ActivityOutput<O, F> {
    /// Routed to the slot's output processor.
    Success(O),
    /// Routed to the slot's fail-output processor.
    Fail(F),
}

/// Collects the values an activity produces.
///
/// Every recorded value is routed to the owning slot's processors in the
/// order it was recorded.
#[derive(Debug)]
pub struct OutputSink<O, F> {
    produced: Vec<ActivityOutput<O, F>>,
}

impl<O, F> Default for OutputSink<O, F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<O, F> OutputSink<O, F> {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self {
            produced: Vec::new(),
        }
    }

    /// Records a success output.
    pub fn success(&mut self, output: O) {
        self.produced.push(ActivityOutput::Success(output));
    }

    /// Records a fail output.
    pub fn fail(&mut self, output: F) {
        self.produced.push(ActivityOutput::Fail(output));
    }

    /// Returns `true` if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.produced.is_empty()
    }

    /// Consumes the sink, returning the recorded values in order.
    pub fn into_outputs(self) -> Vec<ActivityOutput<O, F>> {
        self.produced
    }
}

/// A unit of work bound to a graph node.
///
/// # Examples
///
/// ```
/// use hataori_core::{Activity, ActivityError, ActivityResult, OutputSink, Uuid};
/// use async_trait::async_trait;
///
/// #[derive(Debug)]
/// struct Shout;
///
/// #[async_trait]
/// impl Activity for Shout {
///     type Input = String;
///     type Output = String;
///     type FailOutput = String;
///
///     async fn execute(
///         &self,
///         _execution_id: Uuid,
///         input: String,
///         sink: &mut OutputSink<String, String>,
///     ) -> Result<ActivityResult, ActivityError> {
///         sink.success(input.to_uppercase());
///         Ok(ActivityResult::Succeeded)
///     }
/// }
/// ```
#[async_trait]
pub trait Activity: Send + Sync + 'static {
    /// Input selected from the workflow context (or supplied on resume).
    type Input: Serialize + DeserializeOwned + Send + 'static;
    /// Success output.
    type Output: Serialize + DeserializeOwned + Send + 'static;
    /// Failure output.
    type FailOutput: Serialize + Send + 'static;

    /// Runs the activity.
    ///
    /// Return [`ActivityResult::Pending`] to suspend the workflow until it is
    /// resumed with the same `execution_id`.
    async fn execute(
        &self,
        execution_id: Uuid,
        input: Self::Input,
        sink: &mut OutputSink<Self::Output, Self::FailOutput>,
    ) -> Result<ActivityResult, ActivityError>;

    /// Continues a suspended activity.
    ///
    /// `closure` is whatever the caller handed to `resume`; its meaning is up
    /// to the activity. The default rejects resumption.
    async fn resume(
        &self,
        _execution_id: Uuid,
        _sink: &mut OutputSink<Self::Output, Self::FailOutput>,
        _closure: &Value,
    ) -> Result<ActivityResult, ActivityError> {
        Err(ActivityError::Unsupported("resume"))
    }

    /// Whether the input may be handed to observers.
    fn is_input_serializable(&self) -> bool {
        true
    }
}
