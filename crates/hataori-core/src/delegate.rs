//! An activity that wraps a plain function.

use crate::activity::{Activity, ActivityResult, OutputSink};
use crate::error::ActivityError;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

type DelegateFn<I, O> = Arc<dyn Fn(I) -> Result<O, String> + Send + Sync>;

/// Runs a function as an activity.
///
/// `Ok` succeeds with the returned value; `Err` fails with the error message
/// as fail output.
pub struct DelegateActivity<I, O> {
    method: DelegateFn<I, O>,
    input_serializable: bool,
}

impl<I: 'static, O: 'static> DelegateActivity<I, O> {
    /// Wraps `method`.
    pub fn new<F, E>(method: F) -> Self
    where
        F: Fn(I) -> Result<O, E> + Send + Sync + 'static,
        E: fmt::Display,
    {
        Self {
            method: Arc::new(move |input: I| method(input).map_err(|e| e.to_string())),
            input_serializable: true,
        }
    }

    /// Hides the input from observers.
    pub fn with_input_serializable(mut self, input_serializable: bool) -> Self {
        self.input_serializable = input_serializable;
        self
    }
}

impl<I, O> Clone for DelegateActivity<I, O> {
    fn clone(&self) -> Self {
        Self {
            method: Arc::clone(&self.method),
            input_serializable: self.input_serializable,
        }
    }
}

impl<I, O> fmt::Debug for DelegateActivity<I, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DelegateActivity")
            .field("input_serializable", &self.input_serializable)
            .finish()
    }
}

#[async_trait]
impl<I, O> Activity for DelegateActivity<I, O>
where
    I: Serialize + DeserializeOwned + Send + 'static,
    O: Serialize + DeserializeOwned + Send + 'static,
{
    type Input = I;
    type Output = O;
    type FailOutput = String;

    async fn execute(
        &self,
        _execution_id: Uuid,
        input: I,
        sink: &mut OutputSink<O, String>,
    ) -> Result<ActivityResult, ActivityError> {
        match (self.method)(input) {
            Ok(output) => {
                sink.success(output);
                Ok(ActivityResult::Succeeded)
            }
            Err(message) => {
                sink.fail(message);
                Ok(ActivityResult::Failed)
            }
        }
    }

    fn is_input_serializable(&self) -> bool {
        self.input_serializable
    }
}
