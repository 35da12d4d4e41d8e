//! Activity slots.
//!
//! A slot binds a node to an activity: it knows how to select the activity
//! input from the workflow context, how to obtain an instance from the
//! [`ActivityFactory`], and where the produced outputs go.

use async_trait::async_trait;
use hataori_core::{
    Activity, ActivityError, ActivityFactory, ActivityInstance, ActivityOutput, ActivityResult,
    InputProvider, OutputProvider, OutputSink, Uuid,
};
use serde_json::Value;
use std::fmt;
use std::marker::PhantomData;

/// Result of a slot operation: the activity result and the last output value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SlotOutcome {
    pub result: ActivityResult,
    pub output: Option<Value>,
}

impl SlotOutcome {
    pub fn new(result: ActivityResult, output: Option<Value>) -> Self {
        Self { result, output }
    }

    pub fn succeeded(output: Option<Value>) -> Self {
        Self::new(ActivityResult::Succeeded, output)
    }
}

/// The per-node wrapper around an activity.
#[async_trait]
pub trait Slot<C>: Send + Sync {
    /// Activity type name, used for observers, logs and diagrams.
    fn activity_type(&self) -> &str;

    /// Runs the activity.
    ///
    /// A non-null value from `input_provider` replaces the slot's own input
    /// selector. `before_execute` receives the observable input right before
    /// the activity runs, or a diagnostic string if the input could not be
    /// obtained (the error is then returned).
    async fn execute(
        &self,
        execution_id: Uuid,
        factory: &dyn ActivityFactory,
        context: &mut C,
        input_provider: Option<&dyn InputProvider>,
        before_execute: &(dyn Fn(Option<Value>) + Send + Sync),
    ) -> Result<SlotOutcome, ActivityError>;

    /// Resumes a suspended activity with a caller-chosen payload.
    async fn resume(
        &self,
        execution_id: Uuid,
        factory: &dyn ActivityFactory,
        context: &mut C,
        closure: &Value,
    ) -> Result<SlotOutcome, ActivityError>;

    /// Completes the node without running the activity, taking its output
    /// from `output_provider`.
    async fn complete(
        &self,
        execution_id: Uuid,
        factory: &dyn ActivityFactory,
        context: &mut C,
        output_provider: &dyn OutputProvider,
    ) -> Result<SlotOutcome, ActivityError>;
}

/// Slot of nodes without an activity. Succeeds with no output.
#[derive(Debug, Clone)]
pub struct EmptySlot {
    activity_type: String,
}

impl EmptySlot {
    pub fn new(activity_type: impl Into<String>) -> Self {
        Self {
            activity_type: activity_type.into(),
        }
    }
}

#[async_trait]
impl<C: Send + Sync> Slot<C> for EmptySlot {
    fn activity_type(&self) -> &str {
        &self.activity_type
    }

    async fn execute(
        &self,
        _execution_id: Uuid,
        _factory: &dyn ActivityFactory,
        _context: &mut C,
        _input_provider: Option<&dyn InputProvider>,
        before_execute: &(dyn Fn(Option<Value>) + Send + Sync),
    ) -> Result<SlotOutcome, ActivityError> {
        before_execute(None);
        Ok(SlotOutcome::succeeded(None))
    }

    async fn resume(
        &self,
        _execution_id: Uuid,
        _factory: &dyn ActivityFactory,
        _context: &mut C,
        _closure: &Value,
    ) -> Result<SlotOutcome, ActivityError> {
        Ok(SlotOutcome::succeeded(None))
    }

    async fn complete(
        &self,
        _execution_id: Uuid,
        _factory: &dyn ActivityFactory,
        _context: &mut C,
        _output_provider: &dyn OutputProvider,
    ) -> Result<SlotOutcome, ActivityError> {
        Ok(SlotOutcome::succeeded(None))
    }
}

type InputSelector<C, I> = Box<dyn Fn(&C) -> Result<I, ActivityError> + Send + Sync>;
type OutputProcessor<C, O> = Box<dyn Fn(&mut C, O) + Send + Sync>;

/// A slot running activity `A`.
///
/// # Examples
///
/// ```
/// use hataori::{ActivitySlot, DelegateActivity};
///
/// #[derive(Debug, Default)]
/// struct Order {
///     lines: Vec<String>,
///     summary: String,
/// }
///
/// type Summarize = DelegateActivity<Vec<String>, String>;
///
/// let slot = ActivitySlot::<Order, Summarize>::new("Summarize", |order| order.lines.clone())
///     .process_output(|order, summary| order.summary = summary);
/// ```
pub struct ActivitySlot<C, A: Activity> {
    activity_type: String,
    select_input: InputSelector<C, A::Input>,
    process_output: OutputProcessor<C, A::Output>,
    process_fail_output: OutputProcessor<C, A::FailOutput>,
    _activity: PhantomData<fn() -> A>,
}

impl<C, A> ActivitySlot<C, A>
where
    C: Send + Sync + 'static,
    A: Activity,
{
    /// Creates a slot for `activity_type`, reading its input with `select_input`.
    pub fn new<F>(activity_type: impl Into<String>, select_input: F) -> Self
    where
        F: Fn(&C) -> A::Input + Send + Sync + 'static,
    {
        Self::try_new(activity_type, move |context| Ok(select_input(context)))
    }

    /// Like [`new`](ActivitySlot::new), for input selectors that can fail.
    pub fn try_new<F>(activity_type: impl Into<String>, select_input: F) -> Self
    where
        F: Fn(&C) -> Result<A::Input, ActivityError> + Send + Sync + 'static,
    {
        Self {
            activity_type: activity_type.into(),
            select_input: Box::new(select_input),
            process_output: Box::new(|_: &mut C, _: A::Output| {}),
            process_fail_output: Box::new(|_: &mut C, _: A::FailOutput| {}),
            _activity: PhantomData,
        }
    }

    /// Creates a slot whose activity takes its default input.
    pub fn without_input(activity_type: impl Into<String>) -> Self
    where
        A::Input: Default,
    {
        Self::new(activity_type, |_| A::Input::default())
    }

    /// Sets what happens with success outputs.
    pub fn process_output<F>(mut self, process_output: F) -> Self
    where
        F: Fn(&mut C, A::Output) + Send + Sync + 'static,
    {
        self.process_output = Box::new(process_output);
        self
    }

    /// Sets what happens with fail outputs.
    pub fn process_fail_output<F>(mut self, process_fail_output: F) -> Self
    where
        F: Fn(&mut C, A::FailOutput) + Send + Sync + 'static,
    {
        self.process_fail_output = Box::new(process_fail_output);
        self
    }

    fn prepare_input(
        &self,
        activity: &A,
        context: &C,
        input_provider: Option<&dyn InputProvider>,
    ) -> Result<(A::Input, Option<Value>), ActivityError> {
        let provided = input_provider
            .and_then(|provider| provider.input())
            .filter(|value| !value.is_null());
        let input = match provided {
            Some(value) => serde_json::from_value(value).map_err(|e| {
                ActivityError::input(format!(
                    "provided input does not fit activity '{}': {}",
                    self.activity_type, e
                ))
            })?,
            None => (self.select_input)(context)?,
        };

        let observed = if activity.is_input_serializable() {
            Some(serde_json::to_value(&input)?)
        } else {
            None
        };
        Ok((input, observed))
    }

    /// Feeds every recorded output to its processor and returns the last one.
    fn route(
        &self,
        context: &mut C,
        sink: OutputSink<A::Output, A::FailOutput>,
    ) -> Result<Option<Value>, ActivityError> {
        let mut reported = None;
        for produced in sink.into_outputs() {
            let value = match produced {
                ActivityOutput::Success(output) => {
                    let value = serde_json::to_value(&output)?;
                    (self.process_output)(context, output);
                    value
                }
                ActivityOutput::Fail(output) => {
                    let value = serde_json::to_value(&output)?;
                    (self.process_fail_output)(context, output);
                    value
                }
            };
            reported = Some(value);
        }
        Ok(reported)
    }
}

impl<C, A: Activity> fmt::Debug for ActivitySlot<C, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActivitySlot")
            .field("activity_type", &self.activity_type)
            .finish()
    }
}

#[async_trait]
impl<C, A> Slot<C> for ActivitySlot<C, A>
where
    C: Send + Sync + 'static,
    A: Activity,
{
    fn activity_type(&self) -> &str {
        &self.activity_type
    }

    async fn execute(
        &self,
        execution_id: Uuid,
        factory: &dyn ActivityFactory,
        context: &mut C,
        input_provider: Option<&dyn InputProvider>,
        before_execute: &(dyn Fn(Option<Value>) + Send + Sync),
    ) -> Result<SlotOutcome, ActivityError> {
        let lease = Lease::<A>::acquire(factory, &self.activity_type)?;
        let activity = lease.activity()?;

        let input = match self.prepare_input(activity, context, input_provider) {
            Ok((input, observed)) => {
                before_execute(observed);
                input
            }
            Err(error) => {
                before_execute(Some(Value::String(format!(
                    "Failed to get activity input: {error}"
                ))));
                return Err(error);
            }
        };

        let mut sink = OutputSink::new();
        let result = activity.execute(execution_id, input, &mut sink).await?;
        let output = self.route(context, sink)?;
        Ok(SlotOutcome::new(result, output))
    }

    async fn resume(
        &self,
        execution_id: Uuid,
        factory: &dyn ActivityFactory,
        context: &mut C,
        closure: &Value,
    ) -> Result<SlotOutcome, ActivityError> {
        let lease = Lease::<A>::acquire(factory, &self.activity_type)?;
        let activity = lease.activity()?;

        let mut sink = OutputSink::new();
        let result = activity.resume(execution_id, &mut sink, closure).await?;
        let output = self.route(context, sink)?;
        Ok(SlotOutcome::new(result, output))
    }

    async fn complete(
        &self,
        _execution_id: Uuid,
        _factory: &dyn ActivityFactory,
        context: &mut C,
        output_provider: &dyn OutputProvider,
    ) -> Result<SlotOutcome, ActivityError> {
        let value = output_provider.output().unwrap_or(Value::Null);
        let output: A::Output = serde_json::from_value(value.clone()).map_err(|e| {
            if value.is_null() {
                ActivityError::Output(format!(
                    "activity '{}' requires an output but none was provided",
                    self.activity_type
                ))
            } else {
                ActivityError::Output(e.to_string())
            }
        })?;
        (self.process_output)(context, output);
        Ok(SlotOutcome::succeeded(Some(value)))
    }
}

/// An activity instance on loan from a factory, handed back on drop.
struct Lease<'a, A> {
    factory: &'a dyn ActivityFactory,
    activity_type: &'a str,
    instance: Option<ActivityInstance>,
    _activity: PhantomData<fn() -> A>,
}

impl<'a, A: Activity> Lease<'a, A> {
    fn acquire(factory: &'a dyn ActivityFactory, activity_type: &'a str) -> Result<Self, ActivityError> {
        let instance = factory.create(activity_type)?;
        let lease = Self {
            factory,
            activity_type,
            instance: Some(instance),
            _activity: PhantomData,
        };
        lease.activity()?;
        Ok(lease)
    }

    fn activity(&self) -> Result<&A, ActivityError> {
        self.instance
            .as_ref()
            .and_then(|instance| instance.downcast_ref::<A>())
            .ok_or_else(|| ActivityError::UnexpectedInstance(self.activity_type.to_string()))
    }
}

impl<A> Drop for Lease<'_, A> {
    fn drop(&mut self) {
        if let Some(instance) = self.instance.take() {
            self.factory.release(self.activity_type, instance);
        }
    }
}
