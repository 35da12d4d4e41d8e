//! Activity creation.

use crate::activity::Activity;
use crate::error::ActivityError;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;

/// A type-erased activity instance handed out by an [`ActivityFactory`].
pub type ActivityInstance = Box<dyn Any + Send + Sync>;

/// Creates and releases activity instances.
///
/// Every activity invocation creates a fresh instance and releases it once
/// the invocation is over, whatever the outcome.
pub trait ActivityFactory: Send + Sync {
    /// Creates an instance of the given activity type.
    fn create(&self, activity_type: &str) -> Result<ActivityInstance, ActivityError>;

    /// Takes back an instance created by [`create`](ActivityFactory::create).
    fn release(&self, _activity_type: &str, _instance: ActivityInstance) {}
}

type Constructor = Box<dyn Fn() -> ActivityInstance + Send + Sync>;

/// An [`ActivityFactory`] backed by explicitly registered constructors.
///
/// # Examples
///
/// ```
/// use hataori_core::{ActivityFactory, ActivityRegistry, DelegateActivity};
///
/// let registry = ActivityRegistry::new().with("Trim", || {
///     DelegateActivity::new(|input: String| Ok::<_, String>(input.trim().to_string()))
/// });
///
/// assert!(registry.contains("Trim"));
/// assert!(registry.create("Trim").is_ok());
/// assert!(registry.create("Unknown").is_err());
/// ```
#[derive(Default)]
pub struct ActivityRegistry {
    constructors: HashMap<String, Constructor>,
}

impl fmt::Debug for ActivityRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActivityRegistry")
            .field("activity_types", &self.constructors.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ActivityRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            constructors: HashMap::new(),
        }
    }

    /// Registers a constructor for an activity type, replacing any previous one.
    pub fn register<A, F>(&mut self, activity_type: impl Into<String>, constructor: F) -> &mut Self
    where
        A: Activity,
        F: Fn() -> A + Send + Sync + 'static,
    {
        self.constructors.insert(
            activity_type.into(),
            Box::new(move || Box::new(constructor()) as ActivityInstance),
        );
        self
    }

    /// Builder-style variant of [`register`](ActivityRegistry::register).
    pub fn with<A, F>(mut self, activity_type: impl Into<String>, constructor: F) -> Self
    where
        A: Activity,
        F: Fn() -> A + Send + Sync + 'static,
    {
        self.register(activity_type, constructor);
        self
    }

    /// Registers an activity type constructed through `Default`.
    pub fn with_default<A>(self, activity_type: impl Into<String>) -> Self
    where
        A: Activity + Default,
    {
        self.with(activity_type, A::default)
    }

    /// Returns `true` if a constructor exists for the activity type.
    pub fn contains(&self, activity_type: &str) -> bool {
        self.constructors.contains_key(activity_type)
    }

    /// Returns the number of registered activity types.
    pub fn len(&self) -> usize {
        self.constructors.len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.constructors.is_empty()
    }
}

impl ActivityFactory for ActivityRegistry {
    fn create(&self, activity_type: &str) -> Result<ActivityInstance, ActivityError> {
        self.constructors
            .get(activity_type)
            .map(|constructor| constructor())
            .ok_or_else(|| ActivityError::NotRegistered(activity_type.to_string()))
    }
}
