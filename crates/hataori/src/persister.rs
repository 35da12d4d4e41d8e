//! Bundled [`WorkflowPersister`] implementations.

use async_trait::async_trait;
use hataori_core::{Execution, PersistError, WorkflowPersister};
use std::collections::HashMap;
use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

type KeyFn<C> = Box<dyn Fn(&C) -> String + Send + Sync>;

/// Keeps executions in memory, keyed by a function of the context.
pub struct InMemoryPersister<C> {
    key: KeyFn<C>,
    executions: Mutex<HashMap<String, Execution>>,
}

impl<C> InMemoryPersister<C> {
    pub fn new<F>(key: F) -> Self
    where
        F: Fn(&C) -> String + Send + Sync + 'static,
    {
        Self {
            key: Box::new(key),
            executions: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the execution stored under `key`, if any.
    pub async fn get(&self, key: &str) -> Option<Execution> {
        self.executions.lock().await.get(key).cloned()
    }

    pub async fn len(&self) -> usize {
        self.executions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.executions.lock().await.is_empty()
    }
}

impl<C> fmt::Debug for InMemoryPersister<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryPersister").finish_non_exhaustive()
    }
}

#[async_trait]
impl<C: Send + Sync> WorkflowPersister<C> for InMemoryPersister<C> {
    async fn save(&self, context: &C, execution: &Execution) -> Result<(), PersistError> {
        let key = (self.key)(context);
        self.executions.lock().await.insert(key, execution.clone());
        Ok(())
    }

    async fn load(&self, context: &C) -> Result<Execution, PersistError> {
        let key = (self.key)(context);
        self.executions
            .lock()
            .await
            .get(&key)
            .cloned()
            .ok_or(PersistError::NotFound(key))
    }
}

/// Stores each execution as a pretty-printed JSON file `<dir>/<key>.json`.
///
/// The directory is created on first save.
pub struct JsonFilePersister<C> {
    dir: PathBuf,
    key: KeyFn<C>,
}

impl<C> JsonFilePersister<C> {
    pub fn new<F>(dir: impl Into<PathBuf>, key: F) -> Self
    where
        F: Fn(&C) -> String + Send + Sync + 'static,
    {
        Self {
            dir: dir.into(),
            key: Box::new(key),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, context: &C) -> (String, PathBuf) {
        let key = (self.key)(context);
        let path = self.dir.join(format!("{key}.json"));
        (key, path)
    }
}

impl<C> fmt::Debug for JsonFilePersister<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonFilePersister")
            .field("dir", &self.dir)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<C: Send + Sync> WorkflowPersister<C> for JsonFilePersister<C> {
    async fn save(&self, context: &C, execution: &Execution) -> Result<(), PersistError> {
        let (_, path) = self.path_for(context);
        let json = serde_json::to_vec_pretty(execution)?;
        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(&path, json).await?;
        Ok(())
    }

    async fn load(&self, context: &C) -> Result<Execution, PersistError> {
        let (key, path) = self.path_for(context);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(PersistError::NotFound(key)),
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_slice(&bytes)?)
    }
}
