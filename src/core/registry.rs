//! Name-keyed registry of job factories.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use super::job::{BoxedJob, JobFactory};

/// Maps job names to the factories that build them.
///
/// Reads and writes go through one `RwLock`. Entries are never removed;
/// registering a name twice replaces the earlier factory.
pub struct JobRegistry<C, T> {
    factories: RwLock<HashMap<String, JobFactory<C, T>>>,
}

impl<C, T> JobRegistry<C, T> {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            factories: RwLock::new(HashMap::new()),
        }
    }

    /// Store `factory` under `name`, returning `true` if an earlier factory
    /// was replaced.
    pub fn register<F>(&self, name: impl Into<String>, factory: F) -> bool
    where
        F: Fn(C) -> BoxedJob<T> + Send + Sync + 'static,
    {
        self.insert(name, Arc::new(factory))
    }

    /// Store an already shared factory under `name`, returning `true` if an
    /// earlier factory was replaced.
    pub fn insert(&self, name: impl Into<String>, factory: JobFactory<C, T>) -> bool {
        self.factories.write().insert(name.into(), factory).is_some()
    }

    /// Look up the factory registered under `name`.
    ///
    /// The returned handle is cloned out so the lock is not held while the
    /// factory runs.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<JobFactory<C, T>> {
        self.factories.read().get(name).cloned()
    }

    /// Whether a factory is registered under `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.factories.read().contains_key(name)
    }

    /// Registered names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.read().keys().cloned().collect();
        names.sort_unstable();
        names
    }

    /// Number of registered factories.
    #[must_use]
    pub fn len(&self) -> usize {
        self.factories.read().len()
    }

    /// Whether nothing has been registered yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.factories.read().is_empty()
    }
}

impl<C, T> Default for JobRegistry<C, T> {
    fn default() -> Self {
        Self::new()
    }
}
