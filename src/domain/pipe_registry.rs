//! Concurrent name → pipe table.
//!
//! [`PipeRegistry`] stores pipes in a [`DashMap`]. Creation goes through the
//! map's entry API, so the constructor runs under the shard lock and at most
//! one pipe is ever built for a given name.

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;

use super::{Event, EventPipe, PipeName};

/// Table of named pipes.
///
/// # Concurrency
///
/// - Lookups of different names proceed in parallel.
/// - Concurrent first-time requests for one name resolve to a single pipe.
pub struct PipeRegistry<E> {
    pipes: DashMap<PipeName, Arc<EventPipe<E>>>,
}

impl<E: Event> PipeRegistry<E> {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            pipes: DashMap::new(),
        }
    }

    /// Returns the pipe registered under `name`, building it with `create`
    /// if absent. `create` runs at most once per name.
    pub fn get_or_create<F>(&self, name: &str, create: F) -> Arc<EventPipe<E>>
    where
        F: FnOnce(PipeName) -> EventPipe<E>,
    {
        if let Some(pipe) = self.pipes.get(name) {
            return Arc::clone(pipe.value());
        }

        let name = PipeName::from(name);
        let entry = self
            .pipes
            .entry(name.clone())
            .or_insert_with(|| Arc::new(create(name)));
        Arc::clone(entry.value())
    }

    /// Returns the pipe registered under `name`, if any.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<EventPipe<E>>> {
        self.pipes.get(name).map(|pipe| Arc::clone(pipe.value()))
    }

    /// Removes the pipe registered under `name`, returning it.
    pub fn remove(&self, name: &str) -> Option<Arc<EventPipe<E>>> {
        self.pipes.remove(name).map(|(_, pipe)| pipe)
    }

    /// Returns `true` if a pipe is registered under `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.pipes.contains_key(name)
    }

    /// Names of all registered pipes, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<PipeName> {
        let mut names: Vec<PipeName> = self.pipes.iter().map(|entry| entry.key().clone()).collect();
        names.sort();
        names
    }

    /// Returns the number of registered pipes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pipes.len()
    }

    /// Returns `true` if no pipe is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pipes.is_empty()
    }
}

impl<E: Event> Default for PipeRegistry<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for PipeRegistry<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipeRegistry")
            .field("pipes", &self.pipes.len())
            .finish()
    }
}
