//! Pipe manager: owns the worker pool and the named pipes.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::config::PipesConfig;
use crate::domain::{Event, EventPipe, PipeName, PipeRegistry};
use crate::error::PipeError;
use crate::executor::{Executor, WorkerPool};

/// Entry point for obtaining pipes.
///
/// Every pipe handed out by one manager schedules its asynchronous
/// deliveries on the manager's [`WorkerPool`]. Pipes only hold a weak
/// reference to that pool, so the manager alone decides when it stops.
///
/// # Shutdown
///
/// [`PipeManager::shutdown`] cancels the pool, forgets every pipe and starts
/// a fresh pool. Pipes obtained before the call still work as listener
/// containers, but their asynchronous deliveries are rejected and they are
/// no longer reachable by name.
pub struct PipeManager<E> {
    config: PipesConfig,
    state: RwLock<State<E>>,
}

struct State<E> {
    executor: Arc<dyn Executor>,
    pipes: PipeRegistry<E>,
}

impl<E: Event> PipeManager<E> {
    /// Creates a manager with default configuration.
    ///
    /// # Errors
    ///
    /// Returns [`PipeError::ExecutorBuild`] if the worker pool cannot start.
    pub fn new() -> Result<Self, PipeError> {
        Self::with_config(PipesConfig::default())
    }

    /// Creates a manager with default configuration and the given instance
    /// name.
    ///
    /// # Errors
    ///
    /// Returns [`PipeError::ExecutorBuild`] if the worker pool cannot start.
    pub fn with_name(name: impl Into<String>) -> Result<Self, PipeError> {
        Self::with_config(PipesConfig::default().with_instance_name(name))
    }

    /// Creates a manager from explicit configuration.
    ///
    /// # Errors
    ///
    /// Returns [`PipeError::InvalidConfig`] if `config` does not validate,
    /// or [`PipeError::ExecutorBuild`] if the worker pool cannot start.
    pub fn with_config(config: PipesConfig) -> Result<Self, PipeError> {
        config.validate()?;
        let executor = start_pool(&config)?;
        tracing::debug!(manager = %config.instance_name, "pipe manager created");
        Ok(Self {
            config,
            state: RwLock::new(State {
                executor,
                pipes: PipeRegistry::new(),
            }),
        })
    }

    /// Name given at construction, used for logging.
    #[must_use]
    pub fn instance_name(&self) -> &str {
        &self.config.instance_name
    }

    /// Configuration this manager was built from.
    #[must_use]
    pub fn config(&self) -> &PipesConfig {
        &self.config
    }

    /// Reserved name of the default pipe.
    #[must_use]
    pub fn default_pipe_name(&self) -> &str {
        &self.config.default_pipe
    }

    /// Returns the pipe named `name`, creating an empty one if needed.
    ///
    /// Concurrent first-time calls with the same name all receive the same
    /// pipe.
    pub fn get_pipe(&self, name: &str) -> Arc<EventPipe<E>> {
        let state = read(&self.state);
        let executor = Arc::downgrade(&state.executor);
        state.pipes.get_or_create(name, |name| {
            tracing::debug!(manager = %self.config.instance_name, pipe = %name, "pipe created");
            EventPipe::new(name, executor)
        })
    }

    /// Returns the default pipe.
    pub fn get_default_pipe(&self) -> Arc<EventPipe<E>> {
        self.get_pipe(&self.config.default_pipe)
    }

    /// Creates a pipe under a fresh name derived from `owner`. Every call
    /// returns a different pipe.
    pub fn get_unique_pipe(&self, owner: &str) -> Arc<EventPipe<E>> {
        self.get_pipe(PipeName::unique(owner).as_str())
    }

    /// Returns `true` if a pipe named `name` is registered.
    #[must_use]
    pub fn contains_pipe(&self, name: &str) -> bool {
        read(&self.state).pipes.contains(name)
    }

    /// Names of all registered pipes, sorted.
    #[must_use]
    pub fn pipe_names(&self) -> Vec<PipeName> {
        read(&self.state).pipes.names()
    }

    /// Number of registered pipes.
    #[must_use]
    pub fn pipe_count(&self) -> usize {
        read(&self.state).pipes.len()
    }

    /// Forgets the pipe named `name`. Holders of the pipe keep a working
    /// listener container; later lookups create a new pipe.
    pub fn remove_pipe(&self, name: &str) -> bool {
        read(&self.state).pipes.remove(name).is_some()
    }

    /// Asynchronous deliveries currently running on the pool.
    #[must_use]
    pub fn active_deliveries(&self) -> usize {
        read(&self.state).executor.active_jobs()
    }

    /// Cancels all asynchronous work and discards every pipe.
    ///
    /// Running asynchronous listeners observe their
    /// [`crate::domain::Interrupt`]; queued deliveries never start. Does not
    /// wait for running listeners to return. A new pool is started so the
    /// manager can keep handing out pipes.
    ///
    /// # Errors
    ///
    /// Returns [`PipeError::ExecutorBuild`] if the replacement pool cannot
    /// start. Cancellation has already happened in that case, and pipes
    /// created afterwards reject asynchronous deliveries.
    pub fn shutdown(&self) -> Result<(), PipeError> {
        let mut state = write(&self.state);
        state.executor.shutdown_now();
        let discarded = state.pipes.len();
        state.pipes = PipeRegistry::new();
        tracing::info!(
            manager = %self.config.instance_name,
            pipes = discarded,
            "pipe manager shut down"
        );

        state.executor = start_pool(&self.config)?;
        Ok(())
    }
}

impl<E> fmt::Debug for PipeManager<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = read(&self.state);
        f.debug_struct("PipeManager")
            .field("instance_name", &self.config.instance_name)
            .field("executor", &state.executor.name())
            .field("pipes", &state.pipes)
            .finish()
    }
}

fn start_pool(config: &PipesConfig) -> Result<Arc<dyn Executor>, PipeError> {
    Ok(Arc::new(WorkerPool::new(config)?))
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}
