//! Elastic worker pool backed by a dedicated tokio runtime.
//!
//! Listener code is blocking, so every job runs through
//! [`Handle::spawn_blocking`]. The blocking pool spawns threads on demand up
//! to `max_threads` and retires them after `thread_keep_alive` of idleness.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::runtime::{Handle, Runtime};
use tokio_util::sync::CancellationToken;

use super::{Executor, Job};
use crate::config::PipesConfig;
use crate::domain::Interrupt;
use crate::error::PipeError;

/// Default [`Executor`] used by [`crate::service::PipeManager`].
///
/// # Shutdown
///
/// [`Executor::shutdown_now`] cancels the pool's token. Running jobs see it
/// through their [`Interrupt`], queued jobs are skipped when they reach a
/// thread, and new submissions are rejected. The runtime itself is torn down
/// in the background when the pool is dropped.
#[derive(Debug)]
pub struct WorkerPool {
    name: String,
    runtime: Option<Runtime>,
    handle: Handle,
    cancel: CancellationToken,
    active: Arc<AtomicUsize>,
}

impl WorkerPool {
    /// Starts a pool sized by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`PipeError::InvalidConfig`] if `config` fails validation and
    /// [`PipeError::ExecutorBuild`] if the runtime cannot start.
    pub fn new(config: &PipesConfig) -> Result<Self, PipeError> {
        config.validate()?;
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(config.worker_threads)
            .max_blocking_threads(config.max_threads)
            .thread_keep_alive(config.thread_keep_alive())
            .thread_name(format!("{}-worker", config.instance_name))
            .enable_all()
            .build()?;
        let handle = runtime.handle().clone();

        tracing::debug!(
            executor = %config.instance_name,
            max_threads = config.max_threads,
            "worker pool started"
        );

        Ok(Self {
            name: config.instance_name.clone(),
            runtime: Some(runtime),
            handle,
            cancel: CancellationToken::new(),
            active: Arc::new(AtomicUsize::new(0)),
        })
    }
}

impl Executor for WorkerPool {
    fn name(&self) -> &str {
        &self.name
    }

    fn submit(&self, job: Job) -> Result<(), PipeError> {
        if self.is_shutdown() {
            return Err(PipeError::ExecutorShutdown {
                executor: self.name.clone(),
            });
        }

        let interrupt = Interrupt::with_handle(self.cancel.clone(), self.handle.clone());
        let active = Arc::clone(&self.active);
        drop(self.handle.spawn_blocking(move || {
            if interrupt.is_interrupted() {
                tracing::trace!("skipping queued job after shutdown");
                return;
            }
            let _guard = ActiveGuard::enter(&active);
            job(&interrupt);
        }));
        Ok(())
    }

    fn shutdown_now(&self) {
        if !self.cancel.is_cancelled() {
            tracing::debug!(
                executor = %self.name,
                active = self.active_jobs(),
                "worker pool shutting down"
            );
        }
        self.cancel.cancel();
    }

    fn is_shutdown(&self) -> bool {
        self.cancel.is_cancelled()
    }

    fn active_jobs(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.cancel.cancel();
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

/// Counts a job as active for as long as it is alive.
struct ActiveGuard(Arc<AtomicUsize>);

impl ActiveGuard {
    fn enter(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(counter))
    }
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}
