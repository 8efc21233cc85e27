//! Task execution for asynchronous deliveries.
//!
//! Pipes never own threads. They hand each asynchronous delivery to an
//! [`Executor`] as a [`Job`]; the manager owns the executor and decides when
//! it shuts down.

pub mod worker_pool;

use std::fmt;

pub use worker_pool::WorkerPool;

use crate::domain::Interrupt;
use crate::error::PipeError;

/// One unit of asynchronous work. The executor passes the [`Interrupt`]
/// tied to its own shutdown.
pub type Job = Box<dyn FnOnce(&Interrupt) + Send + 'static>;

/// Accepts independent jobs for concurrent execution and supports forceful
/// cancellation of everything outstanding.
pub trait Executor: Send + Sync + fmt::Debug {
    /// Name used in logs and errors.
    fn name(&self) -> &str;

    /// Schedules `job` without waiting for it to run.
    ///
    /// # Errors
    ///
    /// Returns [`PipeError::ExecutorShutdown`] once [`Executor::shutdown_now`]
    /// has been called.
    fn submit(&self, job: Job) -> Result<(), PipeError>;

    /// Interrupts running jobs, drops queued ones and rejects new ones.
    /// Returns without waiting for running jobs to finish.
    fn shutdown_now(&self);

    /// Returns `true` once [`Executor::shutdown_now`] has been called.
    fn is_shutdown(&self) -> bool;

    /// Number of jobs currently running.
    fn active_jobs(&self) -> usize {
        0
    }
}
