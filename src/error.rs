//! Error types for pipes, executors and configuration.
//!
//! [`PipeError`] is the central error type for the crate. Listener faults are
//! deliberately not part of it: a failing listener is logged and counted by
//! the pipe, never surfaced to the code that triggered the event.

/// Crate-wide error enum.
#[derive(Debug, thiserror::Error)]
pub enum PipeError {
    /// The executor no longer accepts work (shut down or dropped).
    #[error("executor {executor} is shut down")]
    ExecutorShutdown {
        /// Name of the executor that rejected the submission.
        executor: String,
    },

    /// The worker runtime backing an executor could not be started.
    #[error("failed to start worker pool: {0}")]
    ExecutorBuild(#[from] std::io::Error),

    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl PipeError {
    /// Returns `true` if the error was caused by submitting work to an
    /// executor that has been shut down.
    #[must_use]
    pub const fn is_shutdown(&self) -> bool {
        matches!(self, Self::ExecutorShutdown { .. })
    }
}
