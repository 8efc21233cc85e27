//! Pipe manager configuration loaded from environment variables.
//!
//! Follows 12-factor style: all settings come from environment variables
//! (or a `.env` file via `dotenvy`). Missing or unparseable values fall back
//! to defaults; values that parse but make no sense are rejected.

use std::time::Duration;

use crate::error::PipeError;

/// Reserved name of the default pipe.
pub const DEFAULT_PIPE_NAME: &str = "DEFAULT_CONTEXT";

/// Configuration for a [`crate::service::PipeManager`] and its worker pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipesConfig {
    /// Manager instance name, used in logs and worker thread names.
    pub instance_name: String,

    /// Name under which the default pipe is registered.
    pub default_pipe: String,

    /// Core runtime threads. These only drive timers; listener deliveries
    /// run on the elastic blocking pool.
    pub worker_threads: usize,

    /// Upper bound on concurrently running asynchronous deliveries.
    pub max_threads: usize,

    /// Milliseconds an idle delivery thread is kept before it exits.
    pub thread_keep_alive_ms: u64,

    /// Minimum duration in seconds of one throughput probe batch.
    pub probe_seconds: u64,
}

impl PipesConfig {
    /// Loads configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns [`PipeError::InvalidConfig`] if a value is out of range.
    pub fn from_env() -> Result<Self, PipeError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns [`PipeError::InvalidConfig`] if a value is out of range.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, PipeError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let config = Self {
            instance_name: lookup("EVENT_PIPES_INSTANCE_NAME").unwrap_or(defaults.instance_name),
            default_pipe: lookup("EVENT_PIPES_DEFAULT_PIPE").unwrap_or(defaults.default_pipe),
            worker_threads: parse(&lookup, "EVENT_PIPES_WORKER_THREADS", defaults.worker_threads),
            max_threads: parse(&lookup, "EVENT_PIPES_MAX_THREADS", defaults.max_threads),
            thread_keep_alive_ms: parse(
                &lookup,
                "EVENT_PIPES_THREAD_KEEP_ALIVE_MS",
                defaults.thread_keep_alive_ms,
            ),
            probe_seconds: parse(&lookup, "EVENT_PIPES_PROBE_SECONDS", defaults.probe_seconds),
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks that every value is usable.
    ///
    /// # Errors
    ///
    /// Returns [`PipeError::InvalidConfig`] naming the first bad value.
    pub fn validate(&self) -> Result<(), PipeError> {
        if self.default_pipe.is_empty() {
            return Err(PipeError::InvalidConfig(
                "default pipe name must not be empty".to_string(),
            ));
        }
        if self.worker_threads == 0 {
            return Err(PipeError::InvalidConfig(
                "worker_threads must be at least 1".to_string(),
            ));
        }
        if self.max_threads == 0 {
            return Err(PipeError::InvalidConfig(
                "max_threads must be at least 1".to_string(),
            ));
        }
        if self.thread_keep_alive_ms == 0 {
            return Err(PipeError::InvalidConfig(
                "thread_keep_alive_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Idle delivery thread lifetime as a [`Duration`].
    #[must_use]
    pub const fn thread_keep_alive(&self) -> Duration {
        Duration::from_millis(self.thread_keep_alive_ms)
    }

    /// Returns a copy with a different instance name.
    #[must_use]
    pub fn with_instance_name(mut self, name: impl Into<String>) -> Self {
        self.instance_name = name.into();
        self
    }
}

impl Default for PipesConfig {
    fn default() -> Self {
        let thread = std::thread::current();
        Self {
            instance_name: format!("EVENTMGR-{}", thread.name().unwrap_or("unnamed")),
            default_pipe: DEFAULT_PIPE_NAME.to_string(),
            worker_threads: 1,
            max_threads: 512,
            thread_keep_alive_ms: 60_000,
            probe_seconds: 1,
        }
    }
}

/// Parses a looked-up value as `T`, returning `default` on missing or
/// invalid values.
fn parse<T, F>(lookup: &F, key: &str, default: T) -> T
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
