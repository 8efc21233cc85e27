//! # event-pipes
//!
//! Named in-process event pipes that decouple producers from listeners.
//!
//! Callers obtain a pipe from a [`PipeManager`] (by name, the default pipe,
//! or a freshly named unique pipe), register listeners on it and trigger
//! events. Each listener declares whether it runs synchronously on the
//! triggering thread or asynchronously on the manager's shared worker pool.
//!
//! ## Architecture
//!
//! ```text
//! Producers
//!     │  trigger(event)
//!     ├── EventPipe (domain/)
//!     │     ├── asynchronous listeners ──► Executor / WorkerPool (executor/)
//!     │     └── synchronous listeners  ──► caller's thread
//!     │
//!     ├── PipeRegistry (domain/)   name → pipe
//!     └── PipeManager (service/)   owns registry + pool, shutdown
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use event_pipes::{FnListener, Interrupt, PipeManager};
//!
//! # fn main() -> Result<(), event_pipes::PipeError> {
//! let manager = PipeManager::<String>::new()?;
//! let pipe = manager.get_default_pipe();
//! pipe.listen(Arc::new(FnListener::synchronous(
//!     |event: &String, _: &Interrupt| -> anyhow::Result<()> {
//!         println!("got {event}");
//!         Ok(())
//!     },
//! )));
//! pipe.trigger("hello".to_string());
//! manager.shutdown()?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod domain;
pub mod error;
pub mod executor;
pub mod service;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::PipesConfig;
pub use domain::{
    Delivery, DispatchReport, Event, EventPipe, FnListener, Interrupt, Interrupted, Listener,
    PipeName, PipeRegistry, Signal,
};
pub use error::PipeError;
pub use executor::{Executor, Job, WorkerPool};
pub use service::PipeManager;
