//! Domain layer: events, listeners, pipes and the pipe table.
//!
//! This module contains the delivery model: the listener capability and its
//! synchronous/asynchronous tag, pipe names, the [`EventPipe`] that fans
//! events out, and the [`PipeRegistry`] that maps names to pipes.

pub mod event;
pub mod listener;
pub mod pipe;
pub mod pipe_name;
pub mod pipe_registry;

pub use event::{Event, Signal};
pub use listener::{Delivery, FnListener, Interrupt, Interrupted, Listener};
pub use pipe::{DispatchReport, EventPipe};
pub use pipe_name::PipeName;
pub use pipe_registry::PipeRegistry;
