//! Service layer: the pipe manager.

pub mod pipe_manager;

pub use pipe_manager::PipeManager;
