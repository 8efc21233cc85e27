//! Event payload bound.
//!
//! Pipes impose no structure on events: any `Send + Sync + 'static` value
//! can be triggered. [`Signal`] is provided for pipes that only need to say
//! "something happened".

/// Marker bound for values that can travel through an
/// [`super::EventPipe`].
///
/// Implemented for every type that can be shared with delivery threads.
pub trait Event: Send + Sync + 'static {}

impl<T: Send + Sync + 'static> Event for T {}

/// Event without a payload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Signal;
