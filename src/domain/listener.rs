//! Listener capability and its delivery tag.
//!
//! A [`Listener`] declares once, through [`Listener::delivery`], whether it
//! runs on the triggering thread or on the shared worker pool. Asynchronous
//! listeners receive an [`Interrupt`] that fires when the owning manager
//! shuts down; long-running listeners are expected to poll it.

use std::fmt;
use std::time::{Duration, Instant};

use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;

/// Polling granularity of [`Interrupt::sleep`] when no runtime is attached.
const INTERRUPT_POLL: Duration = Duration::from_millis(10);

/// How a listener is invoked when an event is triggered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Delivery {
    /// Invoked on the triggering thread, in registration order, before
    /// `trigger` returns.
    #[default]
    Synchronous,
    /// Submitted to the shared worker pool; `trigger` does not wait.
    Asynchronous,
}

/// Receiver of events triggered on a pipe.
///
/// Errors returned from [`Listener::receive`] belong to the listener: the
/// pipe logs them and keeps delivering to the remaining listeners.
pub trait Listener<E>: Send + Sync {
    /// Delivery mode of this listener. Read when the listener is registered
    /// and removed, so it must not change over the listener's lifetime.
    fn delivery(&self) -> Delivery {
        Delivery::Synchronous
    }

    /// Handles one event.
    ///
    /// # Errors
    ///
    /// Any error is logged by the pipe and otherwise dropped.
    fn receive(&self, event: &E, interrupt: &Interrupt) -> anyhow::Result<()>;
}

/// Adapts a closure into a [`Listener`].
pub struct FnListener<F> {
    delivery: Delivery,
    handler: F,
}

impl<F> FnListener<F> {
    /// Wraps `handler` with an explicit delivery mode.
    #[must_use]
    pub const fn new(delivery: Delivery, handler: F) -> Self {
        Self { delivery, handler }
    }

    /// Wraps `handler` as a synchronous listener.
    #[must_use]
    pub const fn synchronous(handler: F) -> Self {
        Self::new(Delivery::Synchronous, handler)
    }

    /// Wraps `handler` as an asynchronous listener.
    #[must_use]
    pub const fn asynchronous(handler: F) -> Self {
        Self::new(Delivery::Asynchronous, handler)
    }
}

impl<E, F> Listener<E> for FnListener<F>
where
    F: Fn(&E, &Interrupt) -> anyhow::Result<()> + Send + Sync,
{
    fn delivery(&self) -> Delivery {
        self.delivery
    }

    fn receive(&self, event: &E, interrupt: &Interrupt) -> anyhow::Result<()> {
        (self.handler)(event, interrupt)
    }
}

impl<F> fmt::Debug for FnListener<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnListener")
            .field("delivery", &self.delivery)
            .finish_non_exhaustive()
    }
}

/// Returned by [`Interrupt::sleep`] when the wait was cut short.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("delivery interrupted")]
pub struct Interrupted;

/// Cooperative cancellation handle passed to every delivery.
///
/// Wraps a [`CancellationToken`]. Asynchronous deliveries get a token that
/// is cancelled when their executor shuts down; synchronous deliveries get
/// [`Interrupt::never`].
#[derive(Debug, Clone)]
pub struct Interrupt {
    token: CancellationToken,
    handle: Option<Handle>,
}

impl Interrupt {
    /// Creates an interrupt driven by `token`.
    #[must_use]
    pub fn new(token: CancellationToken) -> Self {
        Self {
            token,
            handle: None,
        }
    }

    /// Creates an interrupt whose waits are driven by the runtime behind
    /// `handle`. Only valid for code running outside that runtime's async
    /// context (e.g. inside `spawn_blocking`).
    pub(crate) fn with_handle(token: CancellationToken, handle: Handle) -> Self {
        Self {
            token,
            handle: Some(handle),
        }
    }

    /// An interrupt that never fires.
    #[must_use]
    pub fn never() -> Self {
        Self::new(CancellationToken::new())
    }

    /// Returns `true` once cancellation has been requested.
    #[must_use]
    pub fn is_interrupted(&self) -> bool {
        self.token.is_cancelled()
    }

    /// The underlying token, for listeners that hand work to async code.
    #[must_use]
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Blocks the current thread for `duration` or until interrupted,
    /// whichever comes first.
    ///
    /// # Errors
    ///
    /// Returns [`Interrupted`] if cancellation was requested before or
    /// during the wait.
    pub fn sleep(&self, duration: Duration) -> Result<(), Interrupted> {
        if self.is_interrupted() {
            return Err(Interrupted);
        }

        match &self.handle {
            Some(handle) => {
                let token = self.token.clone();
                handle.block_on(async move {
                    tokio::select! {
                        biased;
                        () = token.cancelled() => Err(Interrupted),
                        () = tokio::time::sleep(duration) => Ok(()),
                    }
                })
            }
            None => self.poll_sleep(duration),
        }
    }

    fn poll_sleep(&self, duration: Duration) -> Result<(), Interrupted> {
        let deadline = Instant::now() + duration;
        loop {
            if self.is_interrupted() {
                return Err(Interrupted);
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(());
            }
            std::thread::sleep(remaining.min(INTERRUPT_POLL));
        }
    }
}

impl Default for Interrupt {
    fn default() -> Self {
        Self::never()
    }
}
