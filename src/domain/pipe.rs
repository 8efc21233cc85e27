//! Event pipe: listener sets plus fan-out.
//!
//! An [`EventPipe`] keeps synchronous and asynchronous listeners in two
//! separately locked lists. [`EventPipe::trigger`] first hands one job per
//! asynchronous listener to the executor, then walks the synchronous list on
//! the calling thread.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use serde::Serialize;

use super::{Delivery, Event, Interrupt, Listener, PipeName};
use crate::executor::{Executor, Job};

type ListenerSet<E> = Mutex<Vec<Arc<dyn Listener<E>>>>;

/// Counts produced by one [`EventPipe::trigger`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    /// Asynchronous deliveries accepted by the executor.
    pub scheduled: usize,
    /// Asynchronous deliveries the executor refused.
    pub rejected: usize,
    /// Synchronous deliveries that returned `Ok`.
    pub delivered: usize,
    /// Synchronous deliveries that returned an error or panicked.
    pub failed: usize,
}

impl DispatchReport {
    /// Total number of listeners the trigger reached or tried to reach.
    #[must_use]
    pub const fn listeners(&self) -> usize {
        self.scheduled + self.rejected + self.delivered + self.failed
    }
}

/// Named set of listeners sharing one executor.
///
/// The pipe holds only a [`Weak`] reference to its executor; the manager that
/// created it owns the executor. Once the executor is shut down or dropped,
/// asynchronous deliveries are rejected while synchronous ones keep working.
///
/// # Concurrency
///
/// `listen`, `unlisten` and `trigger` may be called from any thread at any
/// time. No lock is held while a listener runs, so listeners may register
/// or remove listeners on their own pipe. A synchronous listener removed
/// while a trigger is walking the list may cause one neighbour to be skipped
/// for that trigger; the walk always runs to the end of the list.
pub struct EventPipe<E> {
    name: PipeName,
    synchronous: ListenerSet<E>,
    asynchronous: ListenerSet<E>,
    executor: Weak<dyn Executor>,
    never: Interrupt,
}

impl<E: Event> EventPipe<E> {
    /// Creates an empty pipe that schedules asynchronous work on `executor`.
    #[must_use]
    pub fn new(name: impl Into<PipeName>, executor: Weak<dyn Executor>) -> Self {
        Self {
            name: name.into(),
            synchronous: Mutex::new(Vec::new()),
            asynchronous: Mutex::new(Vec::new()),
            executor,
            never: Interrupt::never(),
        }
    }

    /// Name the pipe was created under.
    #[must_use]
    pub fn name(&self) -> &PipeName {
        &self.name
    }

    /// Registers `listener` in the set matching its [`Delivery`].
    ///
    /// Registering the same listener twice makes it receive every event
    /// twice.
    pub fn listen(&self, listener: Arc<dyn Listener<E>>) {
        let delivery = listener.delivery();
        lock(self.set(delivery)).push(listener);
        tracing::debug!(pipe = %self.name, ?delivery, "listener registered");
    }

    /// Removes one registration of `listener`.
    ///
    /// Listeners are matched by `Arc` identity. Returns `false` if the
    /// listener was not registered.
    pub fn unlisten<L>(&self, listener: &Arc<L>) -> bool
    where
        L: Listener<E> + ?Sized,
    {
        let target = Arc::as_ptr(listener).cast::<()>();
        let mut set = lock(self.set(listener.delivery()));
        let Some(index) = set
            .iter()
            .position(|registered| Arc::as_ptr(registered).cast::<()>() == target)
        else {
            return false;
        };
        set.remove(index);
        true
    }

    /// Delivers `event` to every registered listener.
    ///
    /// Asynchronous listeners are scheduled first and may still be running
    /// when this returns. Synchronous listeners run on this thread in
    /// registration order. Listener errors, listener panics and executor
    /// rejections are logged and counted in the returned report; none of
    /// them stop delivery to the other listeners.
    pub fn trigger(&self, event: E) -> DispatchReport {
        let event = Arc::new(event);
        let mut report = DispatchReport::default();
        self.schedule_asynchronous(&event, &mut report);
        self.deliver_synchronous(&event, &mut report);
        report
    }

    /// Number of registrations across both sets.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.synchronous_count() + self.asynchronous_count()
    }

    /// Number of synchronous registrations.
    #[must_use]
    pub fn synchronous_count(&self) -> usize {
        lock(&self.synchronous).len()
    }

    /// Number of asynchronous registrations.
    #[must_use]
    pub fn asynchronous_count(&self) -> usize {
        lock(&self.asynchronous).len()
    }

    /// Returns `true` if no listener is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.listener_count() == 0
    }

    fn set(&self, delivery: Delivery) -> &ListenerSet<E> {
        match delivery {
            Delivery::Synchronous => &self.synchronous,
            Delivery::Asynchronous => &self.asynchronous,
        }
    }

    fn synchronous_at(&self, index: usize) -> Option<Arc<dyn Listener<E>>> {
        lock(&self.synchronous).get(index).map(Arc::clone)
    }

    fn schedule_asynchronous(&self, event: &Arc<E>, report: &mut DispatchReport) {
        let listeners = lock(&self.asynchronous).clone();
        if listeners.is_empty() {
            return;
        }

        let Some(executor) = self.executor.upgrade() else {
            report.rejected += listeners.len();
            tracing::warn!(
                pipe = %self.name,
                listeners = listeners.len(),
                "executor dropped, asynchronous deliveries rejected"
            );
            return;
        };

        for listener in listeners {
            let event = Arc::clone(event);
            let pipe = self.name.clone();
            let job: Job = Box::new(move |interrupt| {
                let _ = deliver(&pipe, listener.as_ref(), &event, interrupt);
            });
            match executor.submit(job) {
                Ok(()) => report.scheduled += 1,
                Err(err) => {
                    report.rejected += 1;
                    tracing::warn!(
                        pipe = %self.name,
                        error = %err,
                        "asynchronous delivery rejected"
                    );
                }
            }
        }
    }

    fn deliver_synchronous(&self, event: &E, report: &mut DispatchReport) {
        let mut index = 0;
        // Re-read the list on every step: it may shrink or grow while a
        // listener runs.
        loop {
            let Some(listener) = self.synchronous_at(index) else {
                break;
            };
            index += 1;
            if deliver(&self.name, listener.as_ref(), event, &self.never) {
                report.delivered += 1;
            } else {
                report.failed += 1;
            }
        }
    }
}

impl<E> fmt::Debug for EventPipe<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventPipe")
            .field("name", &self.name)
            .field("synchronous", &lock(&self.synchronous).len())
            .field("asynchronous", &lock(&self.asynchronous).len())
            .finish_non_exhaustive()
    }
}

/// Runs one delivery, isolating errors and panics. Returns `true` on success.
fn deliver<E>(
    pipe: &PipeName,
    listener: &dyn Listener<E>,
    event: &E,
    interrupt: &Interrupt,
) -> bool {
    match panic::catch_unwind(AssertUnwindSafe(|| listener.receive(event, interrupt))) {
        Ok(Ok(())) => true,
        Ok(Err(err)) => {
            tracing::warn!(pipe = %pipe, error = %err, "listener failed");
            false
        }
        Err(payload) => {
            tracing::error!(pipe = %pipe, panic = panic_message(&*payload), "listener panicked");
            false
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
