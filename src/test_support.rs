//! Helpers shared by unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use crate::domain::{Delivery, Interrupt, Listener};

/// Polls `condition` until it holds or `timeout` elapses.
pub(crate) fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    condition()
}

/// Listener that counts every event it receives.
#[derive(Debug, Default)]
pub(crate) struct Counter {
    delivery: Delivery,
    hits: AtomicUsize,
}

impl Counter {
    pub(crate) fn synchronous() -> Self {
        Self::default()
    }

    pub(crate) fn asynchronous() -> Self {
        Self {
            delivery: Delivery::Asynchronous,
            hits: AtomicUsize::new(0),
        }
    }

    pub(crate) fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

impl<E> Listener<E> for Counter {
    fn delivery(&self) -> Delivery {
        self.delivery
    }

    fn receive(&self, _event: &E, _interrupt: &Interrupt) -> anyhow::Result<()> {
        self.hits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
