//! End-to-end behaviour of managers and pipes.

#![allow(clippy::panic)]

use std::sync::{Arc, mpsc};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use event_pipes::{
    Delivery, FnListener, Interrupt, Listener, PipeManager, PipeName, PipesConfig, Signal,
};

fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    condition()
}

fn manager<E: event_pipes::Event>() -> PipeManager<E> {
    let Ok(manager) = PipeManager::new() else {
        panic!("manager should start");
    };
    manager
}

#[derive(Debug, Default)]
struct Tally(AtomicUsize);

impl Listener<Signal> for Tally {
    fn receive(&self, _event: &Signal, _interrupt: &Interrupt) -> anyhow::Result<()> {
        self.0.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[test]
fn default_pipe_counts_then_stops_after_unlisten() {
    let manager = manager::<Signal>();
    let listener = Arc::new(Tally::default());
    manager
        .get_default_pipe()
        .listen(Arc::clone(&listener) as Arc<dyn Listener<Signal>>);

    for _ in 0..3 {
        manager.get_default_pipe().trigger(Signal);
    }
    assert_eq!(listener.0.load(Ordering::SeqCst), 3);

    assert!(manager.get_default_pipe().unlisten(&listener));
    manager.get_default_pipe().trigger(Signal);
    assert_eq!(listener.0.load(Ordering::SeqCst), 3);
}

#[test]
fn shutdown_interrupts_looping_asynchronous_listeners() {
    let manager = manager::<Signal>();
    let interrupted = Arc::new(AtomicUsize::new(0));

    let seen = Arc::clone(&interrupted);
    manager
        .get_default_pipe()
        .listen(Arc::new(FnListener::asynchronous(
            move |_: &Signal, interrupt: &Interrupt| -> anyhow::Result<()> {
                while !interrupt.is_interrupted() {
                    if interrupt.sleep(Duration::from_secs(1)).is_err() {
                        break;
                    }
                }
                seen.fetch_add(1, Ordering::SeqCst);
                Ok(())
            },
        )));

    let deliveries = 10;
    for _ in 0..deliveries {
        let report = manager.get_default_pipe().trigger(Signal);
        assert_eq!(report.scheduled, 1);
    }
    assert!(wait_until(Duration::from_secs(5), || {
        manager.active_deliveries() == deliveries
    }));
    assert_eq!(interrupted.load(Ordering::SeqCst), 0);

    assert!(manager.shutdown().is_ok());

    assert!(wait_until(Duration::from_secs(2), || {
        interrupted.load(Ordering::SeqCst) == deliveries
    }));
    assert_eq!(manager.pipe_count(), 0);
}

#[test]
fn previously_used_name_yields_new_pipe_after_shutdown() {
    let manager = manager::<Signal>();
    let before = manager.get_pipe("orders");
    before.listen(Arc::new(Tally::default()));

    assert!(manager.shutdown().is_ok());

    let after = manager.get_pipe("orders");
    assert!(!Arc::ptr_eq(&before, &after));
    assert!(after.is_empty());
    assert_eq!(before.listener_count(), 1);
}

#[test]
fn mixed_delivery_reaches_both_listeners() {
    let manager = manager::<u64>();
    let pipe = manager.get_unique_pipe("mixed");
    let total = Arc::new(AtomicU64::new(0));

    for delivery in [Delivery::Synchronous, Delivery::Asynchronous] {
        let total = Arc::clone(&total);
        pipe.listen(Arc::new(FnListener::new(
            delivery,
            move |value: &u64, _: &Interrupt| -> anyhow::Result<()> {
                total.fetch_add(*value, Ordering::SeqCst);
                Ok(())
            },
        )));
    }

    let report = pipe.trigger(21);
    assert_eq!(report.delivered, 1);
    assert_eq!(report.scheduled, 1);
    assert!(wait_until(Duration::from_secs(5), || {
        total.load(Ordering::SeqCst) == 42
    }));
}

#[test]
fn unique_pipes_do_not_share_listeners() {
    let manager = manager::<Signal>();
    let first = manager.get_unique_pipe("worker");
    let second = manager.get_unique_pipe("worker");
    let listener = Arc::new(Tally::default());
    first.listen(Arc::clone(&listener) as Arc<dyn Listener<Signal>>);

    second.trigger(Signal);
    assert_eq!(listener.0.load(Ordering::SeqCst), 0);
    first.trigger(Signal);
    assert_eq!(listener.0.load(Ordering::SeqCst), 1);

    let names = manager.pipe_names();
    assert_eq!(names.len(), 2);
    assert!(names.iter().all(|name: &PipeName| name.as_str().starts_with("worker-")));
}

#[test]
fn sustained_synchronous_triggers_are_not_lost() {
    let manager = manager::<Signal>();
    let pipe = manager.get_pipe("throughput");
    let listener = Arc::new(Tally::default());
    pipe.listen(Arc::clone(&listener) as Arc<dyn Listener<Signal>>);

    let mut triggers = 0usize;
    let started = Instant::now();
    while started.elapsed() < Duration::from_millis(250) {
        for _ in 0..1_000 {
            pipe.trigger(Signal);
        }
        triggers += 1_000;
    }
    assert_eq!(listener.0.load(Ordering::SeqCst), triggers);
}

#[test]
fn concurrent_producers_deliver_every_event() {
    let manager = Arc::new(manager::<Signal>());
    let listener = Arc::new(Tally::default());
    manager
        .get_pipe("shared")
        .listen(Arc::clone(&listener) as Arc<dyn Listener<Signal>>);

    let mut producers = Vec::new();
    for _ in 0..4 {
        let manager = Arc::clone(&manager);
        producers.push(std::thread::spawn(move || {
            for _ in 0..2_500 {
                manager.get_pipe("shared").trigger(Signal);
            }
        }));
    }
    for producer in producers {
        assert!(producer.join().is_ok());
    }

    assert_eq!(listener.0.load(Ordering::SeqCst), 10_000);
}

#[test]
fn custom_default_pipe_name_from_config() {
    let config = PipesConfig {
        default_pipe: "main".to_string(),
        ..PipesConfig::default()
    };
    let Ok(manager) = PipeManager::<Signal>::with_config(config) else {
        panic!("manager should start");
    };
    let default = manager.get_default_pipe();
    assert_eq!(default.name().as_str(), "main");
    assert!(Arc::ptr_eq(&default, &manager.get_pipe("main")));
}

#[test]
fn failing_asynchronous_listeners_do_not_starve_siblings() {
    let manager = manager::<Signal>();
    let pipe = manager.get_pipe("faulty");
    let hits = Arc::new(AtomicUsize::new(0));

    pipe.listen(Arc::new(FnListener::asynchronous(
        |_: &Signal, _: &Interrupt| -> anyhow::Result<()> { panic!("listener blew up") },
    )));
    pipe.listen(Arc::new(FnListener::asynchronous(
        |_: &Signal, _: &Interrupt| -> anyhow::Result<()> {
            Err(anyhow::anyhow!("broken listener"))
        },
    )));
    let seen = Arc::clone(&hits);
    pipe.listen(Arc::new(FnListener::asynchronous(
        move |_: &Signal, _: &Interrupt| -> anyhow::Result<()> {
            seen.fetch_add(1, Ordering::SeqCst);
            Ok(())
        },
    )));

    let triggers = 5;
    for _ in 0..triggers {
        let report = pipe.trigger(Signal);
        assert_eq!(report.scheduled, 3);
        assert_eq!(report.rejected, 0);
    }

    assert!(wait_until(Duration::from_secs(5), || {
        hits.load(Ordering::SeqCst) == triggers
    }));
    assert!(wait_until(Duration::from_secs(5), || {
        manager.active_deliveries() == 0
    }));
}

#[test]
fn delivery_token_is_cancelled_by_shutdown() {
    let manager = manager::<Signal>();
    let (tx, rx) = mpsc::channel();

    manager
        .get_default_pipe()
        .listen(Arc::new(FnListener::asynchronous(
            move |_: &Signal, interrupt: &Interrupt| -> anyhow::Result<()> {
                tx.send(interrupt.token().clone())?;
                Ok(())
            },
        )));
    manager.get_default_pipe().trigger(Signal);

    let Ok(token) = rx.recv_timeout(Duration::from_secs(5)) else {
        panic!("asynchronous delivery did not arrive");
    };
    assert!(!token.is_cancelled());

    assert!(manager.shutdown().is_ok());
    assert!(token.is_cancelled());
}
