//! event-pipes throughput probe.
//!
//! Registers a counting listener on the default pipe, triggers in doubling
//! batches until one batch takes at least the configured probe time, and
//! reports synchronous events per second.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc;
use std::time::{Duration, Instant};

use anyhow::{Context, bail};
use tracing_subscriber::EnvFilter;

use event_pipes::{FnListener, Interrupt, PipeManager, PipesConfig, Signal};

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = PipesConfig::from_env()?;
    let probe = Duration::from_secs(config.probe_seconds);
    tracing::info!(manager = %config.instance_name, "starting event-pipes probe");

    let manager = PipeManager::<Signal>::with_config(config)?;
    let pipe = manager.get_default_pipe();

    let received = Arc::new(AtomicU64::new(0));
    let counter = Arc::clone(&received);
    pipe.listen(Arc::new(FnListener::synchronous(
        move |_: &Signal, _: &Interrupt| -> anyhow::Result<()> {
            counter.fetch_add(1, Ordering::Relaxed);
            Ok(())
        },
    )));

    let mut batch: u64 = 1_000;
    let elapsed = loop {
        received.store(0, Ordering::Relaxed);
        let started = Instant::now();
        for _ in 0..batch {
            pipe.trigger(Signal);
        }
        let elapsed = started.elapsed();
        if elapsed >= probe {
            break elapsed;
        }
        batch = batch.saturating_mul(2);
    };

    let delivered = received.load(Ordering::Relaxed);
    if delivered != batch {
        bail!("lost synchronous events: triggered {batch}, received {delivered}");
    }
    let rate = batch as f64 / elapsed.as_secs_f64();
    tracing::info!(
        events = batch,
        seconds = elapsed.as_secs_f64(),
        per_second = rate.round(),
        "synchronous throughput"
    );

    // One asynchronous round trip through the worker pool.
    let (tx, rx) = mpsc::channel();
    pipe.listen(Arc::new(FnListener::asynchronous(
        move |_: &Signal, _: &Interrupt| -> anyhow::Result<()> {
            tx.send(Instant::now())?;
            Ok(())
        },
    )));
    let triggered = Instant::now();
    let report = pipe.trigger(Signal);
    let arrived = rx
        .recv_timeout(Duration::from_secs(5))
        .context("asynchronous delivery did not arrive")?;
    tracing::info!(
        scheduled = report.scheduled,
        latency_us = arrived.duration_since(triggered).as_micros(),
        "asynchronous delivery"
    );

    manager.shutdown()?;
    Ok(())
}
