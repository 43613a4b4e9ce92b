//! # Example: async_worker
//!
//! Runs async code inside a hosted service and drives it from code instead
//! of the OS: a [`ManualAdapter`] delivers Start, Pause, Continue and Stop,
//! and a custom subscriber counts stop events.
//!
//! ## Flow
//! ```text
//! main()
//!   ├─► HostRunner::run(service, ManualAdapter)      (spawned)
//!   ├─► handle.send(Start)   ─► worker: ctx.block_on(async loop)
//!   │                               select! { tick, signal.cancelled() }
//!   ├─► handle.send(Pause)   ─► on_pause()   ─► Paused
//!   ├─► handle.send(Continue)─► on_continue()─► Running
//!   ├─► handle.send(Stop)    ─► signal ─► async loop ends ─► Graceful
//!   └─► RunReport { cause: Requested(Stop), outcome: Graceful(Cancelled) }
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example async_worker
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use servicevisor::{
    ControlRequest, Event, EventKind, HostRunner, LogWriter, ManualAdapter, Service, ServiceError,
    ServiceHostingSettings, Subscribe, WorkerContext, entry,
};

struct Ticker {
    paused: AtomicBool,
}

impl Service for Ticker {
    fn main_loop(&self, ctx: &WorkerContext) -> Result<(), ServiceError> {
        let signal = ctx.signal().clone();
        ctx.block_on(async {
            let mut tick = tokio::time::interval(Duration::from_millis(200));
            loop {
                tokio::select! {
                    _ = signal.cancelled() => break,
                    _ = tick.tick() => {
                        if !self.paused.load(Ordering::Acquire) {
                            println!("[ticker] tick");
                        }
                    }
                }
            }
        });
        Ok(())
    }

    fn on_pause(&self) -> Result<(), ServiceError> {
        self.paused.store(true, Ordering::Release);
        Ok(())
    }

    fn on_continue(&self) -> Result<(), ServiceError> {
        self.paused.store(false, Ordering::Release);
        Ok(())
    }
}

#[derive(Default)]
struct StopCounter {
    graceful: AtomicUsize,
    forced: AtomicUsize,
}

#[async_trait]
impl Subscribe for StopCounter {
    async fn on_event(&self, ev: &Event) {
        match ev.kind {
            EventKind::StoppedWithin => {
                self.graceful.fetch_add(1, Ordering::Relaxed);
            }
            EventKind::StopTimeoutExceeded => {
                self.forced.fetch_add(1, Ordering::Relaxed);
            }
            _ => {}
        }
    }

    fn name(&self) -> &'static str {
        "stop-counter"
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    entry::init_tracing("info");

    let settings = ServiceHostingSettings::new("ticker")
        .with_pause_continue(true)
        .with_shutdown_timeout(Duration::from_secs(3));

    let counter = Arc::new(StopCounter::default());
    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new()), counter.clone()];
    let host = HostRunner::builder(settings).with_subscribers(subs).build();

    let (adapter, control) = ManualAdapter::new();
    let service = Arc::new(Ticker {
        paused: AtomicBool::new(false),
    });
    let run = tokio::spawn(host.run(service, Arc::new(adapter)));

    let handle = control.handle().await.ok_or("registration rejected")?;
    handle.send(ControlRequest::Start).await?;
    tokio::time::sleep(Duration::from_secs(1)).await;

    handle.send(ControlRequest::Pause).await?;
    tokio::time::sleep(Duration::from_millis(600)).await;
    handle.send(ControlRequest::Continue).await?;
    tokio::time::sleep(Duration::from_millis(600)).await;

    let outcome = handle.send(ControlRequest::Stop).await?;
    println!("[main] stop outcome: {outcome:?}");

    let report = run.await??;
    println!(
        "[main] cause={:?} exit_code={} graceful={} forced={}",
        report.cause,
        report.exit_code(),
        counter.graceful.load(Ordering::Relaxed),
        counter.forced.load(Ordering::Relaxed),
    );
    println!("[main] statuses: {:?}", control.states());
    Ok(())
}
