//! # WorkerSupervisor: one service main loop on a dedicated thread.
//!
//! Runs exactly one [`Service::main_loop`](crate::Service::main_loop) on a
//! named OS thread and never lets it block shutdown beyond a deadline.
//!
//! ## Flow
//! ```text
//! start(service, signal)
//!   └─► thread "svc-<name>"
//!         ├─► confirm launch ───────────────────────► Launch::confirmed()
//!         ├─► catch_unwind(main_loop(ctx))
//!         ├─► classify ─► WorkerExit {Completed | Cancelled | Faulted}
//!         └─► publish WorkerExited / WorkerFaulted, store exit (watch)
//!
//! request_stop(request, timeout)
//!   ├─► signal.request(), publish StopRequested
//!   └─► timeout(wait exit)
//!         ├─ Ok  ─► publish StoppedWithin      ─► StopOutcome::Graceful(exit)
//!         └─ Err ─► detach thread,
//!                   publish StopTimeoutExceeded ─► StopOutcome::Forced
//! ```
//!
//! ## Rules
//! - Cancellation is cooperative: the thread cannot be interrupted, only abandoned.
//! - A forced stop **detaches** the thread; it may keep running until the
//!   process exits. This is a known liveness risk and is always reported.
//! - No restarts: a faulted worker stays terminal.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use tokio::runtime::Handle;
use tokio::sync::{oneshot, watch};

use crate::cancel::CancellationSignal;
use crate::core::state::ControlRequest;
use crate::error::{ControlError, ServiceError};
use crate::events::{Bus, Event, EventKind};
use crate::policies::RecoveryPolicy;
use crate::service::{ServiceRef, WorkerContext};

/// Terminal outcome of a worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerExit {
    /// The main loop returned `Ok(())` without a stop request.
    Completed,
    /// The main loop ended with an uncaught error or panic.
    Faulted(String),
    /// The main loop returned after a stop request.
    Cancelled,
}

impl WorkerExit {
    /// Short stable label for logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            WorkerExit::Completed => "completed",
            WorkerExit::Faulted(_) => "faulted",
            WorkerExit::Cancelled => "cancelled",
        }
    }

    /// True for [`WorkerExit::Faulted`].
    pub fn is_faulted(&self) -> bool {
        matches!(self, WorkerExit::Faulted(_))
    }
}

/// Result of [`WorkerSupervisor::request_stop`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopOutcome {
    /// The worker reached a terminal state before the deadline.
    Graceful(WorkerExit),
    /// The deadline elapsed; the worker thread was detached.
    Forced {
        /// The deadline that was exceeded.
        timeout: Duration,
    },
}

impl StopOutcome {
    /// True for [`StopOutcome::Graceful`].
    pub fn is_graceful(&self) -> bool {
        matches!(self, StopOutcome::Graceful(_))
    }

    /// True for [`StopOutcome::Forced`].
    pub fn is_forced(&self) -> bool {
        matches!(self, StopOutcome::Forced { .. })
    }
}

/// Launch confirmation returned by [`WorkerSupervisor::start`].
#[derive(Debug)]
pub struct Launch {
    rx: oneshot::Receiver<()>,
}

impl Launch {
    /// Resolves once the worker thread is running; `false` if it never started.
    pub async fn confirmed(self) -> bool {
        self.rx.await.is_ok()
    }
}

/// In-flight execution of a worker. Never leaves the supervisor.
struct WorkerHandle {
    started_at: Instant,
    alive: Arc<AtomicBool>,
    exit: watch::Receiver<Option<WorkerExit>>,
    signal: CancellationSignal,
    _thread: thread::JoinHandle<()>,
}

impl WorkerHandle {
    async fn wait_exit(&mut self) -> WorkerExit {
        match self.exit.wait_for(Option::is_some).await {
            Ok(exit) => exit.clone().unwrap_or(WorkerExit::Cancelled),
            Err(_) => WorkerExit::Faulted("worker vanished without reporting an exit".into()),
        }
    }

    fn terminal(&self) -> Option<WorkerExit> {
        self.exit.borrow().clone()
    }
}

/// Supervises at most one worker thread at a time.
pub struct WorkerSupervisor {
    service: Arc<str>,
    bus: Bus,
    handle: Option<WorkerHandle>,
}

impl WorkerSupervisor {
    /// Creates an idle supervisor for `service`.
    pub fn new(service: impl Into<Arc<str>>, bus: Bus) -> Self {
        Self {
            service: service.into(),
            bus,
            handle: None,
        }
    }

    /// Launches `service`'s main loop on a dedicated thread and returns immediately.
    ///
    /// Must be called from within a tokio runtime (the worker gets a handle to it).
    /// Fails if a worker is already supervised or the thread cannot be spawned.
    pub fn start(
        &mut self,
        service: ServiceRef,
        signal: CancellationSignal,
        recovery: RecoveryPolicy,
    ) -> Result<Launch, ControlError> {
        if self.handle.is_some() {
            return Err(ControlError::Spawn {
                error: "a worker is already running".into(),
            });
        }
        let runtime = Handle::try_current().map_err(|e| ControlError::Spawn {
            error: e.to_string(),
        })?;

        self.bus
            .publish(Event::new(EventKind::WorkerStarting).with_service(Arc::clone(&self.service)));

        let (launched_tx, launched_rx) = oneshot::channel();
        let (exit_tx, exit_rx) = watch::channel(None);
        let alive = Arc::new(AtomicBool::new(true));

        let ctx = WorkerContext::new(
            Arc::clone(&self.service),
            signal.clone(),
            recovery,
            self.bus.clone(),
            runtime,
        );
        let thread_alive = Arc::clone(&alive);
        let bus = self.bus.clone();
        let name = Arc::clone(&self.service);
        let started_at = Instant::now();

        let thread = thread::Builder::new()
            .name(format!("svc-{}", self.service))
            .spawn(move || {
                let _ = launched_tx.send(());
                bus.publish(Event::new(EventKind::WorkerLaunched).with_service(Arc::clone(&name)));

                let result = catch_unwind(AssertUnwindSafe(|| service.main_loop(&ctx)));
                let exit = classify(result, ctx.signal());

                thread_alive.store(false, Ordering::Release);
                publish_exit(&bus, &name, &exit, started_at.elapsed());
                exit_tx.send_replace(Some(exit));
            })
            .map_err(|e| ControlError::Spawn {
                error: e.to_string(),
            })?;

        self.handle = Some(WorkerHandle {
            started_at,
            alive,
            exit: exit_rx,
            signal,
            _thread: thread,
        });
        Ok(Launch { rx: launched_rx })
    }

    /// True while a worker is supervised (running or terminal but not yet reaped).
    pub fn has_worker(&self) -> bool {
        self.handle.is_some()
    }

    /// True while the worker's main loop has not returned.
    pub fn is_alive(&self) -> bool {
        self.handle
            .as_ref()
            .is_some_and(|h| h.alive.load(Ordering::Acquire))
    }

    /// When the current worker was started.
    pub fn started_at(&self) -> Option<Instant> {
        self.handle.as_ref().map(|h| h.started_at)
    }

    /// Resolves when the current worker reaches a terminal state.
    ///
    /// Pending forever when no worker is supervised; guard `select!` branches
    /// with [`has_worker`](Self::has_worker).
    pub async fn exited(&mut self) -> WorkerExit {
        match self.handle.as_mut() {
            Some(h) => h.wait_exit().await,
            None => std::future::pending().await,
        }
    }

    /// Releases a worker that already exited and returns its exit.
    ///
    /// Returns `None` (and keeps the handle) while the worker is still alive.
    pub fn reap(&mut self) -> Option<WorkerExit> {
        let exit = self.handle.as_ref()?.terminal()?;
        self.handle = None;
        Some(exit)
    }

    /// Requests the worker to stop and waits up to `timeout` for it to exit.
    ///
    /// `request` is the control request that triggered the stop; it is carried
    /// on the `StopRequested` event. Returns `None` if no worker is supervised.
    /// After this call the supervisor is idle whatever the outcome.
    pub async fn request_stop(
        &mut self,
        request: ControlRequest,
        timeout: Duration,
    ) -> Option<StopOutcome> {
        let mut handle = self.handle.take()?;

        handle.signal.request();
        self.bus.publish(
            Event::new(EventKind::StopRequested)
                .with_service(Arc::clone(&self.service))
                .with_request(request)
                .with_timeout(timeout),
        );

        let requested_at = Instant::now();
        match tokio::time::timeout(timeout, handle.wait_exit()).await {
            Ok(exit) => {
                self.bus.publish(
                    Event::new(EventKind::StoppedWithin)
                        .with_service(Arc::clone(&self.service))
                        .with_elapsed(requested_at.elapsed()),
                );
                Some(StopOutcome::Graceful(exit))
            }
            Err(_elapsed) => {
                // Dropping the JoinHandle detaches the thread.
                drop(handle);
                self.bus.publish(
                    Event::new(EventKind::StopTimeoutExceeded)
                        .with_service(Arc::clone(&self.service))
                        .with_timeout(timeout),
                );
                Some(StopOutcome::Forced { timeout })
            }
        }
    }
}

impl std::fmt::Debug for WorkerSupervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerSupervisor")
            .field("service", &self.service)
            .field("has_worker", &self.has_worker())
            .field("alive", &self.is_alive())
            .finish()
    }
}

fn classify(
    result: std::thread::Result<Result<(), ServiceError>>,
    signal: &CancellationSignal,
) -> WorkerExit {
    match result {
        Ok(Ok(())) | Ok(Err(ServiceError::Cancelled)) if signal.is_requested() => {
            WorkerExit::Cancelled
        }
        Ok(Ok(())) | Ok(Err(ServiceError::Cancelled)) => WorkerExit::Completed,
        Ok(Err(err)) => WorkerExit::Faulted(err.to_string()),
        Err(payload) => {
            let msg = payload
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            WorkerExit::Faulted(format!("panicked: {msg}"))
        }
    }
}

fn publish_exit(bus: &Bus, service: &Arc<str>, exit: &WorkerExit, lifetime: Duration) {
    let ev = match exit {
        WorkerExit::Faulted(error) => Event::new(EventKind::WorkerFaulted).with_reason(error.as_str()),
        other => Event::new(EventKind::WorkerExited).with_reason(other.as_label()),
    };
    bus.publish(ev.with_service(Arc::clone(service)).with_elapsed(lifetime));
}
