//! # LifecycleController: the service state machine.
//!
//! Translates [`ControlRequest`]s into worker operations and state transitions,
//! one request at a time.
//!
//! ```text
//! ControlHandle::send(req) ──► [mpsc queue] ──► LifecycleController::run()
//!                                                   │
//!          ┌────────────────────────────────────────┤ select!
//!          ▼                                        ▼
//!    handle(req)                            supervisor.exited()
//!    ├─ Start    ─► StartPending ─► Running        (unsolicited exit)
//!    ├─ Stop     ─► StopPending ─► request_stop ─► Stopped
//!    ├─ Pause    ─► PausePending ─► on_pause ─► Paused
//!    ├─ Continue ─► ContinuePending ─► on_continue ─► Running
//!    └─ no-op    ─► Coalesced
//!          │
//!          └─► every transition: watch<ServiceState>, StateChanged event,
//!              PlatformAdapter::report_status
//! ```
//!
//! ## Rules
//! - Requests are serialized; pending states are never observed at dequeue time.
//! - A request with nothing to do in the current state is coalesced, never an error.
//! - Pause/Continue with `can_pause_continue = false` are rejected as unsupported.
//! - A failing pause/continue hook restores the previous state. So does a hook
//!   still running after `shutdown_timeout`: it is left to finish in the
//!   background and queued requests are served.
//! - The run ends the first time the service returns to `Stopped` after leaving it,
//!   or when every [`ControlHandle`] is dropped. Later requests get [`ControlError::Closed`]
//!   (stop requests are coalesced instead: the service is already stopped).

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};

use crate::cancel::CancellationSignal;
use crate::config::ServiceHostingSettings;
use crate::core::state::{ControlRequest, ServiceState, ServiceStatus};
use crate::core::worker::{StopOutcome, WorkerExit, WorkerSupervisor};
use crate::error::{ControlError, ServiceError};
use crate::events::{Bus, Event, EventKind};
use crate::platform::PlatformAdapter;
use crate::service::ServiceRef;

type Reply = oneshot::Sender<Result<ControlOutcome, ControlError>>;

struct Command {
    request: ControlRequest,
    reply: Option<Reply>,
}

/// What an accepted control request did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlOutcome {
    /// The service moved between steady states.
    Transitioned {
        /// State when the request was dequeued.
        from: ServiceState,
        /// State after the request completed.
        to: ServiceState,
    },
    /// The worker was stopped; the service is `Stopped`.
    Stopped(StopOutcome),
    /// Nothing to do in the current state.
    Coalesced {
        /// State the request was evaluated against.
        state: ServiceState,
    },
}

/// Why a host run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopCause {
    /// A Stop or Shutdown request was applied.
    Requested(ControlRequest),
    /// The worker exited while the service was running, without a stop request.
    WorkerExited,
    /// The worker could not be launched.
    StartFailed(ControlError),
    /// Every control handle was dropped.
    HandlesDropped,
}

/// Summary of a finished run, returned by [`HostRunner::run`](crate::HostRunner::run).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// Why the run ended.
    pub cause: StopCause,
    /// How the worker ended, if one was started.
    pub outcome: Option<StopOutcome>,
}

impl RunReport {
    /// Exit code for a clean stop.
    pub const EXIT_OK: u8 = 0;
    /// Exit code when the worker faulted or stopped on its own.
    pub const EXIT_WORKER_FAULT: u8 = 1;
    /// Exit code when the worker had to be detached.
    pub const EXIT_FORCED_STOP: u8 = 2;
    /// Exit code when the service never ran (start failure, registration, settings).
    pub const EXIT_STARTUP: u8 = 3;

    /// True when a stop was requested and the worker exited in time without fault.
    ///
    /// A run that ended without ever starting the worker (handles dropped while
    /// `Stopped`) is also clean.
    pub fn is_clean(&self) -> bool {
        match (&self.cause, &self.outcome) {
            (StopCause::Requested(_), Some(StopOutcome::Graceful(exit))) => !exit.is_faulted(),
            (StopCause::HandlesDropped, None) => true,
            (StopCause::HandlesDropped, Some(StopOutcome::Graceful(exit))) => !exit.is_faulted(),
            _ => false,
        }
    }

    /// Process exit code for this run.
    pub fn exit_code(&self) -> u8 {
        if self.is_clean() {
            return Self::EXIT_OK;
        }
        match (&self.cause, &self.outcome) {
            (StopCause::StartFailed(_), _) => Self::EXIT_STARTUP,
            (_, Some(StopOutcome::Forced { .. })) => Self::EXIT_FORCED_STOP,
            _ => Self::EXIT_WORKER_FAULT,
        }
    }
}

/// Cloneable handle for delivering control requests to a [`LifecycleController`].
#[derive(Clone)]
pub struct ControlHandle {
    tx: mpsc::Sender<Command>,
    state: watch::Receiver<ServiceState>,
}

impl ControlHandle {
    /// Sends `request` and waits until the controller has applied it.
    ///
    /// Waits for queue space if the queue is full. Must not be awaited from
    /// inside [`PlatformAdapter::register`]; the controller only starts
    /// consuming requests after registration succeeded.
    pub async fn send(&self, request: ControlRequest) -> Result<ControlOutcome, ControlError> {
        let (reply, rx) = oneshot::channel();
        let cmd = Command {
            request,
            reply: Some(reply),
        };
        if self.tx.send(cmd).await.is_err() {
            return closed_outcome(request);
        }
        match rx.await {
            Ok(res) => res,
            Err(_) => closed_outcome(request),
        }
    }

    /// Enqueues `request` without waiting for it to be applied.
    pub async fn post(&self, request: ControlRequest) -> Result<(), ControlError> {
        self.tx
            .send(Command {
                request,
                reply: None,
            })
            .await
            .map_err(|_| ControlError::Closed)
    }

    /// Enqueues `request` without waiting; fails with [`ControlError::Full`] if the queue is full.
    pub fn try_send(&self, request: ControlRequest) -> Result<(), ControlError> {
        self.tx
            .try_send(Command {
                request,
                reply: None,
            })
            .map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => ControlError::Full,
                mpsc::error::TrySendError::Closed(_) => ControlError::Closed,
            })
    }

    /// Current state.
    pub fn state(&self) -> ServiceState {
        *self.state.borrow()
    }

    /// Watch receiver for state changes.
    pub fn subscribe_state(&self) -> watch::Receiver<ServiceState> {
        self.state.clone()
    }

    /// Waits until the service reaches `target`.
    ///
    /// Returns `false` if the controller finished first without reaching it.
    pub async fn wait_for_state(&self, target: ServiceState) -> bool {
        let mut rx = self.state.clone();
        rx.wait_for(|s| *s == target).await.is_ok()
    }

    /// Resolves once the controller has finished.
    pub async fn closed(&self) {
        self.tx.closed().await;
    }

    /// True once the controller has finished.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl std::fmt::Debug for ControlHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControlHandle")
            .field("state", &self.state())
            .field("closed", &self.is_closed())
            .finish()
    }
}

fn closed_outcome(request: ControlRequest) -> Result<ControlOutcome, ControlError> {
    if request.is_stop() {
        Ok(ControlOutcome::Coalesced {
            state: ServiceState::Stopped,
        })
    } else {
        Err(ControlError::Closed)
    }
}

/// Single-service lifecycle state machine.
pub struct LifecycleController {
    settings: Arc<ServiceHostingSettings>,
    name: Arc<str>,
    service: ServiceRef,
    adapter: Arc<dyn PlatformAdapter>,
    bus: Bus,
    supervisor: WorkerSupervisor,

    state: ServiceState,
    state_tx: watch::Sender<ServiceState>,
    rx: mpsc::Receiver<Command>,
    report: Option<RunReport>,
}

impl LifecycleController {
    /// Creates a controller in `Stopped` and the handle that drives it.
    pub fn new(
        settings: Arc<ServiceHostingSettings>,
        service: ServiceRef,
        adapter: Arc<dyn PlatformAdapter>,
        bus: Bus,
    ) -> (Self, ControlHandle) {
        let (tx, rx) = mpsc::channel(settings.control_queue_clamped());
        let (state_tx, state_rx) = watch::channel(ServiceState::Stopped);
        let name: Arc<str> = Arc::from(settings.service_name.as_str());

        let controller = Self {
            supervisor: WorkerSupervisor::new(Arc::clone(&name), bus.clone()),
            settings,
            name,
            service,
            adapter,
            bus,
            state: ServiceState::Stopped,
            state_tx,
            rx,
            report: None,
        };
        let handle = ControlHandle {
            tx,
            state: state_rx,
        };
        (controller, handle)
    }

    /// Processes control requests until the run ends and returns its report.
    pub async fn run(mut self) -> RunReport {
        self.adapter
            .report_status(&ServiceStatus::new(self.state, self.settings.can_pause_continue));

        loop {
            let watching = self.supervisor.has_worker();
            tokio::select! {
                cmd = self.rx.recv() => match cmd {
                    Some(Command { request, reply }) => {
                        let res = self.handle(request).await;
                        if let Some(reply) = reply {
                            let _ = reply.send(res);
                        }
                    }
                    None => self.on_handles_dropped().await,
                },
                exit = self.supervisor.exited(), if watching => {
                    self.on_worker_exit(exit);
                }
            }

            if let Some(report) = self.report.take() {
                self.close();
                return report;
            }
        }
    }

    async fn handle(&mut self, request: ControlRequest) -> Result<ControlOutcome, ControlError> {
        self.publish(EventKind::ControlReceived, request);

        let pause_family = matches!(request, ControlRequest::Pause | ControlRequest::Continue);
        if pause_family && !self.settings.can_pause_continue {
            let err = ControlError::UnsupportedOperation { request };
            self.reject(request, &err);
            return Err(err);
        }

        match (request, self.state) {
            (ControlRequest::Start, ServiceState::Stopped) => self.start().await,
            (r, s) if r.is_stop() && s.has_worker() => Ok(self.stop(r).await),
            (ControlRequest::Pause, ServiceState::Running) => self.pause().await,
            (ControlRequest::Continue, ServiceState::Paused) => self.resume().await,
            (r, s) => {
                self.publish(EventKind::ControlCoalesced, r);
                Ok(ControlOutcome::Coalesced { state: s })
            }
        }
    }

    async fn start(&mut self) -> Result<ControlOutcome, ControlError> {
        self.transition(ServiceState::StartPending);

        let launched = match self.supervisor.start(
            Arc::clone(&self.service),
            CancellationSignal::new(),
            self.settings.recovery_policy(),
        ) {
            Ok(launch) => launch.confirmed().await,
            Err(err) => return Err(self.start_failed(err)),
        };
        if !launched {
            let err = ControlError::Spawn {
                error: "worker thread ended before confirming launch".into(),
            };
            return Err(self.start_failed(err));
        }

        self.transition(ServiceState::Running);
        Ok(ControlOutcome::Transitioned {
            from: ServiceState::Stopped,
            to: ServiceState::Running,
        })
    }

    fn start_failed(&mut self, err: ControlError) -> ControlError {
        self.reject(ControlRequest::Start, &err);
        self.supervisor.reap();
        self.transition(ServiceState::Stopped);
        self.report = Some(RunReport {
            cause: StopCause::StartFailed(err.clone()),
            outcome: None,
        });
        err
    }

    async fn stop(&mut self, request: ControlRequest) -> ControlOutcome {
        self.transition(ServiceState::StopPending);

        let outcome = self
            .supervisor
            .request_stop(request, self.settings.shutdown_timeout)
            .await
            .unwrap_or(StopOutcome::Graceful(WorkerExit::Cancelled));

        self.finish(StopCause::Requested(request), outcome.clone());
        ControlOutcome::Stopped(outcome)
    }

    async fn pause(&mut self) -> Result<ControlOutcome, ControlError> {
        self.run_hook(
            ControlRequest::Pause,
            ServiceState::PausePending,
            ServiceState::Paused,
            ServiceState::Running,
            |svc| svc.on_pause(),
        )
        .await
    }

    async fn resume(&mut self) -> Result<ControlOutcome, ControlError> {
        self.run_hook(
            ControlRequest::Continue,
            ServiceState::ContinuePending,
            ServiceState::Running,
            ServiceState::Paused,
            |svc| svc.on_continue(),
        )
        .await
    }

    /// Runs a pause/continue hook off the controller task and settles the state.
    ///
    /// The hook gets `shutdown_timeout` to finish; past that it is abandoned
    /// and the request fails like a hook error.
    async fn run_hook<H>(
        &mut self,
        request: ControlRequest,
        pending: ServiceState,
        target: ServiceState,
        previous: ServiceState,
        hook: H,
    ) -> Result<ControlOutcome, ControlError>
    where
        H: FnOnce(ServiceRef) -> Result<(), ServiceError> + Send + 'static,
    {
        self.transition(pending);

        let svc = Arc::clone(&self.service);
        let deadline = self.settings.shutdown_timeout;
        let blocking = tokio::task::spawn_blocking(move || hook(svc));
        let result = match tokio::time::timeout(deadline, blocking).await {
            Ok(Ok(res)) => res.map_err(|e| e.to_string()),
            Ok(Err(join)) => Err(format!("hook panicked: {join}")),
            Err(_elapsed) => Err(format!(
                "hook did not finish within {}ms",
                deadline.as_millis()
            )),
        };

        match result {
            Ok(()) => {
                self.transition(target);
                Ok(ControlOutcome::Transitioned {
                    from: previous,
                    to: target,
                })
            }
            Err(error) => {
                let err = ControlError::Hook { request, error };
                self.reject(request, &err);
                self.transition(previous);
                Err(err)
            }
        }
    }

    fn on_worker_exit(&mut self, exit: WorkerExit) {
        let exit = self.supervisor.reap().unwrap_or(exit);
        self.finish(StopCause::WorkerExited, StopOutcome::Graceful(exit));
    }

    async fn on_handles_dropped(&mut self) {
        let outcome = if self.state.has_worker() {
            self.supervisor
                .request_stop(ControlRequest::Shutdown, self.settings.shutdown_timeout)
                .await
        } else {
            None
        };
        match outcome {
            Some(outcome) => self.finish(StopCause::HandlesDropped, outcome),
            None => {
                self.report = Some(RunReport {
                    cause: StopCause::HandlesDropped,
                    outcome: None,
                });
            }
        }
    }

    /// Final transition to `Stopped`, carrying the stop outcome to the adapter.
    fn finish(&mut self, cause: StopCause, outcome: StopOutcome) {
        let status = ServiceStatus::new(ServiceState::Stopped, self.settings.can_pause_continue)
            .with_stop(outcome.clone());
        self.set_state(ServiceState::Stopped, status);
        self.report = Some(RunReport {
            cause,
            outcome: Some(outcome),
        });
    }

    fn transition(&mut self, next: ServiceState) {
        let status = ServiceStatus::new(next, self.settings.can_pause_continue);
        self.set_state(next, status);
    }

    fn set_state(&mut self, next: ServiceState, status: ServiceStatus) {
        let prev = self.state;
        self.state = next;
        self.state_tx.send_replace(next);
        self.bus.publish(
            Event::new(EventKind::StateChanged)
                .with_service(Arc::clone(&self.name))
                .with_transition(prev, next),
        );
        self.adapter.report_status(&status);
    }

    fn publish(&self, kind: EventKind, request: ControlRequest) {
        self.bus.publish(
            Event::new(kind)
                .with_service(Arc::clone(&self.name))
                .with_request(request)
                .with_state(self.state),
        );
    }

    fn reject(&self, request: ControlRequest, err: &ControlError) {
        self.bus.publish(
            Event::new(EventKind::ControlRejected)
                .with_service(Arc::clone(&self.name))
                .with_request(request)
                .with_state(self.state)
                .with_reason(err.to_string()),
        );
    }

    /// Stops accepting requests and answers whatever is still queued.
    fn close(&mut self) {
        self.rx.close();
        while let Ok(Command { request, reply }) = self.rx.try_recv() {
            if request.is_stop() {
                self.publish(EventKind::ControlCoalesced, request);
            }
            if let Some(reply) = reply {
                let _ = reply.send(closed_outcome(request));
            }
        }
    }
}

impl std::fmt::Debug for LifecycleController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleController")
            .field("service", &self.name)
            .field("state", &self.state)
            .field("supervisor", &self.supervisor)
            .finish()
    }
}
