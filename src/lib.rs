//! # servicevisor
//!
//! **Servicevisor** hosts one long-running, blocking service under an OS
//! service manager. It translates the manager's control requests (start,
//! stop, pause, continue, shutdown) into a strict state machine, runs the
//! service's main loop on a dedicated worker thread, and guarantees that a
//! stop request completes within a configured timeout even if the worker
//! ignores cancellation.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   OS service manager / terminal / init system
//!            │ control requests            ▲ status reports
//!            ▼                             │
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  PlatformAdapter (ConsoleAdapter, PosixDaemonAdapter, Manual...)  │
//! └──────┬────────────────────────────────────────────▲───────────────┘
//!        │ ControlHandle::send / post                 │ report_status
//!        ▼                                            │
//! ┌───────────────────────────────────────────────────┴───────────────┐
//! │  LifecycleController (actor, one request at a time)               │
//! │  - ServiceState machine (watch channel)                           │
//! │  - coalesces no-op requests, rejects unsupported ones             │
//! └──────┬────────────────────────────────────────────────────────────┘
//!        │ start / request_stop(shutdown_timeout)
//!        ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  WorkerSupervisor                                                 │
//! │  - dedicated OS thread running Service::main_loop(&WorkerContext) │
//! │  - CancellationSignal (cooperative stop)                          │
//! │  - Graceful within timeout, otherwise Forced (thread detached)    │
//! └──────┬────────────────────────────────────────────────────────────┘
//!        │ publish(Event)       (controller and worker publish too)
//!        ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                  Bus (broadcast channel) ──► SubscriberSet        │
//! │                                              ├─► LogWriter        │
//! │                                              └─► custom Subscribe │
//! └───────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ### Lifecycle
//! ```text
//! Stopped ─Start─► StartPending ─► Running ─Pause─► PausePending ─► Paused
//!    ▲                               │  ▲                             │
//!    │                               │  └── Running ◄─ ContinuePending ◄┘ Continue
//!    │                          Stop/Shutdown (also from Paused)
//!    │                               ▼
//!    └──────────────────────── StopPending
//!            request_stop(timeout) ─► Graceful(exit) | Forced
//! ```
//!
//! Inside the worker, [`work_loop`] (or [`WorkerContext::work_loop`]) keeps
//! running units of work, backs off by `error_backoff` after a failure and
//! returns only when cancellation is requested.
//!
//! ## Features
//! | Area            | Description                                              | Key types / traits                          |
//! |-----------------|----------------------------------------------------------|---------------------------------------------|
//! | **Service API** | Blocking main loop with pause/continue hooks.            | [`Service`], [`ServiceFn`], [`WorkerContext`] |
//! | **Cancellation**| One-shot stop flag with timed waits and an async bridge. | [`CancellationSignal`]                      |
//! | **Recovery**    | Transient-error retry loop with backoff and jitter.      | [`work_loop`], [`RecoveryPolicy`]           |
//! | **Lifecycle**   | State machine, control requests, bounded-time stop.      | [`LifecycleController`], [`ControlHandle`]  |
//! | **Platform**    | Pluggable service manager integration.                   | [`PlatformAdapter`], [`ConsoleAdapter`]     |
//! | **Events**      | Runtime events fanned out to subscribers.                | [`Event`], [`Subscribe`], [`LogWriter`]     |
//! | **Entry**       | clap CLI, tracing setup and exit codes.                  | [`entry::main`]                             |
//!
//! ## Example
//! ```rust,no_run
//! use std::process::ExitCode;
//! use std::time::Duration;
//! use servicevisor::{ServiceError, ServiceFn, ServiceHostingSettings, WorkerContext};
//!
//! fn main() -> ExitCode {
//!     let settings = ServiceHostingSettings::new("mini")
//!         .with_display_name("Mini Service")
//!         .with_shutdown_timeout(Duration::from_secs(10))
//!         .with_error_backoff(Duration::from_secs(5));
//!
//!     let svc = ServiceFn::arc(|ctx: &WorkerContext| {
//!         ctx.work_loop(|signal| {
//!             // one unit of work
//!             signal.wait_timeout(Duration::from_secs(1));
//!             Ok::<(), ServiceError>(())
//!         });
//!         Ok(())
//!     });
//!
//!     servicevisor::entry::main(svc, settings)
//! }
//! ```
mod cancel;
mod config;
mod core;
mod error;
mod events;
mod platform;
mod policies;
mod service;
mod subscribers;

pub mod entry;

// ---- Public re-exports ----

pub use cancel::{CancellationSignal, Cancelled, WaitOutcome};
pub use config::ServiceHostingSettings;
pub use crate::core::{
    ControlHandle, ControlOutcome, ControlRequest, HostRunner, HostRunnerBuilder, Launch,
    LifecycleController, RunReport, ServiceState, ServiceStatus, StopCause, StopOutcome,
    WorkerExit, WorkerSupervisor,
};
pub use error::{ControlError, HostError, RegistrationError, ServiceError};
pub use events::{Bus, Event, EventKind};
#[cfg(unix)]
pub use platform::PosixDaemonAdapter;
pub use platform::{ConsoleAdapter, ManualAdapter, ManualControl, PlatformAdapter};
pub use policies::{JitterPolicy, RecoveryPolicy};
pub use service::{Service, ServiceFn, ServiceRef, WorkerContext, work_loop};
pub use subscribers::{LogWriter, Subscribe, SubscriberSet};
