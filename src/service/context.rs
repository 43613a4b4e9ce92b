//! # Worker context handed to a running service.
//!
//! [`WorkerContext`] bundles what a worker thread needs:
//! - the run's [`CancellationSignal`],
//! - the configured [`RecoveryPolicy`] (from `error_backoff`),
//! - a handle to the host's tokio runtime for async work,
//! - an event publisher, so recovery shows up in the host's logs.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;

use crate::cancel::{CancellationSignal, WaitOutcome};
use crate::error::ServiceError;
use crate::events::{Bus, Event, EventKind};
use crate::policies::RecoveryPolicy;
use crate::service::work::run_recovering;

/// Per-run context passed to [`Service::main_loop`](crate::Service::main_loop).
pub struct WorkerContext {
    service: Arc<str>,
    signal: CancellationSignal,
    recovery: RecoveryPolicy,
    bus: Bus,
    runtime: Handle,
}

impl WorkerContext {
    pub(crate) fn new(
        service: Arc<str>,
        signal: CancellationSignal,
        recovery: RecoveryPolicy,
        bus: Bus,
        runtime: Handle,
    ) -> Self {
        Self {
            service,
            signal,
            recovery,
            bus,
            runtime,
        }
    }

    /// Registered service name.
    pub fn service_name(&self) -> &str {
        &self.service
    }

    /// The run's cancellation signal.
    pub fn signal(&self) -> &CancellationSignal {
        &self.signal
    }

    /// Shorthand for `signal().is_requested()`.
    #[inline]
    pub fn is_stop_requested(&self) -> bool {
        self.signal.is_requested()
    }

    /// Blocks up to `timeout` or until a stop is requested.
    #[inline]
    pub fn wait_for_stop(&self, timeout: Duration) -> WaitOutcome {
        self.signal.wait_timeout(timeout)
    }

    /// Recovery policy derived from the host settings.
    pub fn recovery(&self) -> RecoveryPolicy {
        self.recovery
    }

    /// Runs `unit` repeatedly until a stop is requested, recovering from errors.
    ///
    /// Same contract as [`work_loop`](crate::work_loop), using this context's
    /// recovery policy; every recovery is published as `WorkerRecovering`.
    pub fn work_loop<F>(&self, unit: F)
    where
        F: FnMut(&CancellationSignal) -> Result<(), ServiceError>,
    {
        run_recovering(&self.signal, &self.recovery, unit, |err, failures, delay| {
            self.bus.publish(
                Event::new(EventKind::WorkerRecovering)
                    .with_service(Arc::clone(&self.service))
                    .with_reason(err.to_string())
                    .with_attempt(failures)
                    .with_delay(delay),
            );
        });
    }

    /// Drives an async future to completion on the host runtime from the worker thread.
    ///
    /// Combine with [`CancellationSignal::cancelled`] to write async workers.
    pub fn block_on<F: Future>(&self, fut: F) -> F::Output {
        self.runtime.block_on(fut)
    }
}

impl std::fmt::Debug for WorkerContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerContext")
            .field("service", &self.service)
            .field("signal", &self.signal)
            .field("recovery", &self.recovery)
            .finish()
    }
}
