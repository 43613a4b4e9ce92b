//! # LogWriter: structured logging subscriber.
//!
//! Renders every [`Event`] through [`tracing`] with structured fields, so the
//! host's output follows whatever `tracing` subscriber the process installed
//! (see [`entry::init_tracing`](crate::entry::init_tracing)).
//!
//! ## Levels
//! - `error`: worker faults, forced stops, subscriber panics
//! - `warn`: rejected requests, worker recovery, subscriber overflow
//! - `info`: state changes, stop outcome, worker launch/exit
//! - `debug`: received and coalesced requests

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer backed by `tracing`.
#[derive(Default, Debug, Clone, Copy)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let service = e.service.as_deref().unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("");
        let request = e.request.map(|r| r.as_str()).unwrap_or("-");
        let state = e.state.map(|s| s.as_str()).unwrap_or("-");

        match e.kind {
            EventKind::ControlReceived => {
                tracing::debug!(seq = e.seq, service, request, state, "control request received");
            }
            EventKind::ControlCoalesced => {
                tracing::debug!(seq = e.seq, service, request, state, "control request coalesced");
            }
            EventKind::ControlRejected => {
                tracing::warn!(seq = e.seq, service, request, state, reason, "control request rejected");
            }
            EventKind::StateChanged => {
                let from = e.prev_state.map(|s| s.as_str()).unwrap_or("-");
                tracing::info!(seq = e.seq, service, from, to = state, "state changed");
            }
            EventKind::WorkerStarting => {
                tracing::debug!(seq = e.seq, service, "worker starting");
            }
            EventKind::WorkerLaunched => {
                tracing::info!(seq = e.seq, service, "worker launched");
            }
            EventKind::WorkerExited => {
                tracing::info!(seq = e.seq, service, exit = reason, lifetime_ms = e.elapsed_ms, "worker exited");
            }
            EventKind::WorkerFaulted => {
                tracing::error!(seq = e.seq, service, error = reason, lifetime_ms = e.elapsed_ms, "worker faulted");
            }
            EventKind::WorkerRecovering => {
                tracing::warn!(
                    seq = e.seq,
                    service,
                    error = reason,
                    delay_ms = e.delay_ms,
                    failures = e.attempt,
                    "worker recovering from error"
                );
            }
            EventKind::StopRequested => {
                tracing::info!(seq = e.seq, service, request, timeout_ms = e.timeout_ms, "stop requested");
            }
            EventKind::StoppedWithin => {
                tracing::info!(seq = e.seq, service, elapsed_ms = e.elapsed_ms, "graceful stop");
            }
            EventKind::StopTimeoutExceeded => {
                tracing::error!(
                    seq = e.seq,
                    service,
                    timeout_ms = e.timeout_ms,
                    "forced stop: worker did not exit in time and was detached"
                );
            }
            EventKind::SubscriberOverflow => {
                tracing::warn!(seq = e.seq, subscriber = service, reason, "subscriber dropped event");
            }
            EventKind::SubscriberPanicked => {
                tracing::error!(seq = e.seq, subscriber = service, info = reason, "subscriber panicked");
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
