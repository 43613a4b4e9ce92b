//! # Runtime events emitted by the controller and the worker supervisor.
//!
//! [`EventKind`] groups events into:
//! - **Control events**: requests received, rejected or coalesced
//! - **State events**: every [`ServiceState`] transition
//! - **Worker events**: launch, exit, fault, stop deadline outcome
//! - **Subscriber events**: overflow and panics inside subscribers
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases
//! monotonically. Use `seq` to restore order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use servicevisor::{ControlRequest, Event, EventKind};
//!
//! let ev = Event::new(EventKind::StopRequested)
//!     .with_service("mini")
//!     .with_request(ControlRequest::Stop)
//!     .with_timeout(Duration::from_secs(5));
//!
//! assert_eq!(ev.kind, EventKind::StopRequested);
//! assert_eq!(ev.service.as_deref(), Some("mini"));
//! assert_eq!(ev.timeout_ms, Some(5_000));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

use crate::core::{ControlRequest, ServiceState};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets: `service` (subscriber name), `reason` (panic info).
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets: `service` (subscriber name), `reason`.
    SubscriberOverflow,

    // === Control events ===
    /// A control request was dequeued by the controller.
    ///
    /// Sets: `service`, `request`, `state` (state at dequeue time).
    ControlReceived,

    /// A control request was rejected (unsupported, hook failure, spawn failure).
    ///
    /// Sets: `service`, `request`, `state`, `reason`.
    ControlRejected,

    /// A control request had nothing to do in the current state.
    ///
    /// Sets: `service`, `request`, `state`.
    ControlCoalesced,

    // === State events ===
    /// The service moved to a new state.
    ///
    /// Sets: `service`, `prev_state`, `state`.
    StateChanged,

    // === Worker events ===
    /// A worker thread is being spawned.
    ///
    /// Sets: `service`.
    WorkerStarting,

    /// The worker thread confirmed it is running.
    ///
    /// Sets: `service`.
    WorkerLaunched,

    /// The worker finished (completed or cancelled).
    ///
    /// Sets: `service`, `reason` (exit label), `elapsed_ms` (lifetime).
    WorkerExited,

    /// The worker terminated with an uncaught error or panic.
    ///
    /// Sets: `service`, `reason` (error), `elapsed_ms` (lifetime).
    WorkerFaulted,

    /// The transient-error loop inside a worker scheduled a retry.
    ///
    /// Sets: `service`, `reason` (error), `delay_ms`, `attempt` (consecutive failures).
    WorkerRecovering,

    /// Stop was requested from the worker supervisor.
    ///
    /// Sets: `service`, `request`, `timeout_ms`.
    StopRequested,

    /// The worker exited before the shutdown deadline.
    ///
    /// Sets: `service`, `elapsed_ms`.
    StoppedWithin,

    /// The shutdown deadline elapsed; the worker thread was detached.
    ///
    /// Sets: `service`, `timeout_ms`.
    StopTimeoutExceeded,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Debug, Clone)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Service (or subscriber) name.
    pub service: Option<Arc<str>>,
    /// Control request involved, if any.
    pub request: Option<ControlRequest>,
    /// State after the event.
    pub state: Option<ServiceState>,
    /// State before a transition.
    pub prev_state: Option<ServiceState>,
    /// Shutdown deadline in milliseconds (compact).
    pub timeout_ms: Option<u32>,
    /// Elapsed time in milliseconds (compact).
    pub elapsed_ms: Option<u32>,
    /// Recovery delay in milliseconds (compact).
    pub delay_ms: Option<u32>,
    /// Consecutive failure count.
    pub attempt: Option<u32>,
    /// Human-readable reason (errors, exit labels, overflow details).
    pub reason: Option<Arc<str>>,
}

fn compact_ms(d: Duration) -> u32 {
    d.as_millis().min(u128::from(u32::MAX)) as u32
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            service: None,
            request: None,
            state: None,
            prev_state: None,
            timeout_ms: None,
            elapsed_ms: None,
            delay_ms: None,
            attempt: None,
            reason: None,
        }
    }

    /// Attaches a service name.
    #[inline]
    pub fn with_service(mut self, service: impl Into<Arc<str>>) -> Self {
        self.service = Some(service.into());
        self
    }

    /// Attaches a control request.
    #[inline]
    pub fn with_request(mut self, request: ControlRequest) -> Self {
        self.request = Some(request);
        self
    }

    /// Attaches the current state.
    #[inline]
    pub fn with_state(mut self, state: ServiceState) -> Self {
        self.state = Some(state);
        self
    }

    /// Attaches a transition (`prev → next`).
    #[inline]
    pub fn with_transition(mut self, prev: ServiceState, next: ServiceState) -> Self {
        self.prev_state = Some(prev);
        self.state = Some(next);
        self
    }

    /// Attaches a deadline (stored as milliseconds).
    #[inline]
    pub fn with_timeout(mut self, d: Duration) -> Self {
        self.timeout_ms = Some(compact_ms(d));
        self
    }

    /// Attaches an elapsed duration (stored as milliseconds).
    #[inline]
    pub fn with_elapsed(mut self, d: Duration) -> Self {
        self.elapsed_ms = Some(compact_ms(d));
        self
    }

    /// Attaches a recovery delay (stored as milliseconds).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        self.delay_ms = Some(compact_ms(d));
        self
    }

    /// Attaches a consecutive failure count.
    #[inline]
    pub fn with_attempt(mut self, n: u32) -> Self {
        self.attempt = Some(n);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_service(subscriber)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_service(subscriber)
            .with_reason(info)
    }

    /// True for events emitted by the subscriber machinery itself.
    #[inline]
    pub fn is_internal(&self) -> bool {
        matches!(
            self.kind,
            EventKind::SubscriberOverflow | EventKind::SubscriberPanicked
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_is_monotonic() {
        let a = Event::new(EventKind::WorkerStarting);
        let b = Event::new(EventKind::WorkerLaunched);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn test_durations_are_compacted() {
        let ev = Event::new(EventKind::StopTimeoutExceeded).with_timeout(Duration::from_secs(u64::MAX));
        assert_eq!(ev.timeout_ms, Some(u32::MAX));
    }

    #[test]
    fn test_transition_sets_both_states() {
        let ev = Event::new(EventKind::StateChanged)
            .with_transition(ServiceState::Running, ServiceState::StopPending);
        assert_eq!(ev.prev_state, Some(ServiceState::Running));
        assert_eq!(ev.state, Some(ServiceState::StopPending));
    }
}
