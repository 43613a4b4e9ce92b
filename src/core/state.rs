//! # Service states, control requests and status reports.
//!
//! ```text
//!              Start                     launched
//!   Stopped ───────────► StartPending ───────────► Running ◄──────────────┐
//!      ▲                                            │   │                 │
//!      │        worker exited      Stop/Shutdown    │   │ Pause           │ hook ok
//!      ├────────────────────── StopPending ◄────────┘   ▼                 │
//!      │                           ▲             PausePending ──► Paused ─┤ Continue
//!      │                           │                                │     │
//!      │                           └──────── Stop/Shutdown ─────────┘  ContinuePending
//!      └── (unsolicited worker exit from Running/Paused)
//! ```

use std::fmt;

use crate::core::worker::StopOutcome;

/// Lifecycle state of a hosted service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ServiceState {
    /// Not running (initial and terminal).
    #[default]
    Stopped,
    /// Worker is being launched.
    StartPending,
    /// Worker is running.
    Running,
    /// Stop requested; waiting for the worker to exit.
    StopPending,
    /// Pause hook in progress.
    PausePending,
    /// Paused.
    Paused,
    /// Continue hook in progress.
    ContinuePending,
}

impl ServiceState {
    /// True for the transitional `*Pending` states.
    pub fn is_pending(self) -> bool {
        matches!(
            self,
            ServiceState::StartPending
                | ServiceState::StopPending
                | ServiceState::PausePending
                | ServiceState::ContinuePending
        )
    }

    /// True while a worker exists (`Running`, `Paused` and the pause/continue transitions).
    pub fn has_worker(self) -> bool {
        matches!(
            self,
            ServiceState::Running
                | ServiceState::PausePending
                | ServiceState::Paused
                | ServiceState::ContinuePending
        )
    }

    /// Short kebab-case name for logs.
    pub fn as_str(self) -> &'static str {
        match self {
            ServiceState::Stopped => "stopped",
            ServiceState::StartPending => "start-pending",
            ServiceState::Running => "running",
            ServiceState::StopPending => "stop-pending",
            ServiceState::PausePending => "pause-pending",
            ServiceState::Paused => "paused",
            ServiceState::ContinuePending => "continue-pending",
        }
    }
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Instruction delivered by the service manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlRequest {
    /// Launch the worker.
    Start,
    /// Stop the service.
    Stop,
    /// Pause (only when the service can pause).
    Pause,
    /// Resume a paused service.
    Continue,
    /// Host is shutting down; handled like `Stop`.
    Shutdown,
}

impl ControlRequest {
    /// True for `Stop` and `Shutdown`.
    pub fn is_stop(self) -> bool {
        matches!(self, ControlRequest::Stop | ControlRequest::Shutdown)
    }

    /// Short lowercase name for logs.
    pub fn as_str(self) -> &'static str {
        match self {
            ControlRequest::Start => "start",
            ControlRequest::Stop => "stop",
            ControlRequest::Pause => "pause",
            ControlRequest::Continue => "continue",
            ControlRequest::Shutdown => "shutdown",
        }
    }
}

impl fmt::Display for ControlRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status report delivered to the platform adapter on every state change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceStatus {
    /// Current state.
    pub state: ServiceState,
    /// Whether Pause/Continue are currently accepted.
    pub accepts_pause_continue: bool,
    /// How the worker stopped; set only on the final `Stopped` report.
    pub stop: Option<StopOutcome>,
}

impl ServiceStatus {
    pub(crate) fn new(state: ServiceState, can_pause_continue: bool) -> Self {
        Self {
            state,
            accepts_pause_continue: can_pause_continue
                && matches!(state, ServiceState::Running | ServiceState::Paused),
            stop: None,
        }
    }

    pub(crate) fn with_stop(mut self, stop: StopOutcome) -> Self {
        self.stop = Some(stop);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_states() {
        assert!(ServiceState::StartPending.is_pending());
        assert!(ServiceState::ContinuePending.is_pending());
        assert!(!ServiceState::Running.is_pending());
        assert!(!ServiceState::Stopped.is_pending());
    }

    #[test]
    fn test_pause_accepted_only_when_steady_and_enabled() {
        assert!(ServiceStatus::new(ServiceState::Running, true).accepts_pause_continue);
        assert!(ServiceStatus::new(ServiceState::Paused, true).accepts_pause_continue);
        assert!(!ServiceStatus::new(ServiceState::StopPending, true).accepts_pause_continue);
        assert!(!ServiceStatus::new(ServiceState::Running, false).accepts_pause_continue);
    }

    #[test]
    fn test_stop_requests() {
        assert!(ControlRequest::Stop.is_stop());
        assert!(ControlRequest::Shutdown.is_stop());
        assert!(!ControlRequest::Pause.is_stop());
    }
}
