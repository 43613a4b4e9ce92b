//! Error types used by the host, the lifecycle controller and services.
//!
//! - [`HostError`] structural failures of a host run (fatal, non-zero exit).
//! - [`RegistrationError`] the platform adapter could not register the service.
//! - [`ControlError`] a control request could not be applied.
//! - [`ServiceError`] failures returned by a service's main loop or hooks.
//!
//! All enums provide `as_label()` (stable snake_case) for logs/metrics.

use thiserror::Error;

use crate::cancel::Cancelled;
use crate::core::ControlRequest;

/// # Errors that end a host run before the service could run normally.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum HostError {
    /// Settings failed validation; nothing was started.
    #[error("invalid settings: {reason}")]
    InvalidSettings {
        /// What was wrong.
        reason: String,
    },

    /// The platform adapter could not register with the service manager.
    #[error("registration failed: {0}")]
    Registration(#[from] RegistrationError),

    /// The async runtime backing [`HostRunner::run_blocking`](crate::HostRunner::run_blocking) could not be built.
    #[error("runtime unavailable: {0}")]
    Runtime(#[source] std::io::Error),

    /// The controller ended without producing a run report.
    #[error("lifecycle controller terminated unexpectedly")]
    ControllerLost,
}

impl HostError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use servicevisor::HostError;
    ///
    /// let err = HostError::InvalidSettings { reason: "empty service_name".into() };
    /// assert_eq!(err.as_label(), "host_invalid_settings");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            HostError::InvalidSettings { .. } => "host_invalid_settings",
            HostError::Registration(_) => "host_registration_failed",
            HostError::Runtime(_) => "host_runtime_unavailable",
            HostError::ControllerLost => "host_controller_lost",
        }
    }
}

/// # Errors raised by a [`PlatformAdapter`](crate::PlatformAdapter).
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RegistrationError {
    /// The service manager refused the registration.
    #[error("service manager rejected registration: {reason}")]
    Rejected {
        /// Reason reported by the adapter.
        reason: String,
    },

    /// OS-level failure while wiring the adapter (signal handlers, IPC...).
    #[error("adapter i/o: {0}")]
    Io(#[from] std::io::Error),

    /// The adapter does not implement this operation.
    #[error("{adapter} does not support {operation}")]
    Unsupported {
        /// Adapter name.
        adapter: &'static str,
        /// Operation name (`install`, `uninstall`).
        operation: &'static str,
    },
}

impl RegistrationError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            RegistrationError::Rejected { .. } => "registration_rejected",
            RegistrationError::Io(_) => "registration_io",
            RegistrationError::Unsupported { .. } => "registration_unsupported",
        }
    }
}

/// # Errors returned to the sender of a control request.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ControlError {
    /// Pause/Continue requested but the service cannot pause.
    #[error("unsupported operation: {request:?}")]
    UnsupportedOperation {
        /// The rejected request.
        request: ControlRequest,
    },

    /// The worker thread could not be spawned.
    #[error("worker spawn failed: {error}")]
    Spawn {
        /// OS error text.
        error: String,
    },

    /// A pause/continue hook failed; the previous state was restored.
    #[error("{request:?} hook failed: {error}")]
    Hook {
        /// The request whose hook failed.
        request: ControlRequest,
        /// Hook error text.
        error: String,
    },

    /// The request queue is full (only from `try_send`).
    #[error("control queue full")]
    Full,

    /// The controller has finished; no further requests are accepted.
    #[error("controller closed")]
    Closed,
}

impl ControlError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use servicevisor::{ControlError, ControlRequest};
    ///
    /// let err = ControlError::UnsupportedOperation { request: ControlRequest::Pause };
    /// assert_eq!(err.as_label(), "control_unsupported");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            ControlError::UnsupportedOperation { .. } => "control_unsupported",
            ControlError::Spawn { .. } => "control_spawn_failed",
            ControlError::Hook { .. } => "control_hook_failed",
            ControlError::Full => "control_queue_full",
            ControlError::Closed => "control_closed",
        }
    }
}

/// # Errors produced by service code.
///
/// Returned from [`Service::main_loop`](crate::Service::main_loop) and the
/// pause/continue hooks. A main loop that returns [`ServiceError::Cancelled`]
/// (or `Ok(())` after a stop request) exits gracefully; any other error that
/// escapes the loop marks the worker as faulted.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// The service observed its cancellation signal.
    #[error("cancelled")]
    Cancelled,

    /// The service failed.
    #[error("service failed: {error}")]
    Failed {
        /// The underlying error message.
        error: String,
    },
}

impl ServiceError {
    /// Wraps any displayable error as [`ServiceError::Failed`].
    pub fn failed(error: impl std::fmt::Display) -> Self {
        ServiceError::Failed {
            error: error.to_string(),
        }
    }

    /// True for [`ServiceError::Cancelled`].
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ServiceError::Cancelled)
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ServiceError::Cancelled => "service_cancelled",
            ServiceError::Failed { .. } => "service_failed",
        }
    }
}

impl From<Cancelled> for ServiceError {
    fn from(_: Cancelled) -> Self {
        ServiceError::Cancelled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancelled_converts_with_question_mark() {
        fn body(signal: &crate::CancellationSignal) -> Result<(), ServiceError> {
            signal.check()?;
            Ok(())
        }
        let signal = crate::CancellationSignal::new();
        assert_eq!(body(&signal), Ok(()));
        signal.request();
        assert!(body(&signal).unwrap_err().is_cancelled());
    }

    #[test]
    fn test_labels_are_stable() {
        assert_eq!(ServiceError::failed("x").as_label(), "service_failed");
        assert_eq!(ControlError::Closed.as_label(), "control_closed");
        let reg = RegistrationError::Unsupported {
            adapter: "console",
            operation: "install",
        };
        assert_eq!(reg.to_string(), "console does not support install");
        assert_eq!(HostError::from(reg).as_label(), "host_registration_failed");
    }
}
