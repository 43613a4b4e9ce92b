//! # The hosted service contract.
//!
//! A [`Service`] supplies one long-running, **blocking** main loop. The host
//! runs it on a dedicated OS thread and hands it a [`WorkerContext`] carrying
//! the run's [`CancellationSignal`](crate::CancellationSignal).
//!
//! The loop should perform bounded units of work, check the signal at every
//! unit boundary and return promptly once it is requested. Returning
//! `Ok(())` or `Err(ServiceError::Cancelled)` after a stop request is a
//! graceful exit; returning anything else while running is a fault.

use std::sync::Arc;

use crate::error::ServiceError;
use crate::service::WorkerContext;

/// # Long-running, cooperatively cancelled service.
///
/// # Example
/// ```
/// use std::time::Duration;
/// use servicevisor::{Service, ServiceError, WorkerContext};
///
/// struct Ticker;
///
/// impl Service for Ticker {
///     fn main_loop(&self, ctx: &WorkerContext) -> Result<(), ServiceError> {
///         while !ctx.wait_for_stop(Duration::from_secs(1)).is_signalled() {
///             // tick...
///         }
///         Ok(())
///     }
/// }
/// ```
pub trait Service: Send + Sync + 'static {
    /// Runs until cancellation. Called once per start, on the worker thread.
    fn main_loop(&self, ctx: &WorkerContext) -> Result<(), ServiceError>;

    /// Pause hook, called on the controller's context when a Pause is accepted.
    ///
    /// Must return quickly. An error keeps the service `Running`.
    fn on_pause(&self) -> Result<(), ServiceError> {
        Ok(())
    }

    /// Continue hook, called when a Continue is accepted.
    ///
    /// Must return quickly. An error keeps the service `Paused`.
    fn on_continue(&self) -> Result<(), ServiceError> {
        Ok(())
    }
}

/// Shared handle to a service.
pub type ServiceRef = Arc<dyn Service>;
