//! # Function-backed service (`ServiceFn`)
//!
//! [`ServiceFn`] wraps a closure `Fn(&WorkerContext) -> Result<(), ServiceError>`
//! so small services need no dedicated type. Pause/continue hooks keep their
//! default no-op behavior.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use servicevisor::{ServiceFn, ServiceRef, WorkerContext};
//!
//! let svc: ServiceRef = ServiceFn::arc(|ctx: &WorkerContext| {
//!     ctx.work_loop(|signal| {
//!         // pretend to work hard
//!         signal.wait_timeout(Duration::from_secs(5));
//!         Ok(())
//!     });
//!     Ok(())
//! });
//! # let _ = svc;
//! ```

use std::sync::Arc;

use crate::error::ServiceError;
use crate::service::{Service, WorkerContext};

/// Closure-backed [`Service`].
pub struct ServiceFn<F> {
    f: F,
}

impl<F> ServiceFn<F>
where
    F: Fn(&WorkerContext) -> Result<(), ServiceError> + Send + Sync + 'static,
{
    /// Wraps `f` as a service.
    pub fn new(f: F) -> Self {
        Self { f }
    }

    /// Wraps `f` and returns it as a shared handle.
    pub fn arc(f: F) -> Arc<Self> {
        Arc::new(Self::new(f))
    }
}

impl<F> Service for ServiceFn<F>
where
    F: Fn(&WorkerContext) -> Result<(), ServiceError> + Send + Sync + 'static,
{
    fn main_loop(&self, ctx: &WorkerContext) -> Result<(), ServiceError> {
        (self.f)(ctx)
    }
}

impl<F> std::fmt::Debug for ServiceFn<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceFn").finish_non_exhaustive()
    }
}
