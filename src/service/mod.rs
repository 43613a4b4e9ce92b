//! # Service abstractions.
//!
//! - [`Service`] trait for the blocking main loop and pause/continue hooks
//! - [`ServiceFn`] closure-backed implementation, [`ServiceRef`] shared handle
//! - [`WorkerContext`] what the main loop receives (signal, recovery policy, runtime)
//! - [`work_loop`] the transient-error recovery loop

mod context;
mod hosted;
mod service_fn;
mod work;

pub use context::WorkerContext;
pub use hosted::{Service, ServiceRef};
pub use service_fn::ServiceFn;
pub use work::work_loop;
