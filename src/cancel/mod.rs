//! Cooperative cancellation.
//!
//! - [`CancellationSignal`] one-shot stop flag shared between controller and worker
//! - [`WaitOutcome`] result of a bounded wait
//! - [`Cancelled`] marker returned by [`CancellationSignal::check`]

mod signal;

pub use signal::{CancellationSignal, Cancelled, WaitOutcome};
