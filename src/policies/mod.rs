//! Recovery policies for worker loops.
//!
//! ## Contents
//! - [`RecoveryPolicy`] how long to back off after a failed unit of work
//! - [`JitterPolicy`]   randomization to avoid synchronized retries
//!
//! ## Defaults
//! - `RecoveryPolicy::default()` → fixed 30s, no jitter.
//! - Services built from [`ServiceHostingSettings`](crate::ServiceHostingSettings)
//!   use `RecoveryPolicy::fixed(settings.error_backoff)`.

mod jitter;
mod recovery;

pub use jitter::JitterPolicy;
pub use recovery::RecoveryPolicy;
