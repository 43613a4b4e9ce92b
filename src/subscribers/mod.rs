//! # Event subscribers.
//!
//! ```text
//! Controller / WorkerSupervisor ── publish(Event) ──► Bus ──► host listener
//!                                                                 │
//!                                                          SubscriberSet::emit
//!                                                      ┌──────────┼──────────┐
//!                                                      ▼          ▼          ▼
//!                                                  LogWriter   Metrics    Custom
//! ```
//!
//! - [`Subscribe`] extension trait
//! - [`SubscriberSet`] per-subscriber queues, overflow and panic isolation
//! - [`LogWriter`] built-in `tracing` renderer

mod log;
mod set;
mod subscribe;

pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscribe::Subscribe;
