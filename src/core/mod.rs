//! Runtime core: service state machine, worker supervision and the host entry point.
//!
//! Internal modules:
//! - [`state`]: service states, control requests, status reports;
//! - [`worker`]: runs the main loop on a dedicated thread, bounded-time stop;
//! - [`controller`]: serializes control requests and drives transitions;
//! - [`host`]: wires adapter, controller and subscribers for one run.

mod controller;
mod host;
mod state;
mod worker;

pub use controller::{ControlHandle, ControlOutcome, LifecycleController, RunReport, StopCause};
pub use host::{HostRunner, HostRunnerBuilder};
pub use state::{ControlRequest, ServiceState, ServiceStatus};
pub use worker::{Launch, StopOutcome, WorkerExit, WorkerSupervisor};
