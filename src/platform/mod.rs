//! # Platform adapters.
//!
//! A [`PlatformAdapter`] is the seam between the host and whatever service
//! manager launched the process. It registers the service, turns the
//! manager's notifications into [`ControlRequest`](crate::ControlRequest)s and
//! receives a [`ServiceStatus`] on every state change.
//!
//! Provided adapters:
//! - [`ConsoleAdapter`] interactive runs: Start at once, Ctrl-C stops
//! - [`PosixDaemonAdapter`] (unix) signals from an init system mapped to requests
//! - [`ManualAdapter`] requests come from code through a [`ManualControl`]

mod console;
mod manual;
#[cfg(unix)]
mod posix;
mod signals;

use async_trait::async_trait;

use crate::config::ServiceHostingSettings;
use crate::core::{ControlHandle, ServiceStatus};
use crate::error::RegistrationError;

pub use console::ConsoleAdapter;
pub use manual::{ManualAdapter, ManualControl};
#[cfg(unix)]
pub use posix::PosixDaemonAdapter;

/// Connection to the OS service manager.
///
/// # Contract
/// - `register` wires the adapter and returns promptly. It must not await
///   [`ControlHandle::send`]: the controller starts consuming requests only
///   after registration succeeded. Spawn a task or use
///   [`ControlHandle::post`]/[`ControlHandle::try_send`] instead.
/// - A registration error aborts the run before any worker starts.
/// - `report_status` is called from the controller task and must not block.
#[async_trait]
pub trait PlatformAdapter: Send + Sync + 'static {
    /// Short adapter name for logs and errors.
    fn name(&self) -> &'static str;

    /// Registers with the service manager and starts delivering requests to `control`.
    async fn register(
        &self,
        settings: &ServiceHostingSettings,
        control: ControlHandle,
    ) -> Result<(), RegistrationError>;

    /// Reports the current status to the service manager.
    fn report_status(&self, status: &ServiceStatus);

    /// Installs the service with the service manager.
    async fn install(&self, _settings: &ServiceHostingSettings) -> Result<(), RegistrationError> {
        Err(RegistrationError::Unsupported {
            adapter: self.name(),
            operation: "install",
        })
    }

    /// Removes the service from the service manager.
    async fn uninstall(&self, _settings: &ServiceHostingSettings) -> Result<(), RegistrationError> {
        Err(RegistrationError::Unsupported {
            adapter: self.name(),
            operation: "uninstall",
        })
    }
}
