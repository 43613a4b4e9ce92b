//! # PosixDaemonAdapter: run under an init system.
//!
//! The init system starting the process is the Start request; later
//! requests arrive as signals:
//!
//! | signal    | request  |
//! |-----------|----------|
//! | `SIGTERM` | Stop     |
//! | `SIGINT`  | Shutdown |
//! | `SIGQUIT` | Shutdown |
//! | `SIGUSR1` | Pause    |
//! | `SIGUSR2` | Continue |
//!
//! Pause/Continue signals still go through the controller and are rejected
//! unless `can_pause_continue` is set.

use std::path::PathBuf;

use async_trait::async_trait;

use crate::config::ServiceHostingSettings;
use crate::core::{ControlHandle, ControlRequest, ServiceState, ServiceStatus};
use crate::error::RegistrationError;
use crate::platform::PlatformAdapter;
use crate::platform::signals::SignalMap;

/// Adapter for daemons supervised through POSIX signals.
#[derive(Debug, Default, Clone)]
pub struct PosixDaemonAdapter {
    pid_file: Option<PathBuf>,
}

impl PosixDaemonAdapter {
    /// Construct a new [`PosixDaemonAdapter`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes the process id to `path` on registration and removes it once stopped.
    #[must_use]
    pub fn with_pid_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.pid_file = Some(path.into());
        self
    }
}

#[async_trait]
impl PlatformAdapter for PosixDaemonAdapter {
    fn name(&self) -> &'static str {
        "posix-daemon"
    }

    async fn register(
        &self,
        settings: &ServiceHostingSettings,
        control: ControlHandle,
    ) -> Result<(), RegistrationError> {
        let mut signals = SignalMap::daemon()?;
        if let Some(path) = &self.pid_file {
            std::fs::write(path, format!("{}\n", std::process::id()))?;
        }
        tracing::info!(
            service = %settings.service_name,
            pid = std::process::id(),
            "registered as daemon"
        );

        tokio::spawn(async move {
            if control.post(ControlRequest::Start).await.is_err() {
                return;
            }
            loop {
                tokio::select! {
                    received = signals.recv() => match received {
                        Some(request) => {
                            tracing::debug!(request = %request, "signal received");
                            if control.post(request).await.is_err() {
                                return;
                            }
                        }
                        None => return,
                    },
                    _ = control.closed() => return,
                }
            }
        });
        Ok(())
    }

    fn report_status(&self, status: &ServiceStatus) {
        tracing::info!(
            state = %status.state,
            accepts_pause_continue = status.accepts_pause_continue,
            "daemon status"
        );
        if status.state == ServiceState::Stopped && status.stop.is_some() {
            if let Some(path) = &self.pid_file {
                if let Err(e) = std::fs::remove_file(path) {
                    tracing::warn!(path = %path.display(), error = %e, "failed to remove pid file");
                }
            }
        }
    }
}
