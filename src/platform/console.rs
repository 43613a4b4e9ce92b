//! # ConsoleAdapter: run in the foreground.
//!
//! ```text
//! register()
//!   ├─► SignalMap::console()          (errors → RegistrationError::Io)
//!   └─► spawn:
//!         post(Start)
//!         loop select! {
//!           signal ─► post(request)   (first Ctrl-C → Stop)
//!           controller closed ─► exit
//!         }
//! ```
//!
//! Status reports are written through `tracing` at `info`.

use async_trait::async_trait;

use crate::config::ServiceHostingSettings;
use crate::core::{ControlHandle, ControlRequest, ServiceStatus};
use crate::error::RegistrationError;
use crate::platform::PlatformAdapter;
use crate::platform::signals::SignalMap;

/// Adapter for interactive runs and development.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleAdapter;

impl ConsoleAdapter {
    /// Construct a new [`ConsoleAdapter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PlatformAdapter for ConsoleAdapter {
    fn name(&self) -> &'static str {
        "console"
    }

    async fn register(
        &self,
        settings: &ServiceHostingSettings,
        control: ControlHandle,
    ) -> Result<(), RegistrationError> {
        let mut signals = SignalMap::console()?;
        tracing::info!(
            service = %settings.service_name,
            display_name = settings.effective_display_name(),
            "running in console mode; press Ctrl-C to stop"
        );

        tokio::spawn(async move {
            if control.post(ControlRequest::Start).await.is_err() {
                return;
            }
            loop {
                tokio::select! {
                    received = signals.recv() => match received {
                        Some(request) => {
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
        match &status.stop {
            Some(stop) => tracing::info!(state = %status.state, stop = ?stop, "service status"),
            None => tracing::info!(state = %status.state, "service status"),
        }
    }
}
