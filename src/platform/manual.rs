//! # ManualAdapter: control requests from code.
//!
//! For embedding the host under a service manager that talks to the process
//! through some other channel, and for tests. The adapter hands the
//! [`ControlHandle`] to its [`ManualControl`] and records every status report.
//!
//! ## Example
//! ```rust,no_run
//! use std::sync::Arc;
//! use servicevisor::{
//!     ControlRequest, HostRunner, ManualAdapter, ServiceFn, ServiceHostingSettings, WorkerContext,
//! };
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let (adapter, control) = ManualAdapter::new();
//! let svc = ServiceFn::arc(|ctx: &WorkerContext| {
//!     ctx.signal().wait();
//!     Ok(())
//! });
//!
//! let host = HostRunner::new(ServiceHostingSettings::new("embedded"));
//! let run = tokio::spawn(host.run(svc, Arc::new(adapter)));
//!
//! let handle = control.handle().await.expect("registered");
//! handle.send(ControlRequest::Start).await?;
//! handle.send(ControlRequest::Stop).await?;
//! let report = run.await??;
//! assert!(report.is_clean());
//! # Ok(())
//! # }
//! ```

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tokio::sync::watch;

use crate::config::ServiceHostingSettings;
use crate::core::{ControlHandle, ServiceState, ServiceStatus};
use crate::error::RegistrationError;
use crate::platform::PlatformAdapter;

#[derive(Clone)]
enum Registration {
    Pending,
    Registered(ControlHandle),
    Rejected,
}

struct Shared {
    registration: watch::Sender<Registration>,
    statuses: Mutex<Vec<ServiceStatus>>,
}

impl Shared {
    fn statuses(&self) -> MutexGuard<'_, Vec<ServiceStatus>> {
        self.statuses.lock().unwrap_or_else(|p| p.into_inner())
    }
}

/// Adapter driven entirely through a [`ManualControl`].
pub struct ManualAdapter {
    shared: Arc<Shared>,
    rejection: Option<String>,
}

/// Code-side half of a [`ManualAdapter`].
#[derive(Clone)]
pub struct ManualControl {
    shared: Arc<Shared>,
}

impl ManualAdapter {
    /// Creates an adapter and its control half.
    #[must_use]
    pub fn new() -> (Self, ManualControl) {
        let (registration, _) = watch::channel(Registration::Pending);
        let shared = Arc::new(Shared {
            registration,
            statuses: Mutex::new(Vec::new()),
        });
        let control = ManualControl {
            shared: Arc::clone(&shared),
        };
        (
            Self {
                shared,
                rejection: None,
            },
            control,
        )
    }

    /// Creates an adapter whose registration fails with `reason`.
    #[must_use]
    pub fn rejecting(reason: impl Into<String>) -> (Self, ManualControl) {
        let (mut adapter, control) = Self::new();
        adapter.rejection = Some(reason.into());
        (adapter, control)
    }
}

impl ManualControl {
    /// Waits for registration and returns the control handle.
    ///
    /// Returns `None` if registration was rejected.
    pub async fn handle(&self) -> Option<ControlHandle> {
        let mut rx = self.shared.registration.subscribe();
        let reg = rx
            .wait_for(|r| !matches!(r, Registration::Pending))
            .await
            .ok()?
            .clone();
        match reg {
            Registration::Registered(handle) => Some(handle),
            _ => None,
        }
    }

    /// Every status reported so far, oldest first.
    pub fn statuses(&self) -> Vec<ServiceStatus> {
        self.shared.statuses().clone()
    }

    /// The states of every status reported so far.
    pub fn states(&self) -> Vec<ServiceState> {
        self.shared.statuses().iter().map(|s| s.state).collect()
    }

    /// The most recent status.
    pub fn last_status(&self) -> Option<ServiceStatus> {
        self.shared.statuses().last().cloned()
    }
}

#[async_trait]
impl PlatformAdapter for ManualAdapter {
    fn name(&self) -> &'static str {
        "manual"
    }

    async fn register(
        &self,
        _settings: &ServiceHostingSettings,
        control: ControlHandle,
    ) -> Result<(), RegistrationError> {
        if let Some(reason) = &self.rejection {
            self.shared.registration.send_replace(Registration::Rejected);
            return Err(RegistrationError::Rejected {
                reason: reason.clone(),
            });
        }
        self.shared
            .registration
            .send_replace(Registration::Registered(control));
        Ok(())
    }

    fn report_status(&self, status: &ServiceStatus) {
        self.shared.statuses().push(status.clone());
    }
}

impl std::fmt::Debug for ManualAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManualAdapter")
            .field("rejection", &self.rejection)
            .finish_non_exhaustive()
    }
}

impl std::fmt::Debug for ManualControl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManualControl")
            .field("statuses", &self.shared.statuses().len())
            .finish()
    }
}
