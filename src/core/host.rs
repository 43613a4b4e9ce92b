//! # HostRunner: entry point of a hosted service.
//!
//! Wires the adapter, the controller and event subscribers together, then
//! blocks (asynchronously) until the service is stopped.
//!
//! ```text
//! run(service, adapter)
//!   ├─► settings.validate()                 (error → HostError::InvalidSettings)
//!   ├─► Bus::new(bus_capacity)
//!   ├─► subscriber listener: Bus ─► SubscriberSet::emit(&Event)
//!   ├─► LifecycleController::new(...) ─► spawn, gated on registration
//!   ├─► adapter.register(settings, handle)
//!   │     ├─ Err ─► drop gate (controller exits idle) ─► HostError::Registration
//!   │     └─ Ok  ─► open gate
//!   ├─► await controller ─► RunReport
//!   └─► flush listener (bounded) ─► Ok(RunReport)
//! ```
//!
//! ## Rules
//! - No worker starts before registration succeeded.
//! - Events published before `run` returns reach every subscriber, unless the
//!   flush exceeds its bound or a subscriber queue overflowed.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::ServiceHostingSettings;
use crate::core::controller::{LifecycleController, RunReport};
use crate::error::HostError;
use crate::events::Bus;
use crate::platform::PlatformAdapter;
use crate::service::ServiceRef;
use crate::subscribers::{LogWriter, Subscribe, SubscriberSet};

/// Upper bound for delivering the remaining events once the run is over.
const FLUSH_TIMEOUT: Duration = Duration::from_secs(2);

/// Runs one service under a platform adapter.
pub struct HostRunner {
    settings: ServiceHostingSettings,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

/// Builder for [`HostRunner`].
pub struct HostRunnerBuilder {
    settings: ServiceHostingSettings,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl HostRunnerBuilder {
    /// Replaces the event subscribers (default: a single [`LogWriter`]).
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Adds one subscriber to the current set.
    pub fn with_subscriber(mut self, subscriber: Arc<dyn Subscribe>) -> Self {
        self.subscribers.push(subscriber);
        self
    }

    /// Builds the runner.
    pub fn build(self) -> HostRunner {
        HostRunner {
            settings: self.settings,
            subscribers: self.subscribers,
        }
    }
}

impl HostRunner {
    /// Runner with default subscribers.
    pub fn new(settings: ServiceHostingSettings) -> Self {
        Self::builder(settings).build()
    }

    /// Starts a builder.
    pub fn builder(settings: ServiceHostingSettings) -> HostRunnerBuilder {
        HostRunnerBuilder {
            settings,
            subscribers: vec![Arc::new(LogWriter::new())],
        }
    }

    /// Settings this runner was built with.
    pub fn settings(&self) -> &ServiceHostingSettings {
        &self.settings
    }

    /// Hosts `service` under `adapter` until it stops.
    ///
    /// # Errors
    /// - [`HostError::InvalidSettings`] settings failed validation; nothing ran.
    /// - [`HostError::Registration`] the adapter failed; no worker was started.
    /// - [`HostError::ControllerLost`] the controller task panicked or was cancelled.
    ///
    /// Worker faults and forced stops are not errors: they are described by
    /// the returned [`RunReport`].
    pub async fn run(
        self,
        service: ServiceRef,
        adapter: Arc<dyn PlatformAdapter>,
    ) -> Result<RunReport, HostError> {
        self.settings.validate()?;
        let settings = Arc::new(self.settings);

        let bus = Bus::new(settings.bus_capacity_clamped());
        let listener = Listener::spawn(&bus, self.subscribers);

        let (controller, handle) =
            LifecycleController::new(Arc::clone(&settings), service, Arc::clone(&adapter), bus);
        let (gate_tx, gate_rx) = oneshot::channel::<()>();
        let controller = tokio::spawn(async move {
            match gate_rx.await {
                Ok(()) => Some(controller.run().await),
                Err(_) => None,
            }
        });

        tracing::debug!(
            service = %settings.service_name,
            adapter = adapter.name(),
            "registering service"
        );
        if let Err(err) = adapter.register(&settings, handle).await {
            drop(gate_tx);
            let _ = controller.await;
            listener.flush().await;
            return Err(HostError::Registration(err));
        }
        let _ = gate_tx.send(());

        let report = match controller.await {
            Ok(Some(report)) => report,
            Ok(None) | Err(_) => {
                listener.flush().await;
                return Err(HostError::ControllerLost);
            }
        };
        listener.flush().await;
        Ok(report)
    }

    /// Builds a multi-threaded runtime and calls [`run`](Self::run) on it.
    ///
    /// Detached worker threads (forced stops) do not keep the runtime alive.
    pub fn run_blocking(
        self,
        service: ServiceRef,
        adapter: Arc<dyn PlatformAdapter>,
    ) -> Result<RunReport, HostError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .thread_name("servicevisor-rt")
            .build()
            .map_err(HostError::Runtime)?;
        let result = runtime.block_on(self.run(service, adapter));
        runtime.shutdown_background();
        result
    }
}

impl std::fmt::Debug for HostRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostRunner")
            .field("settings", &self.settings)
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

/// Forwards bus events to the subscriber set until flushed.
struct Listener {
    done: CancellationToken,
    task: JoinHandle<()>,
}

impl Listener {
    /// Subscribes before returning, so no event published afterwards is missed.
    fn spawn(bus: &Bus, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        let mut rx = bus.subscribe();
        let set = SubscriberSet::new(subscribers, bus.clone());
        let done = CancellationToken::new();
        let stop = done.clone();

        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    received = rx.recv() => match received {
                        Ok(ev) => set.emit(&ev),
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::warn!(skipped, "event listener lagged; events dropped");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                    _ = stop.cancelled() => break,
                }
            }
            loop {
                match rx.try_recv() {
                    Ok(ev) => set.emit(&ev),
                    Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                    Err(_) => break,
                }
            }
            set.shutdown().await;
        });

        Self { done, task }
    }

    async fn flush(self) {
        self.done.cancel();
        if tokio::time::timeout(FLUSH_TIMEOUT, self.task).await.is_err() {
            tracing::warn!(
                timeout_ms = FLUSH_TIMEOUT.as_millis() as u64,
                "event subscribers did not drain in time"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ControlRequest;
    use crate::platform::ManualAdapter;
    use crate::service::{ServiceFn, WorkerContext};

    fn cooperative() -> ServiceRef {
        ServiceFn::arc(|ctx: &WorkerContext| {
            ctx.signal().wait();
            Ok(())
        })
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_invalid_settings_fail_fast() {
        let (adapter, _control) = ManualAdapter::new();
        let res = HostRunner::new(ServiceHostingSettings::new(""))
            .run(cooperative(), Arc::new(adapter))
            .await;
        assert!(matches!(res, Err(HostError::InvalidSettings { .. })));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_rejected_registration_never_starts_worker() {
        let started = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let flag = Arc::clone(&started);
        let svc = ServiceFn::arc(move |ctx: &WorkerContext| {
            flag.store(true, std::sync::atomic::Ordering::SeqCst);
            ctx.signal().wait();
            Ok(())
        });

        let (adapter, control) = ManualAdapter::rejecting("access denied");
        let res = HostRunner::new(ServiceHostingSettings::new("reject"))
            .run(svc, Arc::new(adapter))
            .await;

        assert!(matches!(res, Err(HostError::Registration(_))));
        assert!(control.handle().await.is_none());
        assert!(!started.load(std::sync::atomic::Ordering::SeqCst));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_run_returns_report_after_stop() {
        let (adapter, control) = ManualAdapter::new();
        let host = HostRunner::builder(ServiceHostingSettings::new("host-test"))
            .with_subscribers(Vec::new())
            .build();
        let run = tokio::spawn(host.run(cooperative(), Arc::new(adapter)));

        let handle = control.handle().await.unwrap();
        handle.send(ControlRequest::Start).await.unwrap();
        handle.send(ControlRequest::Stop).await.unwrap();

        let report = run.await.unwrap().unwrap();
        assert!(report.is_clean());
        assert_eq!(control.states().last(), Some(&crate::ServiceState::Stopped));
    }
}
