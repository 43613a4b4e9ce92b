//! # OS signals mapped to control requests.
//!
//! [`SignalMap`] listens to a fixed set of signals and yields the
//! [`ControlRequest`] bound to whichever arrives first.
//!
//! **Unix platforms:**
//! - console: `SIGINT` → Stop, `SIGTERM`/`SIGQUIT` → Shutdown
//! - daemon: `SIGTERM` → Stop, `SIGINT`/`SIGQUIT` → Shutdown,
//!   `SIGUSR1` → Pause, `SIGUSR2` → Continue
//!
//! **Other platforms:**
//! - `Ctrl-C` via [`tokio::signal::ctrl_c`] → Stop

use crate::core::ControlRequest;

#[cfg(unix)]
use tokio::signal::unix::{Signal, SignalKind, signal};

/// Listener over a set of OS signals.
pub(crate) struct SignalMap {
    #[cfg(unix)]
    bindings: Vec<(Signal, ControlRequest)>,
}

impl SignalMap {
    /// Signals understood by an interactive console run.
    ///
    /// Returns `Err` if signal registration fails. Must be called inside a tokio runtime.
    #[cfg(unix)]
    pub(crate) fn console() -> std::io::Result<Self> {
        Self::bind(&[
            (SignalKind::interrupt(), ControlRequest::Stop),
            (SignalKind::terminate(), ControlRequest::Shutdown),
            (SignalKind::quit(), ControlRequest::Shutdown),
        ])
    }

    /// Signals understood by a daemon launched by an init system.
    #[cfg(unix)]
    pub(crate) fn daemon() -> std::io::Result<Self> {
        Self::bind(&[
            (SignalKind::terminate(), ControlRequest::Stop),
            (SignalKind::interrupt(), ControlRequest::Shutdown),
            (SignalKind::quit(), ControlRequest::Shutdown),
            (SignalKind::user_defined1(), ControlRequest::Pause),
            (SignalKind::user_defined2(), ControlRequest::Continue),
        ])
    }

    #[cfg(unix)]
    fn bind(kinds: &[(SignalKind, ControlRequest)]) -> std::io::Result<Self> {
        let bindings = kinds
            .iter()
            .map(|&(kind, request)| signal(kind).map(|s| (s, request)))
            .collect::<std::io::Result<Vec<_>>>()?;
        Ok(Self { bindings })
    }

    /// Waits for the next signal and returns its request.
    ///
    /// Returns `None` once no more signals can be received.
    #[cfg(unix)]
    pub(crate) async fn recv(&mut self) -> Option<ControlRequest> {
        let waits = self
            .bindings
            .iter_mut()
            .map(|(sig, request)| {
                let request = *request;
                Box::pin(async move { sig.recv().await.map(|()| request) })
            })
            .collect::<Vec<_>>();
        if waits.is_empty() {
            return None;
        }
        let (received, _index, _rest) = futures::future::select_all(waits).await;
        received
    }

    /// Signals understood by an interactive console run.
    #[cfg(not(unix))]
    pub(crate) fn console() -> std::io::Result<Self> {
        Ok(Self {})
    }

    /// Waits for Ctrl-C and maps it to Stop.
    #[cfg(not(unix))]
    pub(crate) async fn recv(&mut self) -> Option<ControlRequest> {
        tokio::signal::ctrl_c().await.ok().map(|()| ControlRequest::Stop)
    }
}

impl std::fmt::Debug for SignalMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        #[cfg(unix)]
        {
            let requests: Vec<_> = self.bindings.iter().map(|(_, r)| *r).collect();
            f.debug_struct("SignalMap").field("requests", &requests).finish()
        }
        #[cfg(not(unix))]
        {
            f.debug_struct("SignalMap").finish()
        }
    }
}
