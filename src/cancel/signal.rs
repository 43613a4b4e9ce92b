//! # One-shot, broadcastable stop flag.
//!
//! [`CancellationSignal`] is shared by the controller (writer), the worker
//! supervisor (writer on stop) and the worker procedure (reader). It can be
//! observed three ways:
//! - non-blocking: [`CancellationSignal::is_requested`], [`CancellationSignal::check`];
//! - blocking with a deadline: [`CancellationSignal::wait_timeout`];
//! - async: [`CancellationSignal::cancelled`] (bridged through a [`CancellationToken`]).
//!
//! ## Rules
//! - `requested` is monotonic (`false → true`), never reverts.
//! - The flag and the condition variable are guarded by the **same** mutex,
//!   so a `request()` racing a `wait_timeout()` cannot be lost.
//! - `request()` happens-before any `is_requested() == true` observation
//!   (release store / acquire load).

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, SystemTime};

use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Outcome of a bounded wait on the signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The signal was (or already had been) requested.
    Signalled,
    /// The duration elapsed without a request.
    TimedOut,
}

impl WaitOutcome {
    /// True for [`WaitOutcome::Signalled`].
    #[inline]
    pub fn is_signalled(self) -> bool {
        matches!(self, WaitOutcome::Signalled)
    }
}

/// Distinguished "cancelled" outcome returned by [`CancellationSignal::check`].
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("cancellation requested")]
pub struct Cancelled;

struct Inner {
    requested: AtomicBool,
    /// First request timestamp; `Some` exactly when `requested` is set.
    requested_at: Mutex<Option<SystemTime>>,
    cond: Condvar,
    token: CancellationToken,
}

/// Thread-safe, one-shot stop flag with blocking and async wait primitives.
///
/// Cheap to clone: all clones observe the same flag.
#[derive(Clone)]
pub struct CancellationSignal {
    inner: Arc<Inner>,
}

impl CancellationSignal {
    /// Creates a fresh, unrequested signal.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                requested: AtomicBool::new(false),
                requested_at: Mutex::new(None),
                cond: Condvar::new(),
                token: CancellationToken::new(),
            }),
        }
    }

    /// Requests cancellation and wakes every current and future waiter.
    ///
    /// Idempotent: only the first call stamps [`requested_at`](Self::requested_at).
    pub fn request(&self) {
        {
            let mut at = self.lock();
            if at.is_none() {
                *at = Some(SystemTime::now());
                self.inner.requested.store(true, Ordering::Release);
            }
        }
        self.inner.cond.notify_all();
        self.inner.token.cancel();
    }

    /// Non-blocking read of the flag.
    #[inline]
    pub fn is_requested(&self) -> bool {
        self.inner.requested.load(Ordering::Acquire)
    }

    /// Returns `Err(Cancelled)` once the signal has been requested.
    ///
    /// Use with `?` inside a worker to unwind its own control flow on stop.
    #[inline]
    pub fn check(&self) -> Result<(), Cancelled> {
        if self.is_requested() {
            Err(Cancelled)
        } else {
            Ok(())
        }
    }

    /// Wall-clock time of the first [`request`](Self::request), if any.
    pub fn requested_at(&self) -> Option<SystemTime> {
        *self.lock()
    }

    /// Blocks the calling thread until the signal is requested or `timeout` elapses.
    ///
    /// Returns immediately with [`WaitOutcome::Signalled`] if already requested.
    /// Spurious condvar wakeups are absorbed by the predicate loop.
    pub fn wait_timeout(&self, timeout: Duration) -> WaitOutcome {
        let guard = self.lock();
        let (guard, _res) = self
            .inner
            .cond
            .wait_timeout_while(guard, timeout, |at| at.is_none())
            .unwrap_or_else(PoisonError::into_inner);

        if guard.is_some() {
            WaitOutcome::Signalled
        } else {
            WaitOutcome::TimedOut
        }
    }

    /// Blocks the calling thread until the signal is requested.
    pub fn wait(&self) {
        let guard = self.lock();
        let _guard = self
            .inner
            .cond
            .wait_while(guard, |at| at.is_none())
            .unwrap_or_else(PoisonError::into_inner);
    }

    /// Completes once the signal is requested (async workers).
    pub async fn cancelled(&self) {
        self.inner.token.cancelled().await;
    }

    /// Returns a child [`CancellationToken`] that is cancelled with this signal.
    ///
    /// Cancelling the returned token does **not** request the signal.
    pub fn token(&self) -> CancellationToken {
        self.inner.token.child_token()
    }

    fn lock(&self) -> MutexGuard<'_, Option<SystemTime>> {
        self.inner
            .requested_at
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for CancellationSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CancellationSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancellationSignal")
            .field("requested", &self.is_requested())
            .finish()
    }
}
