//! # Transient-error recovery loop.
//!
//! ```text
//! loop {
//!   ├─► stop requested? ─────────────────────────────► return
//!   ├─► unit(signal)
//!   │     ├─ Ok                      ─► failures = 0, continue
//!   │     ├─ Cancelled + requested   ─► return
//!   │     └─ Err / panic             ─► delay = policy.delay(failures)
//!   │                                   failures += 1
//!   │                                   wait_timeout(delay) signalled? ─► return
//!   └─► continue
//! }
//! ```
//!
//! ## Rules
//! - Cancellation is the **only** exit; there is no retry limit.
//! - Every failure, including one that happens right after a previous
//!   backoff, waits on the signal, so a stop during backoff is honored at once.
//! - Panics inside a unit are caught and treated as failures.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Duration;

use crate::cancel::CancellationSignal;
use crate::error::ServiceError;
use crate::policies::RecoveryPolicy;

/// Runs `unit` until `signal` is requested, backing off per `policy` after each failure.
///
/// Returns only after cancellation was requested. Failures are logged at
/// `warn` and never escalate.
///
/// # Example
/// ```
/// use std::time::Duration;
/// use servicevisor::{CancellationSignal, RecoveryPolicy, ServiceError, work_loop};
///
/// let signal = CancellationSignal::new();
/// let mut runs = 0;
/// work_loop(&signal, &RecoveryPolicy::fixed(Duration::from_millis(1)), |s| {
///     runs += 1;
///     if runs == 3 {
///         s.request();
///     }
///     Err(ServiceError::failed("flaky"))
/// });
/// assert_eq!(runs, 3);
/// ```
pub fn work_loop<F>(signal: &CancellationSignal, policy: &RecoveryPolicy, unit: F)
where
    F: FnMut(&CancellationSignal) -> Result<(), ServiceError>,
{
    run_recovering(signal, policy, unit, |_, _, _| {});
}

pub(crate) fn run_recovering<F, R>(
    signal: &CancellationSignal,
    policy: &RecoveryPolicy,
    mut unit: F,
    mut on_recover: R,
) where
    F: FnMut(&CancellationSignal) -> Result<(), ServiceError>,
    R: FnMut(&ServiceError, u32, Duration),
{
    let mut failures: u32 = 0;

    loop {
        if signal.is_requested() {
            return;
        }

        let err = match catch_unwind(AssertUnwindSafe(|| unit(signal))) {
            Ok(Ok(())) => {
                failures = 0;
                continue;
            }
            Ok(Err(ServiceError::Cancelled)) if signal.is_requested() => return,
            Ok(Err(err)) => err,
            Err(payload) => ServiceError::failed(format!(
                "panicked: {}",
                payload
                    .downcast_ref::<&str>()
                    .copied()
                    .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
                    .unwrap_or("unknown panic")
            )),
        };

        let delay = policy.delay(failures);
        failures = failures.saturating_add(1);
        tracing::warn!(error = %err, failures, delay_ms = delay.as_millis() as u64, "unit of work failed; backing off");
        on_recover(&err, failures, delay);

        if signal.wait_timeout(delay).is_signalled() {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::thread;
    use std::time::Instant;

    #[test]
    fn test_exits_immediately_when_already_requested() {
        let signal = CancellationSignal::new();
        signal.request();
        let mut runs = 0;
        work_loop(&signal, &RecoveryPolicy::fixed(Duration::from_secs(30)), |_| {
            runs += 1;
            Ok(())
        });
        assert_eq!(runs, 0);
    }

    #[test]
    fn test_failures_are_retried_until_cancelled() {
        let signal = CancellationSignal::new();
        let runs = Arc::new(AtomicU32::new(0));

        let worker = {
            let signal = signal.clone();
            let runs = runs.clone();
            thread::spawn(move || {
                work_loop(&signal, &RecoveryPolicy::fixed(Duration::from_millis(5)), |_| {
                    runs.fetch_add(1, Ordering::SeqCst);
                    Err(ServiceError::failed("always"))
                });
            })
        };

        thread::sleep(Duration::from_millis(100));
        signal.request();
        worker.join().expect("worker panicked");
        assert!(runs.load(Ordering::SeqCst) >= 2);
    }

    #[test]
    fn test_stop_during_backoff_is_honored_promptly() {
        let signal = CancellationSignal::new();
        let worker = {
            let signal = signal.clone();
            thread::spawn(move || {
                work_loop(&signal, &RecoveryPolicy::fixed(Duration::from_secs(30)), |_| {
                    Err(ServiceError::failed("down"))
                });
            })
        };

        thread::sleep(Duration::from_millis(50));
        let requested = Instant::now();
        signal.request();
        worker.join().expect("worker panicked");
        assert!(requested.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_huge_backoff_keeps_retrying_until_stop() {
        let signal = CancellationSignal::new();
        let failures = Arc::new(AtomicU32::new(0));

        let worker = {
            let signal = signal.clone();
            let failures = failures.clone();
            thread::spawn(move || {
                run_recovering(
                    &signal,
                    &RecoveryPolicy::fixed(Duration::from_secs(u64::MAX)),
                    |_| Err(ServiceError::failed("upstream gone")),
                    |_, n, delay| {
                        assert_eq!(delay, Duration::from_secs(u64::MAX));
                        failures.store(n, Ordering::SeqCst);
                    },
                );
            })
        };

        thread::sleep(Duration::from_millis(50));
        signal.request();
        worker.join().expect("backoff must not panic");
        assert_eq!(failures.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_panic_in_unit_is_recovered() {
        let signal = CancellationSignal::new();
        let mut runs = 0;
        let mut recovered = Vec::new();
        run_recovering(
            &signal,
            &RecoveryPolicy::fixed(Duration::from_millis(1)),
            |s| {
                runs += 1;
                if runs == 1 {
                    panic!("first unit explodes");
                }
                s.request();
                Ok(())
            },
            |err, failures, _| recovered.push((err.clone(), failures)),
        );
        assert_eq!(runs, 2);
        assert_eq!(recovered.len(), 1);
        assert_eq!(
            recovered[0].0,
            ServiceError::failed("panicked: first unit explodes")
        );
    }

    #[test]
    fn test_cancelled_without_request_counts_as_failure() {
        let signal = CancellationSignal::new();
        let mut runs = 0;
        let mut failures_seen = 0;
        run_recovering(
            &signal,
            &RecoveryPolicy::fixed(Duration::from_millis(1)),
            |s| {
                runs += 1;
                if runs == 2 {
                    s.request();
                }
                Err(ServiceError::Cancelled)
            },
            |_, _, _| failures_seen += 1,
        );
        assert_eq!(runs, 2);
        assert_eq!(failures_seen, 1);
    }

    #[test]
    fn test_success_resets_failure_count() {
        let signal = CancellationSignal::new();
        let policy = RecoveryPolicy::exponential(Duration::from_millis(1), Duration::from_secs(1), 2.0);
        let mut runs = 0;
        let mut delays = Vec::new();
        run_recovering(
            &signal,
            &policy,
            |s| {
                runs += 1;
                match runs {
                    1 | 2 => Err(ServiceError::failed("x")),
                    3 => Ok(()),
                    4 => Err(ServiceError::failed("y")),
                    _ => {
                        s.request();
                        Ok(())
                    }
                }
            },
            |_, failures, delay| delays.push((failures, delay)),
        );
        assert_eq!(
            delays,
            vec![
                (1, Duration::from_millis(1)),
                (2, Duration::from_millis(2)),
                (1, Duration::from_millis(1)),
            ]
        );
    }
}
