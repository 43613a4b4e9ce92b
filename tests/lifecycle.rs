use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use servicevisor::{
    ControlError, ControlHandle, ControlOutcome, ControlRequest, Event, EventKind, HostError,
    HostRunner, ManualAdapter, ManualControl, RunReport, ServiceError, ServiceFn, ServiceRef,
    ServiceState, StopCause, StopOutcome, Subscribe, WorkerContext, WorkerExit,
};
use tokio::task::JoinHandle;

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<Event>>,
}

impl Recorder {
    fn count(&self, kind: EventKind) -> usize {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.kind == kind)
            .count()
    }
}

#[async_trait]
impl Subscribe for Recorder {
    async fn on_event(&self, ev: &Event) {
        self.events.lock().unwrap().push(ev.clone());
    }

    fn name(&self) -> &'static str {
        "recorder"
    }
}

struct Harness {
    control: ManualControl,
    handle: ControlHandle,
    recorder: Arc<Recorder>,
    run: JoinHandle<Result<RunReport, HostError>>,
}

async fn host(settings: servicevisor::ServiceHostingSettings, service: ServiceRef) -> Harness {
    let (adapter, control) = ManualAdapter::new();
    let recorder = Arc::new(Recorder::default());
    let runner = HostRunner::builder(settings)
        .with_subscriber(recorder.clone())
        .build();
    let run = tokio::spawn(runner.run(service, Arc::new(adapter)));
    let handle = control.handle().await.expect("registration succeeds");
    Harness {
        control,
        handle,
        recorder,
        run,
    }
}

fn settings(name: &str) -> servicevisor::ServiceHostingSettings {
    servicevisor::ServiceHostingSettings::new(name).with_shutdown_timeout(Duration::from_secs(5))
}

/// Checks the signal once per second, like a slow polling service.
fn slow_poller() -> ServiceRef {
    ServiceFn::arc(|ctx: &WorkerContext| {
        while !ctx.is_stop_requested() {
            ctx.wait_for_stop(Duration::from_secs(1));
        }
        Ok(())
    })
}

#[tokio::test(flavor = "multi_thread")]
async fn start_then_stop_is_graceful() {
    let h = host(settings("graceful"), slow_poller()).await;

    h.handle.send(ControlRequest::Start).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let requested = Instant::now();
    let outcome = h.handle.send(ControlRequest::Stop).await.unwrap();
    assert!(requested.elapsed() < Duration::from_millis(1500));
    assert_eq!(
        outcome,
        ControlOutcome::Stopped(StopOutcome::Graceful(WorkerExit::Cancelled))
    );

    let report = h.run.await.unwrap().unwrap();
    assert_eq!(report.exit_code(), RunReport::EXIT_OK);
    assert_eq!(h.handle.state(), ServiceState::Stopped);
    assert_eq!(
        h.control.states(),
        vec![
            ServiceState::Stopped,
            ServiceState::StartPending,
            ServiceState::Running,
            ServiceState::StopPending,
            ServiceState::Stopped,
        ]
    );
    assert_eq!(h.recorder.count(EventKind::StoppedWithin), 1);
    assert_eq!(h.recorder.count(EventKind::StopTimeoutExceeded), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn stubborn_worker_is_forced_after_timeout() {
    let svc = ServiceFn::arc(|_ctx: &WorkerContext| {
        std::thread::sleep(Duration::from_secs(5));
        Ok(())
    });
    let timeout = Duration::from_millis(300);
    let h = host(settings("stubborn").with_shutdown_timeout(timeout), svc).await;

    h.handle.send(ControlRequest::Start).await.unwrap();

    let requested = Instant::now();
    let outcome = h.handle.send(ControlRequest::Stop).await.unwrap();
    let waited = requested.elapsed();
    assert!(waited >= timeout, "stop returned early: {waited:?}");
    assert!(waited < Duration::from_secs(2), "stop returned late: {waited:?}");
    assert_eq!(outcome, ControlOutcome::Stopped(StopOutcome::Forced { timeout }));

    let report = h.run.await.unwrap().unwrap();
    assert_eq!(report.exit_code(), RunReport::EXIT_FORCED_STOP);
    assert_eq!(h.recorder.count(EventKind::StopTimeoutExceeded), 1);
    let last = h.control.last_status().unwrap();
    assert_eq!(last.state, ServiceState::Stopped);
    assert_eq!(last.stop, Some(StopOutcome::Forced { timeout }));
}

#[tokio::test(flavor = "multi_thread")]
async fn pause_without_capability_is_unsupported() {
    let h = host(settings("no-pause"), slow_poller()).await;
    h.handle.send(ControlRequest::Start).await.unwrap();

    for request in [ControlRequest::Pause, ControlRequest::Continue] {
        assert_eq!(
            h.handle.send(request).await,
            Err(ControlError::UnsupportedOperation { request })
        );
        assert_eq!(h.handle.state(), ServiceState::Running);
    }

    h.handle.send(ControlRequest::Stop).await.unwrap();
    h.run.await.unwrap().unwrap();
    assert_eq!(h.recorder.count(EventKind::ControlRejected), 2);
    assert!(!h.control.states().contains(&ServiceState::PausePending));
}

#[tokio::test(flavor = "multi_thread")]
async fn back_to_back_stops_are_coalesced() {
    let h = host(settings("double-stop"), slow_poller()).await;
    h.handle.send(ControlRequest::Start).await.unwrap();

    let first = h.handle.clone();
    let second = h.handle.clone();
    let (a, b) = tokio::join!(
        first.send(ControlRequest::Stop),
        second.send(ControlRequest::Stop)
    );

    let outcomes = [a.unwrap(), b.unwrap()];
    let stopped = outcomes
        .iter()
        .filter(|o| matches!(o, ControlOutcome::Stopped(_)))
        .count();
    let coalesced = outcomes
        .iter()
        .filter(|o| {
            matches!(
                o,
                ControlOutcome::Coalesced {
                    state: ServiceState::Stopped
                }
            )
        })
        .count();
    assert_eq!((stopped, coalesced), (1, 1));

    h.run.await.unwrap().unwrap();
    assert_eq!(h.recorder.count(EventKind::StopRequested), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn transient_failures_keep_the_service_running() {
    let svc = ServiceFn::arc(|ctx: &WorkerContext| {
        ctx.work_loop(|_signal| Err(ServiceError::failed("upstream unavailable")));
        Ok(())
    });
    let settings = settings("flaky").with_error_backoff(Duration::from_millis(50));
    let h = host(settings, svc).await;

    h.handle.send(ControlRequest::Start).await.unwrap();
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(h.handle.state(), ServiceState::Running);

    let outcome = h.handle.send(ControlRequest::Stop).await.unwrap();
    assert_eq!(
        outcome,
        ControlOutcome::Stopped(StopOutcome::Graceful(WorkerExit::Cancelled))
    );
    h.run.await.unwrap().unwrap();

    assert!(h.recorder.count(EventKind::WorkerRecovering) >= 3);
    assert_eq!(h.recorder.count(EventKind::WorkerFaulted), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn unbounded_backoff_still_waits_for_stop() {
    let svc = ServiceFn::arc(|ctx: &WorkerContext| {
        ctx.work_loop(|_signal| Err(ServiceError::failed("upstream unavailable")));
        Ok(())
    });
    let settings = settings("patient").with_error_backoff(Duration::from_secs(u64::MAX));
    let h = host(settings, svc).await;

    h.handle.send(ControlRequest::Start).await.unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(h.handle.state(), ServiceState::Running);

    let outcome = h.handle.send(ControlRequest::Stop).await.unwrap();
    assert_eq!(
        outcome,
        ControlOutcome::Stopped(StopOutcome::Graceful(WorkerExit::Cancelled))
    );
    let report = h.run.await.unwrap().unwrap();
    assert_eq!(report.cause, StopCause::Requested(ControlRequest::Stop));
    assert_eq!(h.recorder.count(EventKind::WorkerRecovering), 1);
    assert_eq!(h.recorder.count(EventKind::WorkerFaulted), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn fault_outside_the_retry_loop_stops_the_service() {
    let svc = ServiceFn::arc(|_ctx: &WorkerContext| {
        Err(ServiceError::failed("configuration missing"))
    });
    let h = host(settings("faulty"), svc).await;
    h.handle.send(ControlRequest::Start).await.unwrap();

    let report = h.run.await.unwrap().unwrap();
    assert_eq!(report.cause, StopCause::WorkerExited);
    assert_eq!(report.exit_code(), RunReport::EXIT_WORKER_FAULT);
    assert_eq!(h.recorder.count(EventKind::WorkerFaulted), 1);
    assert_eq!(h.control.states().last(), Some(&ServiceState::Stopped));
    assert_eq!(h.handle.send(ControlRequest::Start).await, Err(ControlError::Closed));
}

#[tokio::test(flavor = "multi_thread")]
async fn pause_and_continue_call_the_hooks() {
    struct Hooks {
        calls: Mutex<Vec<&'static str>>,
    }

    impl servicevisor::Service for Hooks {
        fn main_loop(&self, ctx: &WorkerContext) -> Result<(), ServiceError> {
            ctx.signal().wait();
            Ok(())
        }

        fn on_pause(&self) -> Result<(), ServiceError> {
            self.calls.lock().unwrap().push("pause");
            Ok(())
        }

        fn on_continue(&self) -> Result<(), ServiceError> {
            self.calls.lock().unwrap().push("continue");
            Ok(())
        }
    }

    let svc = Arc::new(Hooks {
        calls: Mutex::new(Vec::new()),
    });
    let h = host(settings("pausable").with_pause_continue(true), svc.clone()).await;

    h.handle.send(ControlRequest::Start).await.unwrap();
    h.handle.send(ControlRequest::Pause).await.unwrap();
    assert_eq!(h.handle.state(), ServiceState::Paused);
    assert!(h.control.last_status().unwrap().accepts_pause_continue);
    h.handle.send(ControlRequest::Continue).await.unwrap();
    h.handle.send(ControlRequest::Stop).await.unwrap();
    h.run.await.unwrap().unwrap();

    assert_eq!(*svc.calls.lock().unwrap(), vec!["pause", "continue"]);
}

#[tokio::test(flavor = "multi_thread")]
async fn registration_failure_is_propagated() {
    let (adapter, control) = ManualAdapter::rejecting("service manager unavailable");
    let res = HostRunner::new(settings("unregistered"))
        .run(slow_poller(), Arc::new(adapter))
        .await;

    match res {
        Err(HostError::Registration(err)) => assert_eq!(err.as_label(), "registration_rejected"),
        other => panic!("expected registration failure, got {other:?}"),
    }
    assert!(control.handle().await.is_none());
    assert!(control.states().is_empty());
}
