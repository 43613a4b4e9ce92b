//! # Example: mini_service
//!
//! A minimal hosted service: one blocking main loop that pretends to work
//! for five seconds at a time and recovers from errors by backing off.
//!
//! ## Flow
//! ```text
//! entry::main()
//!   ├─► parse CLI (run | console | install | uninstall)
//!   ├─► HostRunner::run_blocking(service, adapter)
//!   │     ├─► adapter posts Start ─► worker thread "svc-MiniService"
//!   │     └─► MiniService::main_loop()
//!   │           └─► ctx.work_loop(unit)
//!   │                 ├─ unit: wait up to 5s, then check the signal
//!   │                 └─ Err ─► wait error_backoff (stop wakes it at once)
//!   └─► Ctrl-C / SIGTERM ─► Stop ─► StopPending ─► Stopped (exit code 0)
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example mini_service -- console
//! cargo run --example mini_service -- --shutdown-timeout 5s --log debug console
//! ```

use std::process::ExitCode;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use servicevisor::{Service, ServiceError, ServiceHostingSettings, WorkerContext, entry};

#[derive(Default)]
struct MiniService {
    units: AtomicU64,
}

impl Service for MiniService {
    fn main_loop(&self, ctx: &WorkerContext) -> Result<(), ServiceError> {
        ctx.work_loop(|signal| {
            // pretend to work hard
            signal.wait_timeout(Duration::from_secs(5));
            signal.check()?;

            let n = self.units.fetch_add(1, Ordering::Relaxed) + 1;
            println!("[mini] finished unit #{n}");
            Ok(())
        });
        println!("[mini] stop requested, leaving main loop");
        Ok(())
    }
}

fn main() -> ExitCode {
    let settings = ServiceHostingSettings::new("MiniService")
        .with_display_name("Minimal Service")
        .with_description("Minimal service description");

    entry::main(std::sync::Arc::new(MiniService::default()), settings)
}
