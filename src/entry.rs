//! # Process entry point.
//!
//! Turns a hosted service into a complete executable:
//!
//! ```text
//! fn main() -> ExitCode {
//!     servicevisor::entry::main(service, settings)
//! }
//!
//! <bin> [--shutdown-timeout 10s] [--error-backoff 500ms] [--log debug] [run|console|install|uninstall]
//! ```
//!
//! | command     | adapter                                         |
//! |-------------|-------------------------------------------------|
//! | `run`       | [`PosixDaemonAdapter`] on unix, console elsewhere (default) |
//! | `console`   | [`ConsoleAdapter`]                              |
//! | `install`   | platform adapter's `install`                    |
//! | `uninstall` | platform adapter's `uninstall`                  |
//!
//! Exit codes follow [`RunReport::exit_code`], plus [`EXIT_UNSUPPORTED`] when the
//! adapter does not implement the requested command.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::config::ServiceHostingSettings;
use crate::core::{HostRunner, RunReport};
use crate::error::{HostError, RegistrationError};
use crate::platform::{ConsoleAdapter, PlatformAdapter};
use crate::service::ServiceRef;

/// Exit code when the adapter does not support the command.
pub const EXIT_UNSUPPORTED: u8 = 4;

/// Command line of a hosted service.
#[derive(Parser, Debug, Clone)]
#[command(version, about)]
pub struct Cli {
    /// What to do (default: run).
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Override the shutdown timeout (e.g. `30s`, `500ms`, `2m`).
    #[arg(long, global = true, value_parser = parse_duration)]
    pub shutdown_timeout: Option<Duration>,

    /// Override the backoff after a transient worker error.
    #[arg(long, global = true, value_parser = parse_duration)]
    pub error_backoff: Option<Duration>,

    /// Log filter used when `RUST_LOG` is not set.
    #[arg(long, global = true, default_value = "info")]
    pub log: String,
}

/// Subcommands.
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Run under the platform's service manager.
    Run,
    /// Run in the foreground; Ctrl-C stops.
    Console,
    /// Register the service with the service manager.
    Install,
    /// Remove the service from the service manager.
    Uninstall,
}

impl Cli {
    /// Applies the command line overrides to `settings`.
    pub fn apply(&self, mut settings: ServiceHostingSettings) -> ServiceHostingSettings {
        if let Some(timeout) = self.shutdown_timeout {
            settings.shutdown_timeout = timeout;
        }
        if let Some(backoff) = self.error_backoff {
            settings.error_backoff = backoff;
        }
        settings
    }
}

/// Parses `500ms`, `30s`, `2m`, `1h` or a bare number of seconds.
pub fn parse_duration(raw: &str) -> Result<Duration, String> {
    let raw = raw.trim();
    let split = raw
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(raw.len());
    let (digits, unit) = raw.split_at(split);
    let value: u64 = digits
        .parse()
        .map_err(|_| format!("invalid duration `{raw}`"))?;
    match unit.trim() {
        "ms" => Ok(Duration::from_millis(value)),
        "" | "s" => Ok(Duration::from_secs(value)),
        "m" => Ok(Duration::from_secs(value.saturating_mul(60))),
        "h" => Ok(Duration::from_secs(value.saturating_mul(3600))),
        other => Err(format!("unknown duration unit `{other}` (use ms, s, m, h)")),
    }
}

/// Installs a `tracing` fmt subscriber filtered by `RUST_LOG`, else by `default_filter`.
///
/// Does nothing if a global subscriber is already installed.
pub fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// Parses the process arguments and runs `service`.
pub fn main(service: ServiceRef, settings: ServiceHostingSettings) -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli.log);
    ExitCode::from(run_cli(&cli, service, settings))
}

/// Runs `service` as directed by `cli` and returns the process exit code.
pub fn run_cli(cli: &Cli, service: ServiceRef, settings: ServiceHostingSettings) -> u8 {
    let settings = cli.apply(settings);
    let command = cli.command.unwrap_or(Command::Run);

    let adapter: Arc<dyn PlatformAdapter> = match command {
        Command::Console => Arc::new(ConsoleAdapter::new()),
        Command::Run | Command::Install | Command::Uninstall => platform_adapter(),
    };

    match command {
        Command::Run | Command::Console => {
            let report = HostRunner::new(settings).run_blocking(service, adapter);
            exit_code(report)
        }
        Command::Install | Command::Uninstall => manage(command, &settings, adapter),
    }
}

#[cfg(unix)]
fn platform_adapter() -> Arc<dyn PlatformAdapter> {
    Arc::new(crate::platform::PosixDaemonAdapter::new())
}

#[cfg(not(unix))]
fn platform_adapter() -> Arc<dyn PlatformAdapter> {
    Arc::new(ConsoleAdapter::new())
}

fn manage(
    command: Command,
    settings: &ServiceHostingSettings,
    adapter: Arc<dyn PlatformAdapter>,
) -> u8 {
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!(error = %e, "failed to build runtime");
            return RunReport::EXIT_STARTUP;
        }
    };
    let result = runtime.block_on(async {
        match command {
            Command::Install => adapter.install(settings).await,
            _ => adapter.uninstall(settings).await,
        }
    });
    match result {
        Ok(()) => {
            tracing::info!(service = %settings.service_name, command = ?command, "done");
            RunReport::EXIT_OK
        }
        Err(e @ RegistrationError::Unsupported { .. }) => {
            tracing::error!(error = %e, "command not supported");
            EXIT_UNSUPPORTED
        }
        Err(e) => {
            tracing::error!(error = %e, label = e.as_label(), "command failed");
            RunReport::EXIT_STARTUP
        }
    }
}

fn exit_code(result: Result<RunReport, HostError>) -> u8 {
    match result {
        Ok(report) => {
            let code = report.exit_code();
            if code == RunReport::EXIT_OK {
                tracing::info!(cause = ?report.cause, "service stopped");
            } else {
                tracing::error!(cause = ?report.cause, outcome = ?report.outcome, code, "service stopped abnormally");
            }
            code
        }
        Err(e) => {
            tracing::error!(error = %e, label = e.as_label(), "host failed");
            RunReport::EXIT_STARTUP
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration_units() {
        assert_eq!(parse_duration("500ms"), Ok(Duration::from_millis(500)));
        assert_eq!(parse_duration("30s"), Ok(Duration::from_secs(30)));
        assert_eq!(parse_duration("7"), Ok(Duration::from_secs(7)));
        assert_eq!(parse_duration("2m"), Ok(Duration::from_secs(120)));
        assert_eq!(parse_duration("1h"), Ok(Duration::from_secs(3600)));
        assert!(parse_duration("soon").is_err());
        assert!(parse_duration("5d").is_err());
    }

    #[test]
    fn test_cli_overrides_settings() {
        let cli = Cli::parse_from(["svc", "--shutdown-timeout", "5s", "console"]);
        assert_eq!(cli.command, Some(Command::Console));

        let settings = cli.apply(ServiceHostingSettings::new("svc"));
        assert_eq!(settings.shutdown_timeout, Duration::from_secs(5));
        assert_eq!(settings.error_backoff, Duration::from_secs(30));
    }

    #[test]
    fn test_default_command_is_run() {
        let cli = Cli::parse_from(["svc", "--error-backoff", "250ms"]);
        assert_eq!(cli.command, None);
        assert_eq!(cli.error_backoff, Some(Duration::from_millis(250)));
        assert_eq!(cli.log, "info");
    }

    #[test]
    fn test_console_cannot_install() {
        let cli = Cli::parse_from(["svc", "install"]);
        let code = manage(
            Command::Install,
            &ServiceHostingSettings::new("svc"),
            Arc::new(ConsoleAdapter::new()),
        );
        assert_eq!(cli.command, Some(Command::Install));
        assert_eq!(code, EXIT_UNSUPPORTED);
    }

    #[test]
    fn test_host_errors_map_to_startup_code() {
        let err = HostError::InvalidSettings {
            reason: "empty".into(),
        };
        assert_eq!(exit_code(Err(err)), RunReport::EXIT_STARTUP);
    }
}
