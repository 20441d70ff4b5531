//! File logging for hook invocations.
//!
//! Hooks run inside another program's event pipeline, where anything on
//! stdout or stderr can leak into the host's output. Diagnostics go to
//! `~/.roster/logs/hook.log` instead; logging failures are silently
//! dropped rather than failing the hook.

use fs_err as fs;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

pub fn init() -> Option<WorkerGuard> {
    let log_dir = roster_core::config::data_dir().ok()?.join("logs");
    fs::create_dir_all(&log_dir).ok()?;

    let appender = tracing_appender::rolling::never(log_dir, "hook.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .ok()?;

    Some(guard)
}
