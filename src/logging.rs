use std::fs::OpenOptions;

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

pub const LOG_FILE_ENV: &str = "ADDRBOOK_LOG_FILE";

/// Where log output may go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTarget {
    /// Terminal belongs to the TUI: only the log file, if configured.
    FileOnly,
    /// Log file if configured, plus stderr.
    Stderr,
}

pub fn init(target: LogTarget) -> Result<()> {
    let file_logging = std::env::var(LOG_FILE_ENV).ok();

    let file_layer = match file_logging {
        Some(ref log_path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(log_path)
                .with_context(|| format!("failed to open log file {}", log_path))?;
            Some(
                fmt::layer()
                    .with_writer(file)
                    .with_ansi(false)
                    .with_target(true)
                    .with_filter(env_filter("debug")),
            )
        }
        None => None,
    };

    let stderr_layer = match target {
        LogTarget::Stderr => Some(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .without_time()
                .with_filter(env_filter("warn")),
        ),
        LogTarget::FileOnly => None,
    };

    tracing_subscriber::registry()
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
        .context("failed to install tracing subscriber")?;
    Ok(())
}

fn env_filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}
