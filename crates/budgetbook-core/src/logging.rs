//! Tracing setup for host applications.

use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Log file prefix; the appender adds the date.
const LOG_FILE_PREFIX: &str = "budgetbook.log";

#[derive(Debug, Clone)]
pub struct LogOptions {
    /// Filter used when `RUST_LOG` is unset.
    pub default_filter: String,
    /// Also write daily-rolling log files here.
    pub log_dir: Option<PathBuf>,
}

impl Default for LogOptions {
    fn default() -> Self {
        Self {
            default_filter: "warn".to_string(),
            log_dir: None,
        }
    }
}

fn env_filter(default_filter: &str) -> EnvFilter {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=budgetbook_core=debug)
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter))
}

/// Install the global tracing subscriber.
///
/// When logging to files, keep the returned guard alive for the lifetime of
/// the app; dropping it flushes and stops the background writer.
pub fn init_tracing(options: &LogOptions) -> Result<Option<WorkerGuard>> {
    let stderr_layer = fmt::layer().with_writer(io::stderr);

    let (file_layer, guard) = match options.log_dir {
        Some(ref dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory: {}", dir.display()))?;
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .with(env_filter(&options.default_filter))
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(guard)
}
