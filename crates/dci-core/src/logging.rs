//! Diagnostic logging via `tracing`.
//!
//! The status line owns stderr, so by default only warnings reach it. Passing a
//! log file moves all diagnostics there at `debug` level. `DCI_LOG` overrides the
//! filter in both cases (e.g. `DCI_LOG=dci_core=trace`).

use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Environment variable holding an `EnvFilter` directive string.
pub const LOG_ENV: &str = "DCI_LOG";

#[derive(Debug, Clone, Default)]
pub struct LoggingConfig {
    /// Write logs to this file instead of stderr.
    pub log_file: Option<PathBuf>,
}

impl LoggingConfig {
    /// Filter used when `DCI_LOG` is unset.
    pub fn default_directive(&self) -> &'static str {
        if self.log_file.is_some() {
            "debug"
        } else {
            "warn"
        }
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_env(LOG_ENV)
            .unwrap_or_else(|_| EnvFilter::new(self.default_directive()))
    }
}

/// Installs the global subscriber.
///
/// The returned guard flushes the file writer on drop; keep it alive until exit.
///
/// # Errors
/// Returns an error if the log file path is unusable or a subscriber is already set.
pub fn init(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter = config.filter();

    let Some(path) = &config.log_file else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(io::stderr))
            .try_init()
            .context("install stderr logger")?;
        return Ok(None);
    };

    let file_name = path
        .file_name()
        .with_context(|| format!("log file path has no file name: {}", path.display()))?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let appender = tracing_appender::rolling::never(dir, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .try_init()
        .context("install file logger")?;

    Ok(Some(guard))
}
