//! Subscriber setup: stderr plus an optional daily log file.

use anyhow::{Context, Result};
use btcdb_runner::config::LoggingConfig;
use chrono::NaiveDate;
use std::fs::File;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::housekeeping::log_file_name;

/// Install the global subscriber. `RUST_LOG` overrides `config.level`.
///
/// With `to_file`, events are also appended to
/// `{config.dir}/{config.file_prefix}{today}.log` and the path is returned.
/// If that file cannot be opened, logging continues on stderr only.
pub fn init(config: &LoggingConfig, today: NaiveDate, to_file: bool) -> Result<Option<PathBuf>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .with_context(|| format!("invalid log level '{}'", config.level))?;

    let stderr_layer = fmt::layer().with_writer(std::io::stderr).with_target(false);

    let (log_file, file_error) = if to_file {
        match open_log_file(config, today) {
            Ok(opened) => (Some(opened), None),
            Err(e) => (None, Some(e)),
        }
    } else {
        (None, None)
    };

    let (path, file_layer) = match log_file {
        Some((path, file)) => (
            Some(path),
            Some(fmt::layer().with_writer(Mutex::new(file)).with_ansi(false)),
        ),
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()?;

    if let Some(e) = file_error {
        tracing::warn!(error = %format!("{e:#}"), "file logging disabled, using stderr only");
    }

    Ok(path)
}

/// Create the log directory if needed and open today's file for appending.
pub fn open_log_file(config: &LoggingConfig, today: NaiveDate) -> Result<(PathBuf, File)> {
    std::fs::create_dir_all(&config.dir)
        .with_context(|| format!("creating log directory {}", config.dir.display()))?;
    let path = config.dir.join(log_file_name(&config.file_prefix, today));
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("opening log file {}", path.display()))?;
    Ok((path, file))
}
