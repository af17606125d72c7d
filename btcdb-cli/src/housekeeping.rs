//! Log-file retention: removes dated log files past the retention window.

use chrono::NaiveDate;
use std::path::{Path, PathBuf};

/// Result of one cleanup pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CleanupSummary {
    /// Files matching `{prefix}*.log`.
    pub scanned: usize,
    /// Files removed (or that would be, under dry run).
    pub removed: Vec<PathBuf>,
    /// Matching names whose date could not be parsed or that failed to delete.
    pub skipped: usize,
}

/// Log file name for `date`: `{prefix}{YYYY-MM-DD}.log`.
pub fn log_file_name(prefix: &str, date: NaiveDate) -> String {
    format!("{prefix}{}.log", date.format("%Y-%m-%d"))
}

/// Date embedded in a log file name, if the name has the expected shape.
pub fn parse_log_date(name: &str, prefix: &str) -> Option<NaiveDate> {
    let stem = name.strip_prefix(prefix)?.strip_suffix(".log")?;
    NaiveDate::parse_from_str(stem, "%Y-%m-%d").ok()
}

/// Delete `{prefix}{date}.log` files in `dir` dated more than
/// `retention_days` before `today`. A missing directory is a no-op.
pub fn clean_old_logs(
    dir: &Path,
    prefix: &str,
    retention_days: u32,
    today: NaiveDate,
    dry_run: bool,
) -> std::io::Result<CleanupSummary> {
    let mut summary = CleanupSummary::default();

    if !dir.is_dir() {
        tracing::warn!(dir = %dir.display(), "log directory does not exist, nothing to clean");
        return Ok(summary);
    }

    let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .collect();
    entries.sort();

    for path in entries {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if !name.starts_with(prefix) || !name.ends_with(".log") {
            continue;
        }
        summary.scanned += 1;

        let Some(file_date) = parse_log_date(name, prefix) else {
            tracing::error!(file = name, "cannot parse date from log file name");
            summary.skipped += 1;
            continue;
        };

        let age = (today - file_date).num_days();
        if age <= i64::from(retention_days) {
            continue;
        }

        if dry_run {
            tracing::info!(file = name, age_days = age, "would remove log");
        } else if let Err(e) = std::fs::remove_file(&path) {
            tracing::error!(file = name, error = %e, "failed to remove log");
            summary.skipped += 1;
            continue;
        } else {
            tracing::info!(file = name, age_days = age, "log removed");
        }
        summary.removed.push(path);
    }

    if summary.removed.is_empty() {
        tracing::info!("no logs to remove");
    } else {
        tracing::info!(count = summary.removed.len(), dry_run, "log cleanup finished");
    }

    Ok(summary)
}
