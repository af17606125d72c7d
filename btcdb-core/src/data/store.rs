//! Parquet-backed table store.
//!
//! One file holds the whole table. Features:
//! - Atomic saves (write to `<file>.tmp`, fsync, rename into place)
//! - Schema validation on load (column set, dtypes, no nulls in crypto columns)
//! - Metadata sidecar `<file>.meta.json` (row count, date range, BLAKE3 hash)

use super::schema::{SchemaError, TableSchema, DATE_COLUMN, REQUIRED_COLUMNS};
use crate::domain::{CryptoQuote, Instrument, InstrumentQuotes, ObservationRow, Table};
use chrono::NaiveDate;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Failure to load the persisted table.
#[derive(Debug, Error)]
pub enum StoreReadError {
    #[error("table file not found: {0}")]
    NotFound(PathBuf),

    #[error("failed to read {path}: {reason}")]
    Io { path: PathBuf, reason: String },

    #[error("corrupt table file {path}: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    #[error("schema mismatch in {path}: {source}")]
    SchemaMismatch {
        path: PathBuf,
        #[source]
        source: SchemaError,
    },

    #[error("null value in required column '{column}' at row {row}")]
    NullInRequiredColumn { column: String, row: usize },
}

/// Failure to persist the table.
#[derive(Debug, Error)]
pub enum StoreWriteError {
    #[error("failed to write {path}: {reason}")]
    Io { path: PathBuf, reason: String },

    #[error("failed to encode table: {0}")]
    Encode(String),

    #[error("atomic rename to {path} failed: {reason}")]
    Rename { path: PathBuf, reason: String },

    #[error("refusing to overwrite existing table {0}")]
    AlreadyExists(PathBuf),
}

/// Metadata sidecar written next to the table after each save.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableMeta {
    pub rows: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    pub data_hash: String,
    pub written_at: chrono::NaiveDateTime,
}

/// Loads and saves the observation table at a fixed path.
#[derive(Debug, Clone)]
pub struct TableStore {
    path: PathBuf,
}

impl TableStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Path of the metadata sidecar: `<file>.meta.json`.
    pub fn meta_path(&self) -> PathBuf {
        sibling_with_suffix(&self.path, ".meta.json")
    }

    /// Load the full table.
    ///
    /// Missing, unreadable, corrupt and schema-mismatched files are reported
    /// as distinct errors; callers treat all of them as fatal for the attempt.
    pub fn load(&self) -> Result<Table, StoreReadError> {
        if !self.path.exists() {
            return Err(StoreReadError::NotFound(self.path.clone()));
        }

        let file = fs::File::open(&self.path).map_err(|e| StoreReadError::Io {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;
        let df = ParquetReader::new(file)
            .finish()
            .map_err(|e| StoreReadError::Corrupt {
                path: self.path.clone(),
                reason: e.to_string(),
            })?;

        TableSchema::validate(&df).map_err(|source| StoreReadError::SchemaMismatch {
            path: self.path.clone(),
            source,
        })?;

        let table = dataframe_to_table(&df).map_err(|e| match e {
            FrameError::Null { column, row } => StoreReadError::NullInRequiredColumn { column, row },
            FrameError::Polars(reason) => StoreReadError::Corrupt {
                path: self.path.clone(),
                reason,
            },
        })?;

        tracing::debug!(path = %self.path.display(), rows = table.len(), "table loaded");
        Ok(table)
    }

    /// Persist the full table, replacing the previous file atomically.
    pub fn save(&self, table: &Table) -> Result<(), StoreWriteError> {
        let mut df = table_to_dataframe(table).map_err(StoreWriteError::Encode)?;

        write_atomic(&self.path, |file| {
            ParquetWriter::new(file)
                .finish(&mut df)
                .map(|_| ())
                .map_err(|e| StoreWriteError::Encode(format!("write parquet: {e}")))
        })?;

        if let Err(e) = self.write_meta(table) {
            tracing::warn!(path = %self.meta_path().display(), error = %e, "metadata sidecar not written");
        }

        tracing::debug!(path = %self.path.display(), rows = table.len(), "table saved");
        Ok(())
    }

    /// Create an empty table file. Fails if one already exists.
    pub fn init_empty(&self) -> Result<(), StoreWriteError> {
        if self.path.exists() {
            return Err(StoreWriteError::AlreadyExists(self.path.clone()));
        }
        self.save(&Table::new())
    }

    /// Read the metadata sidecar, if present and parseable.
    pub fn meta(&self) -> Option<TableMeta> {
        let content = fs::read_to_string(self.meta_path()).ok()?;
        serde_json::from_str(&content).ok()
    }

    fn write_meta(&self, table: &Table) -> Result<(), StoreWriteError> {
        let bytes = fs::read(&self.path).map_err(|e| StoreWriteError::Io {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;
        let meta = TableMeta {
            rows: table.len(),
            first_date: table.first_date(),
            last_date: table.last_date(),
            data_hash: blake3::hash(&bytes).to_hex().to_string(),
            written_at: chrono::Local::now().naive_local(),
        };
        let json = serde_json::to_vec_pretty(&meta)
            .map_err(|e| StoreWriteError::Encode(format!("meta serialization: {e}")))?;

        write_atomic(&self.meta_path(), |file| {
            file.write_all(&json).map_err(|e| StoreWriteError::Io {
                path: self.meta_path(),
                reason: e.to_string(),
            })
        })
    }
}

/// `<dir>/<file_name><suffix>`
fn sibling_with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| OsString::from("table"));
    name.push(suffix);
    path.with_file_name(name)
}

/// Write `path` by filling a temp file in the same directory and renaming it
/// over the destination. The destination is either the old file or the
/// complete new one; the temp file is removed on any failure.
pub(crate) fn write_atomic<F>(path: &Path, write: F) -> Result<(), StoreWriteError>
where
    F: FnOnce(&mut fs::File) -> Result<(), StoreWriteError>,
{
    fn io_err(path: &Path, e: std::io::Error) -> StoreWriteError {
        StoreWriteError::Io {
            path: path.to_path_buf(),
            reason: e.to_string(),
        }
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    }

    let tmp_path = sibling_with_suffix(path, ".tmp");
    let result = (|| {
        let mut file = fs::File::create(&tmp_path).map_err(|e| io_err(&tmp_path, e))?;
        write(&mut file)?;
        file.sync_all().map_err(|e| io_err(&tmp_path, e))?;
        drop(file);

        fs::rename(&tmp_path, path).map_err(|e| StoreWriteError::Rename {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    })();

    if result.is_err() {
        let _ = fs::remove_file(&tmp_path);
    }
    result
}

// ── Parquet conversion helpers ─────────────────────────────────────

fn epoch() -> NaiveDate {
    NaiveDate::default()
}

/// Convert the table to a Polars DataFrame in persisted column order.
fn table_to_dataframe(table: &Table) -> Result<DataFrame, String> {
    let rows = table.rows();
    let dates: Vec<i32> = rows
        .iter()
        .map(|r| (r.date - epoch()).num_days() as i32)
        .collect();
    let prices: Vec<f64> = rows.iter().map(|r| r.crypto.price).collect();
    let volumes: Vec<f64> = rows.iter().map(|r| r.crypto.total_volume).collect();
    let caps: Vec<f64> = rows.iter().map(|r| r.crypto.market_cap).collect();

    let mut columns = vec![
        Column::new(DATE_COLUMN.into(), dates)
            .cast(&DataType::Date)
            .map_err(|e| format!("date cast: {e}"))?,
        Column::new(REQUIRED_COLUMNS[0].into(), prices),
        Column::new(REQUIRED_COLUMNS[1].into(), volumes),
        Column::new(REQUIRED_COLUMNS[2].into(), caps),
    ];
    for instrument in Instrument::ALL {
        let values: Vec<Option<f64>> = rows.iter().map(|r| r.instruments.get(instrument)).collect();
        columns.push(Column::new(instrument.column().into(), values));
    }

    DataFrame::new(columns).map_err(|e| format!("dataframe creation: {e}"))
}

enum FrameError {
    Null { column: String, row: usize },
    Polars(String),
}

impl From<PolarsError> for FrameError {
    fn from(e: PolarsError) -> Self {
        FrameError::Polars(e.to_string())
    }
}

/// Convert a validated DataFrame back to a table.
fn dataframe_to_table(df: &DataFrame) -> Result<Table, FrameError> {
    let dates = df.column(DATE_COLUMN)?.cast(&DataType::Int32)?;
    let date_ca = dates.i32()?;
    let price_ca = df.column(REQUIRED_COLUMNS[0])?.f64()?;
    let volume_ca = df.column(REQUIRED_COLUMNS[1])?.f64()?;
    let cap_ca = df.column(REQUIRED_COLUMNS[2])?.f64()?;
    let instrument_cas = Instrument::ALL
        .iter()
        .map(|i| -> Result<_, PolarsError> { Ok((*i, df.column(i.column())?.f64()?)) })
        .collect::<Result<Vec<_>, PolarsError>>()?;

    let required = |ca: &Float64Chunked, column: &str, row: usize| {
        ca.get(row).ok_or_else(|| FrameError::Null {
            column: column.to_string(),
            row,
        })
    };

    let mut rows = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        let days = date_ca.get(i).ok_or_else(|| FrameError::Null {
            column: DATE_COLUMN.to_string(),
            row: i,
        })?;

        let crypto = CryptoQuote {
            price: required(price_ca, REQUIRED_COLUMNS[0], i)?,
            total_volume: required(volume_ca, REQUIRED_COLUMNS[1], i)?,
            market_cap: required(cap_ca, REQUIRED_COLUMNS[2], i)?,
        };

        let mut instruments = InstrumentQuotes::closed();
        for (instrument, ca) in &instrument_cas {
            instruments.set(*instrument, ca.get(i));
        }

        rows.push(ObservationRow::new(
            epoch() + chrono::Duration::days(days as i64),
            crypto,
            instruments,
        ));
    }

    Ok(Table::from_rows(rows))
}
