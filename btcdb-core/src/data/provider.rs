//! Data source traits and structured error types.
//!
//! The crypto and instrument sources are traits so the pipeline can be driven
//! by the HTTP clients in production and by in-memory fakes in tests.

use crate::domain::CryptoQuote;
use chrono::NaiveDate;
use thiserror::Error;

/// Failure of a market-data source.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("network unreachable: {0}")]
    Network(String),

    #[error("HTTP {status} from {source_name}")]
    HttpStatus { source_name: String, status: u16 },

    #[error("response format changed: {0}")]
    Malformed(String),

    #[error("empty response: {0}")]
    Empty(String),
}

/// Source of the daily crypto sample (price, volume, market cap).
pub trait CryptoSource {
    /// Human-readable name of this source.
    fn name(&self) -> &str;

    /// Most recent daily sample, stamped with `date` by the caller.
    fn fetch_latest(&self, date: NaiveDate) -> Result<CryptoQuote, SourceError>;
}

/// Source of traditional-instrument daily observations.
pub trait InstrumentSource {
    /// Human-readable name of this source.
    fn name(&self) -> &str;

    /// Opening value of `symbol` inside `[start, end)`.
    ///
    /// `Ok(None)` means the source answered with no data for the window
    /// (holiday, not yet published).
    fn fetch_open(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Option<f64>, SourceError>;
}

/// Map a reqwest transport error to a source error.
pub(crate) fn network_error(e: reqwest::Error) -> SourceError {
    SourceError::Network(e.to_string())
}
