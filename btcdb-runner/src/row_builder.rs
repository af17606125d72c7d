//! Builds the day's observation row from the crypto and instrument sources.
//!
//! Fetch policy:
//! - Crypto is atomic: any failure aborts the row.
//! - Instruments are tolerant: an empty, failed or non-finite response nulls that field only.
//! - Weekends (in the reference timezone) skip the instrument source entirely.
//! - Each instrument request is followed by a fixed pacing delay.

use btcdb_core::data::{CryptoSource, InstrumentSource, SourceError};
use btcdb_core::domain::{Instrument, InstrumentQuotes, ObservationRow};
use chrono::{Datelike, NaiveDate, Weekday};
use std::time::Duration;
use thiserror::Error;

use crate::clock::Clock;
use crate::pacing::Sleeper;

/// A required source failed; the row cannot be built.
#[derive(Debug, Error)]
#[error("{source_name} fetch failed: {source}")]
pub struct SourceFetchError {
    pub source_name: String,
    pub source: SourceError,
}

pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

pub struct RowBuilder<'a> {
    crypto: &'a dyn CryptoSource,
    instruments: &'a dyn InstrumentSource,
    clock: &'a dyn Clock,
    sleeper: &'a dyn Sleeper,
    tickers: Vec<(Instrument, String)>,
    pacing: Duration,
}

impl<'a> RowBuilder<'a> {
    pub fn new(
        crypto: &'a dyn CryptoSource,
        instruments: &'a dyn InstrumentSource,
        clock: &'a dyn Clock,
        sleeper: &'a dyn Sleeper,
    ) -> Self {
        Self {
            crypto,
            instruments,
            clock,
            sleeper,
            tickers: Instrument::ALL
                .into_iter()
                .map(|i| (i, i.default_symbol().to_string()))
                .collect(),
            pacing: Duration::ZERO,
        }
    }

    /// Instrument → symbol mapping. Instruments left out stay null.
    pub fn with_tickers(mut self, tickers: Vec<(Instrument, String)>) -> Self {
        self.tickers = tickers;
        self
    }

    /// Delay after each instrument request.
    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }

    /// Fetch and assemble today's row.
    pub fn build_today_row(&self) -> Result<ObservationRow, SourceFetchError> {
        let today = self.clock.today();

        let crypto = self
            .crypto
            .fetch_latest(today)
            .map_err(|source| SourceFetchError {
                source_name: self.crypto.name().to_string(),
                source,
            })?;
        tracing::info!(%today, price = crypto.price, "crypto data fetched");

        let instruments = self.fetch_instruments(today);

        Ok(ObservationRow::new(today, crypto, instruments))
    }

    fn fetch_instruments(&self, today: NaiveDate) -> InstrumentQuotes {
        if is_weekend(today) {
            tracing::warn!(%today, "weekend detected, instrument fields set to null");
            return InstrumentQuotes::closed();
        }

        let end = today.succ_opt().unwrap_or(today);
        let mut quotes = InstrumentQuotes::closed();

        for (instrument, symbol) in &self.tickers {
            let value = match self.instruments.fetch_open(symbol, today, end) {
                Ok(Some(v)) if !v.is_finite() => {
                    tracing::warn!(%instrument, %symbol, value = v, "non-finite instrument value discarded");
                    None
                }
                Ok(Some(v)) => {
                    tracing::info!(%instrument, %symbol, value = v, "instrument fetched");
                    Some(v)
                }
                Ok(None) => {
                    tracing::warn!(%instrument, %symbol, "no data for instrument");
                    None
                }
                Err(e) => {
                    tracing::warn!(%instrument, %symbol, error = %e, "instrument fetch failed");
                    None
                }
            };
            quotes.set(*instrument, value);
            self.sleeper.sleep(self.pacing);
        }

        quotes
    }
}
