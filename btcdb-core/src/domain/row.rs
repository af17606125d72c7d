use super::instrument::{Instrument, InstrumentQuotes};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Daily crypto sample. All three values come from one response, so they are
/// either all present or the fetch failed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CryptoQuote {
    pub price: f64,
    pub total_volume: f64,
    pub market_cap: f64,
}

/// One record per calendar date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationRow {
    pub date: NaiveDate,
    pub crypto: CryptoQuote,
    pub instruments: InstrumentQuotes,
}

impl ObservationRow {
    pub fn new(date: NaiveDate, crypto: CryptoQuote, instruments: InstrumentQuotes) -> Self {
        Self {
            date,
            crypto,
            instruments,
        }
    }

    /// Every numeric value in column order, as `(column, value)`.
    pub fn values(&self) -> [(&'static str, Option<f64>); 8] {
        [
            ("price", Some(self.crypto.price)),
            ("total_volume", Some(self.crypto.total_volume)),
            ("market_cap", Some(self.crypto.market_cap)),
            (Instrument::Gold.column(), self.instruments.get(Instrument::Gold)),
            (Instrument::DowJones.column(), self.instruments.get(Instrument::DowJones)),
            (Instrument::Sp500.column(), self.instruments.get(Instrument::Sp500)),
            (Instrument::Us10y.column(), self.instruments.get(Instrument::Us10y)),
            (Instrument::Nikkei225.column(), self.instruments.get(Instrument::Nikkei225)),
        ]
    }
}
