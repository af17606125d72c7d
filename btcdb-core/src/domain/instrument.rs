use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Traditional-market instruments tracked alongside the crypto quote.
///
/// Declaration order is the persisted column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Instrument {
    Gold,
    DowJones,
    Sp500,
    Us10y,
    Nikkei225,
}

impl Instrument {
    pub const ALL: [Instrument; 5] = [
        Instrument::Gold,
        Instrument::DowJones,
        Instrument::Sp500,
        Instrument::Us10y,
        Instrument::Nikkei225,
    ];

    /// Column name in the persisted table.
    pub fn column(self) -> &'static str {
        match self {
            Instrument::Gold => "price_gold",
            Instrument::DowJones => "stock_index_dowjones",
            Instrument::Sp500 => "stock_index_sp500",
            Instrument::Us10y => "rate_US10Y",
            Instrument::Nikkei225 => "stock_index_ni225",
        }
    }

    /// Default Yahoo Finance symbol.
    pub fn default_symbol(self) -> &'static str {
        match self {
            Instrument::Gold => "GC=F",
            Instrument::DowJones => "^DJI",
            Instrument::Sp500 => "^GSPC",
            Instrument::Us10y => "^TNX",
            Instrument::Nikkei225 => "^N225",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

#[derive(Debug, Error, PartialEq)]
#[error("unknown instrument column '{0}'")]
pub struct UnknownInstrument(pub String);

impl FromStr for Instrument {
    type Err = UnknownInstrument;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Instrument::ALL
            .into_iter()
            .find(|i| i.column() == s)
            .ok_or_else(|| UnknownInstrument(s.to_string()))
    }
}

/// One optional value per instrument. `None` means no observation for the day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct InstrumentQuotes {
    values: [Option<f64>; 5],
}

impl InstrumentQuotes {
    /// All instruments absent (markets closed).
    pub fn closed() -> Self {
        Self::default()
    }

    pub fn get(&self, instrument: Instrument) -> Option<f64> {
        self.values[instrument.index()]
    }

    pub fn set(&mut self, instrument: Instrument, value: Option<f64>) {
        self.values[instrument.index()] = value;
    }

    pub fn with(mut self, instrument: Instrument, value: Option<f64>) -> Self {
        self.set(instrument, value);
        self
    }

    /// Number of instruments with a concrete value.
    pub fn observed(&self) -> usize {
        self.values.iter().filter(|v| v.is_some()).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Instrument, Option<f64>)> + '_ {
        Instrument::ALL.into_iter().map(|i| (i, self.get(i)))
    }

    pub(crate) fn slot_mut(&mut self, instrument: Instrument) -> &mut Option<f64> {
        &mut self.values[instrument.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_names_round_trip_through_from_str() {
        for instrument in Instrument::ALL {
            assert_eq!(instrument.column().parse::<Instrument>(), Ok(instrument));
        }
        assert!("rate_us10y".parse::<Instrument>().is_err());
    }

    #[test]
    fn closed_quotes_have_no_observations() {
        let quotes = InstrumentQuotes::closed();
        assert_eq!(quotes.observed(), 0);
        assert!(quotes.iter().all(|(_, v)| v.is_none()));
    }

    #[test]
    fn set_only_touches_one_instrument() {
        let quotes = InstrumentQuotes::closed().with(Instrument::Sp500, Some(5_100.0));
        assert_eq!(quotes.get(Instrument::Sp500), Some(5_100.0));
        assert_eq!(quotes.get(Instrument::Gold), None);
        assert_eq!(quotes.observed(), 1);
    }
}
