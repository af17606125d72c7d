//! Domain types: observation rows and the date-keyed table.

pub mod instrument;
pub mod row;
pub mod table;

pub use instrument::{Instrument, InstrumentQuotes, UnknownInstrument};
pub use row::{CryptoQuote, ObservationRow};
pub use table::Table;
