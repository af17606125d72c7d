//! Market-data sources and the Parquet table store

pub mod coingecko;
pub mod provider;
pub mod schema;
pub mod store;
pub mod yahoo;

pub use coingecko::CoinGeckoSource;
pub use provider::{CryptoSource, InstrumentSource, SourceError};
pub use schema::{SchemaError, TableSchema};
pub use store::{StoreReadError, StoreWriteError, TableMeta, TableStore};
pub use yahoo::YahooChartSource;
