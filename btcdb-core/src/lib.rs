//! btcdb core: observation rows, market-data sources, reconciliation and storage.
//!
//! This crate holds everything the daily update touches except orchestration:
//! - Domain types (crypto quote, instrument quotes, observation row, table)
//! - Source traits plus the CoinGecko and Yahoo Finance HTTP clients
//! - Reconciliation: append, sort, dedup-keep-latest, forward-fill
//! - Parquet table store with atomic replace and a metadata sidecar

pub mod data;
pub mod domain;
pub mod reconcile;
