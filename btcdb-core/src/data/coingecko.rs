//! CoinGecko crypto source.
//!
//! Uses the `market_chart` endpoint with `days=0`, which returns a single
//! most-recent sample per series as `[timestamp_ms, value]` pairs.

use super::provider::{network_error, CryptoSource, SourceError};
use crate::domain::CryptoQuote;
use chrono::NaiveDate;
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "https://api.coingecko.com/api/v3";

#[derive(Debug, Deserialize)]
struct MarketChart {
    #[serde(default)]
    prices: Vec<[f64; 2]>,
    #[serde(default)]
    total_volumes: Vec<[f64; 2]>,
    #[serde(default)]
    market_caps: Vec<[f64; 2]>,
}

/// CoinGecko `market_chart` client.
pub struct CoinGeckoSource {
    client: reqwest::blocking::Client,
    base_url: String,
    coin_id: String,
    vs_currency: String,
}

impl CoinGeckoSource {
    pub fn new(
        base_url: impl Into<String>,
        coin_id: impl Into<String>,
        vs_currency: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, SourceError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("btcdb/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(network_error)?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            coin_id: coin_id.into(),
            vs_currency: vs_currency.into(),
        })
    }

    fn chart_url(&self) -> String {
        format!("{}/coins/{}/market_chart", self.base_url, self.coin_id)
    }
}

/// First sample value of a series, rejecting empty or non-finite series.
fn first_value(series: &[[f64; 2]], name: &str) -> Result<f64, SourceError> {
    let [_, value] = series
        .first()
        .copied()
        .ok_or_else(|| SourceError::Empty(format!("no samples in '{name}'")))?;
    if !value.is_finite() {
        return Err(SourceError::Malformed(format!(
            "non-finite value in '{name}': {value}"
        )));
    }
    Ok(value)
}

fn parse_market_chart(body: &str) -> Result<CryptoQuote, SourceError> {
    let chart: MarketChart = serde_json::from_str(body)
        .map_err(|e| SourceError::Malformed(format!("market_chart: {e}")))?;

    Ok(CryptoQuote {
        price: first_value(&chart.prices, "prices")?,
        total_volume: first_value(&chart.total_volumes, "total_volumes")?,
        market_cap: first_value(&chart.market_caps, "market_caps")?,
    })
}

impl CryptoSource for CoinGeckoSource {
    fn name(&self) -> &str {
        "coingecko"
    }

    fn fetch_latest(&self, date: NaiveDate) -> Result<CryptoQuote, SourceError> {
        let resp = self
            .client
            .get(self.chart_url())
            .query(&[
                ("vs_currency", self.vs_currency.as_str()),
                ("days", "0"),
                ("interval", "daily"),
            ])
            .send()
            .map_err(network_error)?;

        let status = resp.status();
        if !status.is_success() {
            return Err(SourceError::HttpStatus {
                source_name: self.name().to_string(),
                status: status.as_u16(),
            });
        }

        let body = resp.text().map_err(network_error)?;
        let quote = parse_market_chart(&body)?;
        tracing::debug!(%date, price = quote.price, "crypto sample fetched");
        Ok(quote)
    }
}
