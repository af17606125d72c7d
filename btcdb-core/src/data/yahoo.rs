//! Yahoo Finance instrument source.
//!
//! Queries Yahoo's v8 chart API for a one-day window and returns the day's
//! opening value. Yahoo has no official API and is subject to unannounced
//! format changes, so every parse step maps to `SourceError::Malformed`.

use super::provider::{network_error, InstrumentSource, SourceError};
use chrono::{NaiveDate, NaiveTime};
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_CHART_URL: &str = "https://query2.finance.yahoo.com/v8/finance/chart";

/// Yahoo Finance v8 chart API response.
#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    #[serde(default)]
    open: Vec<Option<f64>>,
}

/// Yahoo Finance chart client.
pub struct YahooChartSource {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl YahooChartSource {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, SourceError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()
            .map_err(network_error)?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Build the chart API URL for a symbol and date window.
    fn chart_url(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> String {
        let start_ts = start.and_time(NaiveTime::default()).and_utc().timestamp();
        let end_ts = end.and_time(NaiveTime::default()).and_utc().timestamp();
        format!(
            "{}/{symbol}?period1={start_ts}&period2={end_ts}&interval=1d",
            self.base_url
        )
    }
}

/// Extract the first opening value from a chart response body.
fn parse_open(symbol: &str, body: &str) -> Result<Option<f64>, SourceError> {
    let resp: ChartResponse = serde_json::from_str(body).map_err(|e| {
        SourceError::Malformed(format!("failed to parse response for {symbol}: {e}"))
    })?;

    let Some(result) = resp.chart.result else {
        return match resp.chart.error {
            Some(err) if err.code == "Not Found" => Ok(None),
            Some(err) => Err(SourceError::Malformed(format!(
                "{}: {}",
                err.code, err.description
            ))),
            None => Err(SourceError::Malformed("empty result with no error".into())),
        };
    };

    let Some(data) = result.into_iter().next() else {
        return Ok(None);
    };

    // No timestamps: Yahoo has nothing in the window (weekend, holiday)
    if data.timestamp.map_or(true, |ts| ts.is_empty()) {
        return Ok(None);
    }

    let quote = data
        .indicators
        .quote
        .into_iter()
        .next()
        .ok_or_else(|| SourceError::Malformed(format!("no quote data for {symbol}")))?;

    Ok(quote.open.into_iter().flatten().find(|v| v.is_finite()))
}

impl InstrumentSource for YahooChartSource {
    fn name(&self) -> &str {
        "yahoo_finance"
    }

    fn fetch_open(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Option<f64>, SourceError> {
        let url = self.chart_url(symbol, start, end);
        let resp = self.client.get(&url).send().map_err(network_error)?;

        let status = resp.status();
        // Yahoo answers unknown symbols with 404 and a JSON error body
        if !status.is_success() && status != reqwest::StatusCode::NOT_FOUND {
            return Err(SourceError::HttpStatus {
                source_name: self.name().to_string(),
                status: status.as_u16(),
            });
        }

        let body = resp.text().map_err(network_error)?;
        parse_open(symbol, &body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_first_open_value() {
        let body = r#"{"chart":{"result":[{"timestamp":[1718026200],
            "indicators":{"quote":[{"open":[5353.0],"close":[5360.8]}]}}],"error":null}}"#;
        assert_eq!(parse_open("^GSPC", body).unwrap(), Some(5353.0));
    }

    #[test]
    fn skips_leading_null_opens() {
        let body = r#"{"chart":{"result":[{"timestamp":[1,2],
            "indicators":{"quote":[{"open":[null,2350.5]}]}}],"error":null}}"#;
        assert_eq!(parse_open("GC=F", body).unwrap(), Some(2350.5));
    }

    #[test]
    fn window_without_timestamps_is_empty() {
        let body = r#"{"chart":{"result":[{"indicators":{"quote":[{}]}}],"error":null}}"#;
        assert_eq!(parse_open("^N225", body).unwrap(), None);
    }

    #[test]
    fn not_found_is_empty_not_error() {
        let body = r#"{"chart":{"result":null,
            "error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#;
        assert_eq!(parse_open("^XXX", body).unwrap(), None);
    }

    #[test]
    fn other_chart_errors_are_malformed() {
        let body = r#"{"chart":{"result":null,
            "error":{"code":"Bad Request","description":"Invalid input"}}}"#;
        assert!(matches!(
            parse_open("^DJI", body),
            Err(SourceError::Malformed(_))
        ));
    }

    #[test]
    fn garbage_body_is_malformed() {
        assert!(matches!(
            parse_open("^DJI", "<html>rate limited</html>"),
            Err(SourceError::Malformed(_))
        ));
    }

    #[test]
    fn chart_url_spans_the_window() {
        let source = YahooChartSource::new("https://example.test/chart/", Duration::from_secs(1))
            .unwrap();
        let url = source.chart_url(
            "^TNX",
            NaiveDate::from_ymd_opt(2024, 6, 10).unwrap(),
            NaiveDate::from_ymd_opt(2024, 6, 11).unwrap(),
        );
        assert_eq!(
            url,
            "https://example.test/chart/^TNX?period1=1717977600&period2=1718064000&interval=1d"
        );
    }
}
