//! Twelve Data time-series client.
//!
//! The API returns bars newest-first with all numeric fields as strings,
//! and omits volume for FX spot pairs.

use crate::config::DataConfig;
use crate::data::CandleSource;
use crate::error::{AgentError, Result};
use crate::types::Candle;
use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::Deserialize;
use std::time::Duration;

pub struct TwelveDataClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    retry_attempts: u32,
    retry_delay: Duration,
}

#[derive(Debug, Deserialize)]
struct TimeSeriesResponse {
    status: Option<String>,
    message: Option<String>,
    values: Option<Vec<TimeSeriesValue>>,
}

#[derive(Debug, Deserialize)]
struct TimeSeriesValue {
    datetime: String,
    open: String,
    high: String,
    low: String,
    close: String,
    #[serde(default)]
    volume: Option<String>,
}

impl TwelveDataClient {
    pub fn new(config: &DataConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: config.api_key.clone(),
            base_url: config.base_url.clone(),
            retry_attempts: config.retry_attempts.max(1),
            retry_delay: Duration::from_secs(config.retry_delay_secs),
        }
    }

    async fn request(&self, symbol: &str, interval: &str, count: u32) -> Result<Vec<Candle>> {
        let url = format!("{}/time_series", self.base_url);
        let response: TimeSeriesResponse = self
            .http
            .get(&url)
            .query(&[
                ("symbol", symbol),
                ("interval", interval),
                ("apikey", &self.api_key),
                ("outputsize", &count.to_string()),
                ("timezone", "UTC"),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if response.status.as_deref() != Some("ok") {
            return Err(AgentError::Fetch(format!(
                "time_series returned an invalid response: {}",
                response.message.as_deref().unwrap_or("no message")
            )));
        }

        let values = response
            .values
            .ok_or_else(|| AgentError::Fetch("time_series response had no values".to_string()))?;

        let mut candles = values
            .iter()
            .map(parse_value)
            .collect::<Result<Vec<Candle>>>()?;
        // Newest-first on the wire; the rest of the pipeline expects
        // ascending time.
        candles.reverse();
        Ok(candles)
    }
}

fn parse_value(value: &TimeSeriesValue) -> Result<Candle> {
    let timestamp = parse_timestamp(&value.datetime)?;
    Ok(Candle {
        timestamp,
        open: parse_price(&value.open)?,
        high: parse_price(&value.high)?,
        low: parse_price(&value.low)?,
        close: parse_price(&value.close)?,
        volume: match &value.volume {
            Some(v) => v.parse().unwrap_or(0.0),
            None => 0.0,
        },
    })
}

fn parse_timestamp(raw: &str) -> Result<chrono::DateTime<chrono::Utc>> {
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Ok(naive.and_utc());
    }
    // Daily and weekly bars come back as a bare date.
    if let Ok(date) = raw.parse::<chrono::NaiveDate>() {
        if let Some(naive) = date.and_hms_opt(0, 0, 0) {
            return Ok(naive.and_utc());
        }
    }
    Err(AgentError::Data(format!(
        "unparseable bar timestamp '{raw}'"
    )))
}

fn parse_price(raw: &str) -> Result<f64> {
    raw.parse()
        .map_err(|_| AgentError::Data(format!("unparseable price value '{raw}'")))
}

#[async_trait]
impl CandleSource for TwelveDataClient {
    async fn fetch_candles(&self, symbol: &str, interval: &str, count: u32) -> Result<Vec<Candle>> {
        for attempt in 1..=self.retry_attempts {
            match self.request(symbol, interval, count).await {
                Ok(candles) => {
                    tracing::info!(
                        "fetched {} bars for {} at interval {}",
                        candles.len(),
                        symbol,
                        interval
                    );
                    return Ok(candles);
                }
                Err(e) => {
                    tracing::warn!(
                        "candle fetch for {} failed (attempt {}/{}): {}",
                        symbol,
                        attempt,
                        self.retry_attempts,
                        e
                    );
                    if attempt < self.retry_attempts {
                        tokio::time::sleep(self.retry_delay).await;
                    }
                }
            }
        }
        Err(AgentError::Fetch(format!(
            "giving up on {} after {} attempts",
            symbol, self.retry_attempts
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hourly_timestamp() {
        let ts = parse_timestamp("2024-03-01 14:00:00").unwrap();
        assert_eq!(ts.to_rfc3339(), "2024-03-01T14:00:00+00:00");
    }

    #[test]
    fn parses_daily_timestamp() {
        let ts = parse_timestamp("2024-03-01").unwrap();
        assert_eq!(ts.to_rfc3339(), "2024-03-01T00:00:00+00:00");
    }

    #[test]
    fn missing_volume_defaults_to_zero() {
        let value = TimeSeriesValue {
            datetime: "2024-03-01 14:00:00".to_string(),
            open: "1.0840".to_string(),
            high: "1.0855".to_string(),
            low: "1.0832".to_string(),
            close: "1.0851".to_string(),
            volume: None,
        };
        let candle = parse_value(&value).unwrap();
        assert_eq!(candle.volume, 0.0);
        assert_eq!(candle.close, 1.0851);
    }

    #[test]
    fn rejects_garbage_price() {
        let value = TimeSeriesValue {
            datetime: "2024-03-01 14:00:00".to_string(),
            open: "not-a-number".to_string(),
            high: "1.0".to_string(),
            low: "1.0".to_string(),
            close: "1.0".to_string(),
            volume: None,
        };
        assert!(parse_value(&value).is_err());
    }
}
