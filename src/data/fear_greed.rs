//! Fear & Greed index client (alternative.me).
//!
//! Sentiment is an optional enrichment: fetch failures surface as errors
//! here, but callers substitute a neutral reading and continue.

use crate::data::SentimentSource;
use crate::error::{AgentError, Result};
use crate::types::SentimentPoint;
use async_trait::async_trait;
use chrono::DateTime;
use serde::Deserialize;

pub struct FearGreedClient {
    http: reqwest::Client,
    url: String,
}

#[derive(Debug, Deserialize)]
struct FearGreedResponse {
    #[serde(default)]
    data: Vec<FearGreedEntry>,
}

#[derive(Debug, Deserialize)]
struct FearGreedEntry {
    value: String,
    timestamp: String,
}

impl FearGreedClient {
    pub fn new(url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: url.to_string(),
        }
    }
}

/// Entries with unparseable values or timestamps are dropped rather than
/// failing the whole fetch.
fn parse_entries(entries: &[FearGreedEntry]) -> Vec<SentimentPoint> {
    entries
        .iter()
        .filter_map(|entry| {
            let secs: i64 = entry.timestamp.parse().ok()?;
            let value: f64 = entry.value.parse().ok()?;
            let date = DateTime::from_timestamp(secs, 0)?.date_naive();
            Some(SentimentPoint { date, value })
        })
        .collect()
}

#[async_trait]
impl SentimentSource for FearGreedClient {
    async fn fetch_sentiment(&self) -> Result<Vec<SentimentPoint>> {
        let response: FearGreedResponse = self
            .http
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if response.data.is_empty() {
            return Err(AgentError::Fetch(
                "sentiment feed returned no data".to_string(),
            ));
        }

        let points = parse_entries(&response.data);
        tracing::info!("fetched {} sentiment readings", points.len());
        Ok(points)
    }
}
