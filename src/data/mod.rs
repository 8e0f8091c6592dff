//! External market data sources.
//!
//! The trait seams exist so the feedback loop and orchestrator can be
//! exercised against scripted sources in tests.

pub mod fear_greed;
pub mod twelve_data;

pub use fear_greed::FearGreedClient;
pub use twelve_data::TwelveDataClient;

use crate::error::{AgentError, Result};
use crate::types::{Candle, SentimentPoint};
use async_trait::async_trait;

/// Supplier of ascending-time-ordered OHLCV bars.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CandleSource: Send + Sync {
    async fn fetch_candles(&self, symbol: &str, interval: &str, count: u32) -> Result<Vec<Candle>>;
}

/// Supplier of daily sentiment readings. Absence is tolerated downstream.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SentimentSource: Send + Sync {
    async fn fetch_sentiment(&self) -> Result<Vec<SentimentPoint>>;
}

/// Wall-clock duration of one bar for a Twelve Data interval string.
pub fn interval_duration(interval: &str) -> Result<chrono::Duration> {
    let duration = match interval {
        "1min" => chrono::Duration::minutes(1),
        "5min" => chrono::Duration::minutes(5),
        "15min" => chrono::Duration::minutes(15),
        "30min" => chrono::Duration::minutes(30),
        "45min" => chrono::Duration::minutes(45),
        "1h" => chrono::Duration::hours(1),
        "2h" => chrono::Duration::hours(2),
        "4h" => chrono::Duration::hours(4),
        "8h" => chrono::Duration::hours(8),
        "1day" => chrono::Duration::days(1),
        "1week" => chrono::Duration::weeks(1),
        other => {
            return Err(AgentError::Data(format!(
                "unsupported bar interval '{other}'"
            )))
        }
    };
    Ok(duration)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_duration_known_values() {
        assert_eq!(interval_duration("1h").unwrap(), chrono::Duration::hours(1));
        assert_eq!(
            interval_duration("15min").unwrap(),
            chrono::Duration::minutes(15)
        );
        assert_eq!(
            interval_duration("1day").unwrap(),
            chrono::Duration::days(1)
        );
    }

    #[test]
    fn interval_duration_rejects_unknown() {
        assert!(interval_duration("3h").is_err());
    }
}
