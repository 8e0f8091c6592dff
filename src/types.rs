//! Core domain types shared across the agent.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Single OHLCV bar. The data layer guarantees ascending-time order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    /// 0.0 when the source cannot supply volume (FX spot).
    pub volume: f64,
}

/// Daily crowd-mood reading on a 0-100 scale (50 = neutral).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SentimentPoint {
    pub date: NaiveDate,
    pub value: f64,
}

/// Direction of a predicted or realized move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Trend {
    Up,
    Down,
    Neutral,
}

impl Trend {
    /// Dead-zone classification: moves of 0.1% or less in either direction
    /// count as Neutral.
    pub fn from_percent_change(percent_change: f64) -> Self {
        if percent_change > 0.1 {
            Trend::Up
        } else if percent_change < -0.1 {
            Trend::Down
        } else {
            Trend::Neutral
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Trend::Up => "Up",
            Trend::Down => "Down",
            Trend::Neutral => "Neutral",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Up" => Some(Trend::Up),
            "Down" => Some(Trend::Down),
            "Neutral" => Some(Trend::Neutral),
            _ => None,
        }
    }
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Predictor output for one symbol, before it is written to the ledger.
#[derive(Debug, Clone)]
pub struct Prediction {
    pub symbol: String,
    pub friendly_name: String,
    pub current_price: f64,
    pub predicted_price: f64,
    pub trend: Trend,
    /// Bounded confidence score: [50, 99] when ATR is positive, exactly 50
    /// when ATR is zero.
    pub confidence: f64,
    /// Latest average-true-range value, carried for SL/TP sizing in alerts.
    pub atr: f64,
    pub reason: String,
}

impl Prediction {
    pub fn percent_change(&self) -> f64 {
        (self.predicted_price - self.current_price) / self.current_price * 100.0
    }
}

/// Outcome of checking a past prediction against realized prices.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Resolution {
    Unresolved,
    Resolved {
        actual_price: f64,
        actual_trend: Trend,
        is_correct: bool,
    },
}

/// One ledger row. Appended once, resolved at most once, never deleted.
#[derive(Debug, Clone)]
pub struct PredictionRecord {
    pub id: Uuid,
    pub symbol: String,
    pub created_at: DateTime<Utc>,
    pub horizon_bars: u32,
    pub current_price: f64,
    pub predicted_price: f64,
    pub predicted_trend: Trend,
    pub confidence: f64,
    /// Confidence gate that was in effect when the record was created.
    pub applied_threshold: f64,
    pub resolution: Resolution,
    /// Threshold written back by the feedback loop, for audit.
    pub adjusted_threshold: Option<f64>,
}

impl PredictionRecord {
    pub fn from_prediction(
        prediction: &Prediction,
        horizon_bars: u32,
        applied_threshold: f64,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            symbol: prediction.symbol.clone(),
            created_at,
            horizon_bars,
            current_price: prediction.current_price,
            predicted_price: prediction.predicted_price,
            predicted_trend: prediction.trend,
            confidence: prediction.confidence,
            applied_threshold,
            resolution: Resolution::Unresolved,
            adjusted_threshold: None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self.resolution, Resolution::Resolved { .. })
    }

    pub fn is_correct(&self) -> Option<bool> {
        match self.resolution {
            Resolution::Resolved { is_correct, .. } => Some(is_correct),
            Resolution::Unresolved => None,
        }
    }
}
