//! Feature synthesis: raw candles + sentiment into an ordered, fully
//! imputed feature table.
//!
//! Column order is a contract shared with the trained model. The engine
//! produces a fixed set of named outputs and assembles rows strictly in
//! the configured order; a configured name it cannot produce is a hard
//! error, never a silent drop.

pub mod indicators;
pub mod sequence;

use crate::error::{AgentError, Result};
use crate::types::{Candle, SentimentPoint};
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Neutral sentiment substituted when no reading matches a bar's date.
pub const NEUTRAL_SENTIMENT: f64 = 50.0;

const EMA_SHORT_PERIOD: usize = 10;
const EMA_LONG_PERIOD: usize = 50;
const SMA_PERIOD: usize = 20;
const RSI_PERIOD: usize = 14;
const MACD_FAST: usize = 12;
const MACD_SLOW: usize = 26;
const MACD_SIGNAL: usize = 9;
const ATR_PERIOD: usize = 14;
const BB_PERIOD: usize = 20;
const BB_WIDTH: f64 = 2.0;

/// Ordered feature rows with per-row timestamps and forward targets.
#[derive(Debug, Clone)]
pub struct FeatureTable {
    columns: Vec<String>,
    pub timestamps: Vec<DateTime<Utc>>,
    /// `rows[t][c]` is the value of column `c` at time step `t`.
    pub rows: Vec<Vec<f64>>,
    /// `targets[t]` is `close[t + horizon]`; `None` in the tail where the
    /// horizon has not been observed yet.
    pub targets: Vec<Option<f64>>,
}

impl FeatureTable {
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Most recent value of a column, if the column exists.
    pub fn latest(&self, name: &str) -> Option<f64> {
        let idx = self.column_index(name)?;
        self.rows.last().map(|row| row[idx])
    }

    /// Rows paired with realized targets, excluding the unlabeled tail.
    /// This is the training view; live inference uses `rows` directly.
    pub fn labeled(&self) -> (Vec<Vec<f64>>, Vec<f64>) {
        let mut rows = Vec::new();
        let mut targets = Vec::new();
        for (row, target) in self.rows.iter().zip(&self.targets) {
            if let Some(t) = target {
                rows.push(row.clone());
                targets.push(*t);
            }
        }
        (rows, targets)
    }
}

pub struct FeatureEngine {
    features: Vec<String>,
    horizon: usize,
}

impl FeatureEngine {
    pub fn new(features: Vec<String>, horizon: usize) -> Self {
        // Produced column names are all lower-case; tolerate inconsistent
        // casing in the configured list.
        let features = features.iter().map(|f| f.to_lowercase()).collect();
        Self { features, horizon }
    }

    /// Synthesize the feature table for one symbol's candle history.
    ///
    /// Sentiment is left-joined by calendar date with a neutral default, so
    /// the column is always present. Indicator warm-up gaps are back-filled
    /// then forward-filled; no row is dropped for missing warm-up.
    pub fn synthesize(
        &self,
        candles: &[Candle],
        sentiment: &[SentimentPoint],
    ) -> Result<FeatureTable> {
        if candles.is_empty() {
            return Err(AgentError::Data(
                "no candles to synthesize features from".to_string(),
            ));
        }

        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
        let macd = indicators::macd(&closes, MACD_FAST, MACD_SLOW, MACD_SIGNAL);
        let bands = indicators::bollinger(&closes, BB_PERIOD, BB_WIDTH);

        let mut produced: HashMap<&'static str, Vec<f64>> = HashMap::new();
        produced.insert("open", candles.iter().map(|c| c.open).collect());
        produced.insert("high", candles.iter().map(|c| c.high).collect());
        produced.insert("low", candles.iter().map(|c| c.low).collect());
        produced.insert("close", closes.clone());
        produced.insert("volume", candles.iter().map(|c| c.volume).collect());
        produced.insert("ema_10", indicators::ema(&closes, EMA_SHORT_PERIOD));
        produced.insert("ema_50", indicators::ema(&closes, EMA_LONG_PERIOD));
        produced.insert("sma_20", indicators::sma(&closes, SMA_PERIOD));
        produced.insert("rsi_14", indicators::rsi(&closes, RSI_PERIOD));
        produced.insert("macd", macd.line);
        produced.insert("macd_signal", macd.signal);
        produced.insert("macd_hist", macd.histogram);
        produced.insert("atr_14", indicators::atr(candles, ATR_PERIOD));
        produced.insert("bb_lower", bands.lower);
        produced.insert("bb_middle", bands.middle);
        produced.insert("bb_upper", bands.upper);
        produced.insert("sentiment", join_sentiment(candles, sentiment));

        for values in produced.values_mut() {
            impute(values);
        }

        // An entirely-NaN column cannot be imputed; the series is shorter
        // than the longest indicator warm-up.
        for (name, values) in &produced {
            if values.iter().any(|v| !v.is_finite()) {
                return Err(AgentError::Feature(format!(
                    "insufficient history to warm up '{name}' ({} bars)",
                    candles.len()
                )));
            }
        }

        let mut selected: Vec<&Vec<f64>> = Vec::with_capacity(self.features.len());
        for name in &self.features {
            let values = produced.get(name.as_str()).ok_or_else(|| {
                AgentError::Feature(format!("configured feature '{name}' was not produced"))
            })?;
            selected.push(values);
        }

        let rows: Vec<Vec<f64>> = (0..candles.len())
            .map(|t| selected.iter().map(|col| col[t]).collect())
            .collect();
        let targets: Vec<Option<f64>> = (0..candles.len())
            .map(|t| candles.get(t + self.horizon).map(|c| c.close))
            .collect();

        Ok(FeatureTable {
            columns: self.features.clone(),
            timestamps: candles.iter().map(|c| c.timestamp).collect(),
            rows,
            targets,
        })
    }
}

/// Left-join daily sentiment onto candles by calendar date, defaulting to
/// neutral where no reading exists.
fn join_sentiment(candles: &[Candle], sentiment: &[SentimentPoint]) -> Vec<f64> {
    let by_date: HashMap<chrono::NaiveDate, f64> =
        sentiment.iter().map(|p| (p.date, p.value)).collect();
    candles
        .iter()
        .map(|c| {
            by_date
                .get(&c.timestamp.date_naive())
                .copied()
                .unwrap_or(NEUTRAL_SENTIMENT)
        })
        .collect()
}

/// Back-fill then forward-fill, mirroring the warm-up imputation contract:
/// leading NaNs take the first finite value, trailing NaNs the last.
fn impute(values: &mut [f64]) {
    let mut next = f64::NAN;
    for v in values.iter_mut().rev() {
        if v.is_finite() {
            next = *v;
        } else if next.is_finite() {
            *v = next;
        }
    }
    let mut prev = f64::NAN;
    for v in values.iter_mut() {
        if v.is_finite() {
            prev = *v;
        } else if prev.is_finite() {
            *v = prev;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn make_candles(n: usize) -> Vec<Candle> {
        (0..n)
            .map(|i| {
                let base = 1.1 + (i as f64 * 0.37).sin() * 0.01;
                Candle {
                    timestamp: Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()
                        + chrono::Duration::hours(i as i64),
                    open: base,
                    high: base + 0.002,
                    low: base - 0.002,
                    close: base + 0.001,
                    volume: 0.0,
                }
            })
            .collect()
    }

    fn default_engine() -> FeatureEngine {
        FeatureEngine::new(crate::config::ModelConfig::default().features, 4)
    }

    #[test]
    fn every_cell_is_finite_after_imputation() {
        let table = default_engine()
            .synthesize(&make_candles(120), &[])
            .unwrap();
        assert_eq!(table.len(), 120);
        for row in &table.rows {
            assert_eq!(row.len(), 17);
            assert!(row.iter().all(|v| v.is_finite()));
        }
    }

    #[test]
    fn sentiment_defaults_to_neutral() {
        let table = default_engine()
            .synthesize(&make_candles(120), &[])
            .unwrap();
        let idx = table.column_index("sentiment").unwrap();
        assert!(table.rows.iter().all(|r| r[idx] == NEUTRAL_SENTIMENT));
    }

    #[test]
    fn sentiment_joins_by_calendar_date() {
        let candles = make_candles(120);
        let sentiment = vec![SentimentPoint {
            date: candles[30].timestamp.date_naive(),
            value: 80.0,
        }];
        let table = default_engine().synthesize(&candles, &sentiment).unwrap();
        let idx = table.column_index("sentiment").unwrap();
        assert_eq!(table.rows[30][idx], 80.0);
        // A different calendar day falls back to neutral.
        assert_eq!(table.rows[60][idx], NEUTRAL_SENTIMENT);
    }

    #[test]
    fn targets_shift_close_by_horizon() {
        let candles = make_candles(120);
        let table = default_engine().synthesize(&candles, &[]).unwrap();
        assert_eq!(table.targets[0], Some(candles[4].close));
        assert_eq!(table.targets[115], Some(candles[119].close));
        assert!(table.targets[116].is_none());
        assert!(table.targets[119].is_none());
    }

    #[test]
    fn labeled_view_drops_unlabeled_tail() {
        let table = default_engine()
            .synthesize(&make_candles(120), &[])
            .unwrap();
        let (rows, targets) = table.labeled();
        assert_eq!(rows.len(), 116);
        assert_eq!(targets.len(), 116);
    }

    #[test]
    fn unknown_configured_feature_is_an_error() {
        let engine = FeatureEngine::new(vec!["close".to_string(), "vwap".to_string()], 4);
        let err = engine.synthesize(&make_candles(120), &[]).unwrap_err();
        assert!(matches!(err, AgentError::Feature(_)));
        assert!(err.to_string().contains("vwap"));
    }

    #[test]
    fn too_short_history_is_a_feature_error() {
        // 20 bars cannot warm up a 50-period EMA.
        let err = default_engine()
            .synthesize(&make_candles(20), &[])
            .unwrap_err();
        assert!(matches!(err, AgentError::Feature(_)));
    }

    #[test]
    fn empty_candles_is_a_data_error() {
        let err = default_engine().synthesize(&[], &[]).unwrap_err();
        assert!(matches!(err, AgentError::Data(_)));
    }

    #[test]
    fn column_order_follows_configuration() {
        let engine = FeatureEngine::new(
            vec!["rsi_14".to_string(), "close".to_string()],
            4,
        );
        let table = engine.synthesize(&make_candles(120), &[]).unwrap();
        assert_eq!(table.columns(), ["rsi_14", "close"]);
        assert_eq!(table.column_index("close"), Some(1));
    }

    #[test]
    fn configured_names_are_case_normalized() {
        let engine = FeatureEngine::new(vec!["RSI_14".to_string(), "Close".to_string()], 4);
        let table = engine.synthesize(&make_candles(120), &[]).unwrap();
        assert_eq!(table.columns(), ["rsi_14", "close"]);
    }

    #[test]
    fn impute_fills_leading_and_trailing_gaps() {
        let mut values = vec![f64::NAN, f64::NAN, 3.0, 4.0, f64::NAN];
        impute(&mut values);
        assert_eq!(values, vec![3.0, 3.0, 3.0, 4.0, 4.0]);
    }
}
