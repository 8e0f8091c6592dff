//! Per-symbol prediction: feature synthesis, windowing, scaling, the model
//! forward pass, and interpretation into a trend signal with a bounded
//! confidence score and a short rationale.

use crate::config::ModelConfig;
use crate::error::{AgentError, Result};
use crate::features::sequence::SequenceWindower;
use crate::features::{FeatureEngine, NEUTRAL_SENTIMENT};
use crate::model::ModelBundle;
use crate::types::{Candle, Prediction, SentimentPoint, Trend};

pub struct Predictor {
    config: ModelConfig,
}

impl Predictor {
    pub fn new(config: ModelConfig) -> Self {
        Self { config }
    }

    /// Full prediction for one symbol. The model bundle is loaded once per
    /// invocation; a load failure aborts this symbol only.
    pub fn predict(
        &self,
        symbol: &str,
        friendly_name: &str,
        candles: &[Candle],
        sentiment: &[SentimentPoint],
    ) -> Result<Prediction> {
        let bundle = ModelBundle::load(&self.config)?;
        self.predict_with_bundle(&bundle, symbol, friendly_name, candles, sentiment)
    }

    pub fn predict_with_bundle(
        &self,
        bundle: &ModelBundle,
        symbol: &str,
        friendly_name: &str,
        candles: &[Candle],
        sentiment: &[SentimentPoint],
    ) -> Result<Prediction> {
        let current_price = match candles.last() {
            Some(last) => last.close,
            None => {
                return Err(AgentError::Data(format!(
                    "no historical data for {symbol}"
                )))
            }
        };

        let engine = FeatureEngine::new(
            self.config.features.clone(),
            self.config.prediction_horizon,
        );
        let table = engine.synthesize(candles, sentiment)?;

        let windower = SequenceWindower::new(self.config.sequence_length);
        let window = windower.latest(&table.rows).ok_or_else(|| {
            AgentError::Feature(format!(
                "only {} feature rows for {symbol}, need {}",
                table.len(),
                self.config.sequence_length
            ))
        })?;

        let scaled = bundle.scaler_x.transform(&window)?;
        let forecast = bundle.model.predict(&scaled)?;
        let predicted_price = bundle.scaler_y.inverse_transform_one(forecast, 0);

        let percent_change = (predicted_price - current_price) / current_price * 100.0;
        let trend = Trend::from_percent_change(percent_change);

        let atr = table.latest("atr_14").unwrap_or(0.0);
        let confidence = confidence_score(percent_change, atr, current_price);

        let reason = build_reasoning(
            table.latest("rsi_14").unwrap_or(50.0),
            table.latest("ema_10").unwrap_or(0.0),
            table.latest("ema_50").unwrap_or(0.0),
            table.latest("sentiment").unwrap_or(NEUTRAL_SENTIMENT),
            trend,
        );

        tracing::info!(
            "prediction for {}: {} at {:.2}% confidence ({:+.3}% move)",
            symbol,
            trend,
            confidence,
            percent_change
        );

        Ok(Prediction {
            symbol: symbol.to_string(),
            friendly_name: friendly_name.to_string(),
            current_price,
            predicted_price,
            trend,
            confidence,
            atr,
            reason,
        })
    }
}

/// Confidence grows with the predicted move relative to recent volatility
/// (ATR as a percent of price), from a base of 50, capped at 99. A zero
/// ATR yields an uninformative 50.
fn confidence_score(percent_change: f64, atr: f64, current_price: f64) -> f64 {
    if atr > 0.0 {
        let atr_pct = atr / current_price * 100.0;
        (50.0 + (percent_change.abs() / atr_pct) * 25.0).min(99.0)
    } else {
        50.0
    }
}

/// Short natural-language rationale: a momentum read from RSI, a trend
/// read from the EMA ordering, and a crowd-mood read from sentiment. Each
/// clause is independent; none triggering falls back to a generic line.
fn build_reasoning(rsi: f64, ema_short: f64, ema_long: f64, sentiment: f64, trend: Trend) -> String {
    let mut reasons: Vec<&str> = Vec::new();

    match trend {
        Trend::Up => {
            if rsi > 60.0 {
                reasons.push("strong bullish momentum (RSI above 60)");
            } else if rsi > 50.0 {
                reasons.push("mildly positive momentum (RSI above 50)");
            }
        }
        Trend::Down => {
            if rsi < 40.0 {
                reasons.push("strong bearish momentum (RSI below 40)");
            } else if rsi < 50.0 {
                reasons.push("mildly negative momentum (RSI below 50)");
            }
        }
        Trend::Neutral => {}
    }

    if ema_short > ema_long {
        reasons.push("short-term trend strengthening (EMA cross)");
    } else if ema_short < ema_long {
        reasons.push("short-term trend weakening (EMA cross)");
    }

    if sentiment > 65.0 {
        reasons.push("crowd sentiment is greedy");
    } else if sentiment < 35.0 {
        reasons.push("crowd sentiment is fearful");
    }

    if reasons.is_empty() {
        "Mixed market conditions across the main indicators.".to_string()
    } else {
        format!("Supported by {}.", reasons.join(", "))
    }
}
