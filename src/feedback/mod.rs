//! Rolling backtest and adaptive confidence gate.
//!
//! Each cycle the loop resolves pending predictions against freshly
//! fetched prices, recomputes accuracy over a bounded tail of resolved
//! records, and steps the confidence threshold from its configured
//! baseline: +5 when recent calls are unreliable, -2 when they hold up.
//! The asymmetric steps bias the system toward caution.

use crate::config::AdaptiveConfig;
use crate::data::{interval_duration, CandleSource};
use crate::error::Result;
use crate::history::HistoryStore;
use crate::types::{PredictionRecord, Trend};

/// Minimum ledger size before any analysis runs.
const MIN_HISTORY: i64 = 10;
/// The threshold moves off baseline only with more than this many
/// resolved samples.
const MIN_RESOLVED: usize = 10;
/// Bars fetched per resolution attempt.
const RESOLUTION_BARS: u32 = 100;

pub struct PerformanceFeedbackLoop<'a, S: CandleSource> {
    store: &'a HistoryStore,
    source: &'a S,
    config: AdaptiveConfig,
    interval: String,
}

impl<'a, S: CandleSource> PerformanceFeedbackLoop<'a, S> {
    pub fn new(
        store: &'a HistoryStore,
        source: &'a S,
        config: AdaptiveConfig,
        interval: impl Into<String>,
    ) -> Self {
        Self {
            store,
            source,
            config,
            interval: interval.into(),
        }
    }

    /// One evaluation pass: resolve pending predictions, recompute rolling
    /// accuracy, and return the confidence threshold for the coming cycle.
    /// Ledger failures propagate; per-record resolution failures do not.
    pub async fn evaluate(&self) -> Result<f64> {
        let baseline = self.config.confidence_threshold;

        if self.store.count().await? < MIN_HISTORY {
            tracing::info!(
                "not enough ledger history for analysis, keeping baseline threshold {}%",
                baseline
            );
            return Ok(baseline);
        }

        let pending = self
            .store
            .scan_unresolved(self.config.accuracy_lookback)
            .await?;
        if pending.is_empty() {
            if let Some(threshold) = self.store.last_adjusted_threshold().await? {
                tracing::info!(
                    "no new predictions to evaluate, reusing threshold {}%",
                    threshold
                );
                return Ok(threshold);
            }
            return Ok(baseline);
        }

        for record in &pending {
            if let Err(e) = self.resolve_record(record).await {
                // One bad resolution never aborts the batch.
                tracing::warn!(
                    "failed to resolve prediction {} for {}: {}",
                    record.id,
                    record.symbol,
                    e
                );
            }
        }

        let resolved = self
            .store
            .tail_resolved(self.config.accuracy_lookback)
            .await?;
        let mut new_threshold = baseline;
        if resolved.len() > MIN_RESOLVED {
            let correct = resolved
                .iter()
                .filter(|r| r.is_correct() == Some(true))
                .count();
            let accuracy = correct as f64 / resolved.len() as f64;
            tracing::info!(
                "rolling accuracy over {} resolved predictions: {:.1}%",
                resolved.len(),
                accuracy * 100.0
            );
            new_threshold = adjust_threshold(accuracy, &self.config);
            if new_threshold > baseline {
                tracing::warn!(
                    "accuracy below target, tightening confidence gate to {}%",
                    new_threshold
                );
            } else {
                tracing::info!("confidence gate set to {}%", new_threshold);
            }
        }

        self.store.record_adjusted_threshold(new_threshold).await?;
        Ok(new_threshold)
    }

    /// Resolve one record against the fetched bar nearest its target
    /// timestamp (created_at + horizon bars). The nearest bar may predate
    /// the true horizon when the feed has not caught up yet; the record is
    /// resolved anyway with that approximation.
    async fn resolve_record(&self, record: &PredictionRecord) -> Result<()> {
        let bars = self
            .source
            .fetch_candles(&record.symbol, &self.interval, RESOLUTION_BARS)
            .await?;
        let bar_len = interval_duration(&self.interval)?;
        let target = record.created_at + bar_len * record.horizon_bars as i32;
        let Some(nearest) = bars
            .iter()
            .min_by_key(|bar| (bar.timestamp - target).num_seconds().abs())
        else {
            return Ok(());
        };

        let percent_change =
            (nearest.close - record.current_price) / record.current_price * 100.0;
        let actual_trend = Trend::from_percent_change(percent_change);
        let is_correct = record.predicted_trend == actual_trend;

        self.store
            .resolve(&record.id, nearest.close, actual_trend, is_correct)
            .await?;
        tracing::debug!(
            "resolved {} for {}: predicted {}, actual {} ({})",
            record.id,
            record.symbol,
            record.predicted_trend,
            actual_trend,
            if is_correct { "correct" } else { "wrong" }
        );
        Ok(())
    }
}

/// Saturating control law: unreliable recent calls demand more confidence
/// (+5 toward `max_confidence`), reliable ones loosen the gate slowly
/// (-2 toward `min_confidence`). Steps always start from the baseline.
fn adjust_threshold(accuracy: f64, config: &AdaptiveConfig) -> f64 {
    if accuracy < config.performance_threshold {
        (config.confidence_threshold + 5.0).min(config.max_confidence)
    } else {
        (config.confidence_threshold - 2.0).max(config.min_confidence)
    }
}
