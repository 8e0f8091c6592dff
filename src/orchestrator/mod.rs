//! Per-cycle driver.
//!
//! One cycle: recalibrate the confidence gate from the ledger, predict for
//! every configured symbol, surface the predictions that clear the gate,
//! and append every prediction (gated or not) so the next cycle's feedback
//! loop can judge it. Per-symbol failures are collected as values; only
//! ledger failures abort the cycle.

use crate::config::Config;
use crate::data::{CandleSource, SentimentSource};
use crate::error::{AgentError, Result};
use crate::feedback::PerformanceFeedbackLoop;
use crate::history::HistoryStore;
use crate::notify::Notifier;
use crate::predictor::Predictor;
use crate::types::{Prediction, PredictionRecord, SentimentPoint};
use chrono::Utc;

/// A symbol that produced no prediction this cycle, and why.
#[derive(Debug)]
pub struct SymbolFailure {
    pub symbol: String,
    pub error: AgentError,
}

/// What one cycle did, for logging and the CLI.
#[derive(Debug)]
pub struct CycleReport {
    pub threshold: f64,
    pub predictions: Vec<Prediction>,
    pub notified: usize,
    pub failures: Vec<SymbolFailure>,
}

pub struct Orchestrator<'a, C: CandleSource, S: SentimentSource> {
    config: &'a Config,
    store: &'a HistoryStore,
    candles: &'a C,
    sentiment: &'a S,
    notifier: &'a Notifier,
}

impl<'a, C: CandleSource, S: SentimentSource> Orchestrator<'a, C, S> {
    pub fn new(
        config: &'a Config,
        store: &'a HistoryStore,
        candles: &'a C,
        sentiment: &'a S,
        notifier: &'a Notifier,
    ) -> Self {
        Self {
            config,
            store,
            candles,
            sentiment,
            notifier,
        }
    }

    pub async fn run_cycle(&self) -> Result<CycleReport> {
        tracing::info!("===== prediction cycle starting =====");

        let feedback = PerformanceFeedbackLoop::new(
            self.store,
            self.candles,
            self.config.adaptive.clone(),
            self.config.data.interval.clone(),
        );
        let threshold = feedback.evaluate().await?;
        tracing::info!("confidence gate for this cycle: {}%", threshold);

        // Sentiment absence is tolerated: the feature engine substitutes a
        // neutral reading for every bar.
        let sentiment = match self.sentiment.fetch_sentiment().await {
            Ok(points) => points,
            Err(e) => {
                tracing::warn!("sentiment fetch failed, proceeding neutral: {}", e);
                Vec::new()
            }
        };

        let predictor = Predictor::new(self.config.model.clone());
        let mut predictions = Vec::new();
        let mut failures = Vec::new();

        for symbol in &self.config.symbols.list {
            match self.predict_symbol(&predictor, symbol, &sentiment).await {
                Ok(prediction) => predictions.push(prediction),
                Err(error) => {
                    tracing::warn!("no prediction for {} this cycle: {}", symbol, error);
                    failures.push(SymbolFailure {
                        symbol: symbol.clone(),
                        error,
                    });
                }
            }
        }

        let qualifying: Vec<Prediction> = predictions
            .iter()
            .filter(|p| p.confidence >= threshold)
            .cloned()
            .collect();

        let mut notified = 0;
        if qualifying.is_empty() {
            tracing::info!("no signal cleared the {}% confidence gate", threshold);
        } else {
            match self
                .notifier
                .send_predictions(&qualifying, threshold, &self.config.agent.name)
                .await
            {
                Ok(()) => {
                    notified = qualifying.len();
                    tracing::info!("notified {} signal(s)", notified);
                }
                Err(e) => tracing::error!("notification failed: {}", e),
            }
        }

        // Every prediction goes into the ledger, gated or not; a record
        // that never had a chance to notify still trains the gate.
        if !predictions.is_empty() {
            let created_at = Utc::now();
            let records: Vec<PredictionRecord> = predictions
                .iter()
                .map(|p| {
                    PredictionRecord::from_prediction(
                        p,
                        self.config.model.prediction_horizon as u32,
                        threshold,
                        created_at,
                    )
                })
                .collect();
            self.store.append(&records).await?;
        }

        tracing::info!(
            "===== cycle complete: {} prediction(s), {} notified, {} failed =====",
            predictions.len(),
            notified,
            failures.len()
        );

        Ok(CycleReport {
            threshold,
            predictions,
            notified,
            failures,
        })
    }

    async fn predict_symbol(
        &self,
        predictor: &Predictor,
        symbol: &str,
        sentiment: &[SentimentPoint],
    ) -> Result<Prediction> {
        let candles = self
            .candles
            .fetch_candles(symbol, &self.config.data.interval, self.config.data.output_size)
            .await?;
        let friendly_name = self.config.symbols.friendly_name(symbol);
        predictor.predict(symbol, &friendly_name, &candles, sentiment)
    }
}
