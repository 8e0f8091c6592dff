//! Telegram notification delivery.
//!
//! The agent's only outbound effect besides persistence. Delivery failure
//! is reported to the caller, who logs it; a cycle never fails because a
//! message did not go out.

use crate::error::{AgentError, Result};
use crate::types::{Prediction, Trend};
use chrono::{DateTime, Utc};
use serde::Serialize;

pub struct Notifier {
    http: reqwest::Client,
    bot_token: Option<String>,
    chat_id: String,
}

#[derive(Debug, Serialize)]
struct SendMessageRequest {
    chat_id: String,
    text: String,
    parse_mode: String,
}

impl Notifier {
    pub fn new(bot_token: String, chat_id: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            bot_token: Some(bot_token),
            chat_id,
        }
    }

    /// A notifier that silently drops everything, for unconfigured setups.
    pub fn disabled() -> Self {
        Self {
            http: reqwest::Client::new(),
            bot_token: None,
            chat_id: String::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.bot_token.is_some()
    }

    /// Send the formatted signal digest for the qualifying predictions.
    pub async fn send_predictions(
        &self,
        predictions: &[Prediction],
        threshold: f64,
        agent_name: &str,
    ) -> Result<()> {
        let message = format_digest(predictions, threshold, agent_name, Utc::now());
        self.send_raw(&message).await
    }

    pub async fn send_raw(&self, text: &str) -> Result<()> {
        let Some(token) = &self.bot_token else {
            tracing::debug!("notifier disabled, dropping message");
            return Ok(());
        };

        let url = format!("https://api.telegram.org/bot{token}/sendMessage");
        let request = SendMessageRequest {
            chat_id: self.chat_id.clone(),
            text: text.to_string(),
            parse_mode: "Markdown".to_string(),
        };

        let response = self
            .http
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| AgentError::Notify(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AgentError::Notify(format!(
                "telegram returned {status}: {body}"
            )));
        }

        tracing::info!("notification delivered to telegram");
        Ok(())
    }
}

/// Build the full digest: header, market summary, one block per signal,
/// disclaimer footer.
fn format_digest(
    predictions: &[Prediction],
    threshold: f64,
    agent_name: &str,
    now: DateTime<Utc>,
) -> String {
    let stamp = now.format("%d-%m-%Y %H:%M UTC");
    let header = format!(
        "🔔 *MARKET FORECAST | {stamp}*\n_(analyzed by {agent_name} | min confidence: {threshold:.0}%)_\n\n"
    );

    let total = predictions.len();
    let up = predictions.iter().filter(|p| p.trend == Trend::Up).count();
    let down = predictions.iter().filter(|p| p.trend == Trend::Down).count();
    let sideways = total - up - down;
    let summary = format!(
        "📊 *Market summary:*\n{up}/{total} pairs up 🟢 | {down}/{total} pairs down 🔴 | sideways {sideways} ➡️\n"
    );

    let separator = "─────────────────────────────\n";

    let details: Vec<String> = predictions.iter().map(format_signal).collect();

    let footer = format!(
        "⚠️ *Disclaimer:*\nThis analysis is generated by {agent_name} and is not financial advice.\nDYOR and manage risk responsibly.\nLast updated: {stamp}"
    );

    format!(
        "{header}{summary}{separator}{}{separator}{footer}",
        details.join("\n")
    )
}

fn format_signal(p: &Prediction) -> String {
    let trend_emoji = match p.trend {
        Trend::Up => "📈",
        Trend::Down => "📉",
        Trend::Neutral => "➡️",
    };
    let color_emoji = match p.trend {
        Trend::Up => " 🟢",
        Trend::Down => " 🔴",
        Trend::Neutral => "",
    };
    let strength = if p.confidence >= 90.0 {
        " Strong"
    } else if p.confidence >= 80.0 {
        " Medium"
    } else {
        ""
    };

    let pd = price_decimals(&p.symbol);
    let ad = atr_decimals(&p.symbol);

    let levels = match stop_and_target(p) {
        Some((stop_loss, take_profit)) => {
            // Fixed 1.5x/2.0x ATR brackets give a constant 1:1.33 ratio.
            let risk = (p.current_price - stop_loss).abs();
            let reward = (take_profit - p.current_price).abs();
            let ratio = if risk > 0.0 {
                format!("1:{:.2}", reward / risk)
            } else {
                "n/a".to_string()
            };
            format!(
                "SL/TP: {stop_loss:.pd$} / {take_profit:.pd$} | R:R {ratio}\n",
                pd = pd
            )
        }
        None => "SL/TP: n/a\n".to_string(),
    };

    format!(
        "{trend_emoji} *{name}* | {conf:.0}%{color_emoji}{strength}\n\
         Price: {price:.pd$} | ATR: {atr:.ad$}\n\
         {levels}\
         Reason: _{reason}_\n",
        name = p.friendly_name,
        conf = p.confidence,
        price = p.current_price,
        atr = p.atr,
        reason = p.reason,
        pd = pd,
        ad = ad,
    )
}

/// Stop-loss 1.5 ATR against the call, take-profit 2 ATR with it. Neutral
/// calls carry no levels.
fn stop_and_target(p: &Prediction) -> Option<(f64, f64)> {
    match p.trend {
        Trend::Up => Some((
            p.current_price - 1.5 * p.atr,
            p.current_price + 2.0 * p.atr,
        )),
        Trend::Down => Some((
            p.current_price + 1.5 * p.atr,
            p.current_price - 2.0 * p.atr,
        )),
        Trend::Neutral => None,
    }
}

fn price_decimals(symbol: &str) -> usize {
    if symbol.contains("XAU") {
        2
    } else if symbol.contains("USD") {
        4
    } else {
        2
    }
}

fn atr_decimals(symbol: &str) -> usize {
    if symbol.contains("JPY") {
        3
    } else {
        4
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn make_prediction(trend: Trend, confidence: f64) -> Prediction {
        Prediction {
            symbol: "EUR/USD".to_string(),
            friendly_name: "EUR/USD".to_string(),
            current_price: 1.1,
            predicted_price: 1.105,
            trend,
            confidence,
            atr: 0.002,
            reason: "Supported by strong bullish momentum (RSI above 60).".to_string(),
        }
    }

    fn digest(predictions: &[Prediction]) -> String {
        format_digest(
            predictions,
            75.0,
            "TrendCast",
            Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap(),
        )
    }

    #[test]
    fn digest_counts_trends_in_summary() {
        let predictions = vec![
            make_prediction(Trend::Up, 92.0),
            make_prediction(Trend::Up, 85.0),
            make_prediction(Trend::Down, 81.0),
            make_prediction(Trend::Neutral, 77.0),
        ];
        let text = digest(&predictions);
        assert!(text.contains("2/4 pairs up"));
        assert!(text.contains("1/4 pairs down"));
        assert!(text.contains("sideways 1"));
        assert!(text.contains("min confidence: 75%"));
        assert!(text.contains("01-03-2024 09:30 UTC"));
    }

    #[test]
    fn up_signal_carries_atr_brackets() {
        let text = digest(&[make_prediction(Trend::Up, 92.0)]);
        // SL = 1.1 - 0.003, TP = 1.1 + 0.004.
        assert!(text.contains("SL/TP: 1.0970 / 1.1040"));
        assert!(text.contains("R:R 1:1.33"));
        assert!(text.contains("Strong"));
    }

    #[test]
    fn down_signal_inverts_the_brackets() {
        let text = digest(&[make_prediction(Trend::Down, 85.0)]);
        assert!(text.contains("SL/TP: 1.1030 / 1.0960"));
        assert!(text.contains("Medium"));
    }

    #[test]
    fn neutral_signal_has_no_brackets() {
        let text = digest(&[make_prediction(Trend::Neutral, 77.0)]);
        assert!(text.contains("SL/TP: n/a"));
        assert!(!text.contains("Strong"));
        assert!(!text.contains("Medium"));
    }

    #[test]
    fn formatting_precision_follows_the_pair() {
        assert_eq!(price_decimals("XAU/USD"), 2);
        assert_eq!(price_decimals("EUR/USD"), 4);
        assert_eq!(price_decimals("GBP/JPY"), 2);
        assert_eq!(atr_decimals("USD/JPY"), 3);
        assert_eq!(atr_decimals("EUR/USD"), 4);
    }

    #[test]
    fn disabled_notifier_reports_disabled() {
        assert!(!Notifier::disabled().is_enabled());
        assert!(Notifier::new("t".to_string(), "c".to_string()).is_enabled());
    }
}
