//! Configuration loaded from `config.toml` plus `TRENDCAST_*` environment
//! overrides. Every component receives the sections it needs at
//! construction; nothing reads global state.

use crate::error::Result;
use serde::Deserialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub symbols: SymbolsConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub adaptive: AdaptiveConfig,
    pub telegram: Option<TelegramConfig>,
    #[serde(default)]
    pub database: DatabaseConfig,
}

impl Config {
    /// Layer a TOML file (optional) under environment overrides, e.g.
    /// `TRENDCAST_DATA__API_KEY` maps to `data.api_key`.
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix("TRENDCAST").separator("__"))
            .build()?;
        Ok(settings.try_deserialize()?)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    /// Display name used in notification headers.
    #[serde(default = "default_agent_name")]
    pub name: String,
    /// Pause between cycles in watch mode.
    #[serde(default = "default_watch_interval")]
    pub watch_interval_secs: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            watch_interval_secs: default_watch_interval(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DataConfig {
    /// Twelve Data API key.
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_fear_greed_url")]
    pub fear_greed_url: String,
    /// Bar interval in Twelve Data notation ("1h", "4h", "1day", ...).
    #[serde(default = "default_interval")]
    pub interval: String,
    /// Bars requested per prediction fetch.
    #[serde(default = "default_output_size")]
    pub output_size: u32,
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    #[serde(default = "default_retry_delay")]
    pub retry_delay_secs: u64,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_base_url(),
            fear_greed_url: default_fear_greed_url(),
            interval: default_interval(),
            output_size: default_output_size(),
            retry_attempts: default_retry_attempts(),
            retry_delay_secs: default_retry_delay(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SymbolsConfig {
    #[serde(default = "default_symbols")]
    pub list: Vec<String>,
    /// Display names for notifications; symbols without an entry fall back
    /// to the raw symbol.
    #[serde(default = "default_friendly_names")]
    pub friendly_names: HashMap<String, String>,
}

impl SymbolsConfig {
    pub fn friendly_name(&self, symbol: &str) -> String {
        self.friendly_names
            .get(symbol)
            .cloned()
            .unwrap_or_else(|| symbol.to_string())
    }
}

impl Default for SymbolsConfig {
    fn default() -> Self {
        Self {
            list: default_symbols(),
            friendly_names: default_friendly_names(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_model_path")]
    pub model_path: String,
    #[serde(default = "default_scaler_x_path")]
    pub scaler_x_path: String,
    #[serde(default = "default_scaler_y_path")]
    pub scaler_y_path: String,
    /// Bars per input sequence.
    #[serde(default = "default_sequence_length")]
    pub sequence_length: usize,
    /// Bars ahead a prediction targets.
    #[serde(default = "default_prediction_horizon")]
    pub prediction_horizon: usize,
    /// Ordered feature columns. The order is a contract shared with the
    /// trained model; reordering invalidates its learned weighting.
    #[serde(default = "default_features")]
    pub features: Vec<String>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model_path: default_model_path(),
            scaler_x_path: default_scaler_x_path(),
            scaler_y_path: default_scaler_y_path(),
            sequence_length: default_sequence_length(),
            prediction_horizon: default_prediction_horizon(),
            features: default_features(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdaptiveConfig {
    /// Baseline confidence gate the control law steps from each cycle.
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f64,
    #[serde(default = "default_max_confidence")]
    pub max_confidence: f64,
    /// How many recent records the rolling backtest considers.
    #[serde(default = "default_accuracy_lookback")]
    pub accuracy_lookback: u32,
    /// Accuracy below this tightens the gate.
    #[serde(default = "default_performance_threshold")]
    pub performance_threshold: f64,
}

impl Default for AdaptiveConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: default_confidence_threshold(),
            min_confidence: default_min_confidence(),
            max_confidence: default_max_confidence(),
            accuracy_lookback: default_accuracy_lookback(),
            performance_threshold: default_performance_threshold(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_path")]
    pub path: String,
}

impl DatabaseConfig {
    /// Path with `~` expanded.
    pub fn expanded_path(&self) -> String {
        shellexpand::tilde(&self.path).into_owned()
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}

fn default_agent_name() -> String {
    "TrendCast".to_string()
}

fn default_watch_interval() -> u64 {
    3600
}

fn default_base_url() -> String {
    "https://api.twelvedata.com".to_string()
}

fn default_fear_greed_url() -> String {
    "https://api.alternative.me/fng/?limit=90".to_string()
}

fn default_interval() -> String {
    "1h".to_string()
}

fn default_output_size() -> u32 {
    500
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_retry_delay() -> u64 {
    5
}

fn default_symbols() -> Vec<String> {
    [
        "XAU/USD", "EUR/USD", "USD/JPY", "GBP/USD", "GBP/JPY", "AUD/USD", "USD/CHF",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_friendly_names() -> HashMap<String, String> {
    let mut names = HashMap::new();
    names.insert("XAU/USD".to_string(), "Gold (XAU/USD)".to_string());
    names
}

fn default_model_path() -> String {
    "models/lstm_forex.bin".to_string()
}

fn default_scaler_x_path() -> String {
    "models/scaler_x.json".to_string()
}

fn default_scaler_y_path() -> String {
    "models/scaler_y.json".to_string()
}

fn default_sequence_length() -> usize {
    24
}

fn default_prediction_horizon() -> usize {
    4
}

fn default_features() -> Vec<String> {
    [
        "open",
        "high",
        "low",
        "close",
        "volume",
        "ema_10",
        "ema_50",
        "sma_20",
        "rsi_14",
        "macd",
        "macd_signal",
        "macd_hist",
        "atr_14",
        "bb_lower",
        "bb_middle",
        "bb_upper",
        "sentiment",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_confidence_threshold() -> f64 {
    75.0
}

fn default_min_confidence() -> f64 {
    60.0
}

fn default_max_confidence() -> f64 {
    90.0
}

fn default_accuracy_lookback() -> u32 {
    50
}

fn default_performance_threshold() -> f64 {
    0.5
}

fn default_database_path() -> String {
    "data/predictions.db".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_config_defaults() {
        let config: DataConfig = toml::from_str("").unwrap();
        assert_eq!(config.interval, "1h");
        assert_eq!(config.output_size, 500);
        assert_eq!(config.retry_attempts, 3);
        assert_eq!(config.retry_delay_secs, 5);
    }

    #[test]
    fn adaptive_config_defaults() {
        let config: AdaptiveConfig = toml::from_str("").unwrap();
        assert_eq!(config.confidence_threshold, 75.0);
        assert_eq!(config.min_confidence, 60.0);
        assert_eq!(config.max_confidence, 90.0);
        assert_eq!(config.accuracy_lookback, 50);
        assert_eq!(config.performance_threshold, 0.5);
    }

    #[test]
    fn model_config_defaults() {
        let config: ModelConfig = toml::from_str("").unwrap();
        assert_eq!(config.sequence_length, 24);
        assert_eq!(config.prediction_horizon, 4);
        assert_eq!(config.features.len(), 17);
        assert_eq!(config.features[0], "open");
        assert_eq!(config.features[16], "sentiment");
    }

    #[test]
    fn symbols_config_defaults() {
        let config: SymbolsConfig = toml::from_str("").unwrap();
        assert_eq!(config.list.len(), 7);
        assert_eq!(config.friendly_name("XAU/USD"), "Gold (XAU/USD)");
        assert_eq!(config.friendly_name("EUR/USD"), "EUR/USD");
    }

    #[test]
    fn adaptive_config_partial_override() {
        let toml_str = r#"
confidence_threshold = 80.0
max_confidence = 95.0
"#;
        let config: AdaptiveConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.confidence_threshold, 80.0);
        assert_eq!(config.max_confidence, 95.0);
        assert_eq!(config.min_confidence, 60.0);
    }

    #[test]
    fn telegram_config_requires_credentials() {
        let toml_str = r#"
bot_token = "123:abc"
chat_id = "42"
"#;
        let config: TelegramConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.bot_token, "123:abc");
        assert_eq!(config.chat_id, "42");
    }

    #[test]
    fn full_config_from_empty_toml() {
        let config: Config = toml::from_str("").unwrap();
        assert!(config.telegram.is_none());
        assert_eq!(config.database.path, "data/predictions.db");
        assert_eq!(config.agent.name, "TrendCast");
    }
}
