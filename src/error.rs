//! Error types for the prediction agent.
//!
//! Each variant maps to a distinct failure domain so the orchestrator can
//! decide per unit of work whether to skip, log, or propagate.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, AgentError>;

#[derive(Debug, Error)]
pub enum AgentError {
    /// Network or data source unavailable after the retry budget.
    #[error("fetch failed: {0}")]
    Fetch(String),

    /// Required feature column missing or not enough rows after synthesis.
    #[error("feature synthesis failed: {0}")]
    Feature(String),

    /// Forecasting model or scaler failed to load or predict.
    #[error("model error: {0}")]
    Model(String),

    /// Historical data empty or invalid for a symbol.
    #[error("invalid data: {0}")]
    Data(String),

    /// Ledger read/write failure. Propagated to the cycle caller.
    #[error("ledger error: {0}")]
    Persistence(#[from] sqlx::Error),

    /// Notification delivery failure. Logged, never escalates a cycle.
    #[error("notification error: {0}")]
    Notify(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for AgentError {
    fn from(err: reqwest::Error) -> Self {
        AgentError::Fetch(err.to_string())
    }
}

impl From<config::ConfigError> for AgentError {
    fn from(err: config::ConfigError) -> Self {
        AgentError::Config(err.to_string())
    }
}
