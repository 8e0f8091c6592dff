//! Forecasting model and scaler artifacts.
//!
//! The forecaster is opaque to the rest of the agent: a scaled sequence in,
//! one scaled scalar out. How it was trained is not this crate's concern.

pub mod lstm;
pub mod scaler;

pub use lstm::LstmForecaster;
pub use scaler::MinMaxScaler;

use crate::config::ModelConfig;
use crate::error::Result;

/// Opaque point-forecast model over a scaled feature sequence.
pub trait ForecastModel: Send + Sync {
    /// `sequence` is `[time_step][feature]`, already scaled; the output is
    /// in the target scaler's space.
    fn predict(&self, sequence: &[Vec<f64>]) -> Result<f64>;
}

/// The trained model plus its input and output scalers, loaded together.
/// Any load failure is a fatal model error for the invocation.
pub struct ModelBundle {
    pub model: Box<dyn ForecastModel>,
    pub scaler_x: MinMaxScaler,
    pub scaler_y: MinMaxScaler,
}

impl ModelBundle {
    pub fn load(config: &ModelConfig) -> Result<Self> {
        let model = LstmForecaster::load(&config.model_path)?;
        let scaler_x = MinMaxScaler::load(&config.scaler_x_path)?;
        let scaler_y = MinMaxScaler::load(&config.scaler_y_path)?;
        Ok(Self {
            model: Box::new(model),
            scaler_x,
            scaler_y,
        })
    }

    pub fn from_parts(
        model: Box<dyn ForecastModel>,
        scaler_x: MinMaxScaler,
        scaler_y: MinMaxScaler,
    ) -> Self {
        Self {
            model,
            scaler_x,
            scaler_y,
        }
    }
}
