//! Min-max feature scaling with the same semantics as the scalers the
//! training pipeline exports: per-column data min/max, mapping onto [0, 1].

use crate::error::{AgentError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MinMaxScaler {
    pub data_min: Vec<f64>,
    pub data_max: Vec<f64>,
}

impl MinMaxScaler {
    /// Fit from rows of equal width. Used by tests and artifact tooling;
    /// live inference only ever loads a fitted scaler.
    pub fn fit(rows: &[Vec<f64>]) -> Result<Self> {
        let width = rows
            .first()
            .map(|r| r.len())
            .ok_or_else(|| AgentError::Model("cannot fit a scaler on no rows".to_string()))?;
        let mut data_min = vec![f64::INFINITY; width];
        let mut data_max = vec![f64::NEG_INFINITY; width];
        for row in rows {
            for (i, &v) in row.iter().enumerate() {
                data_min[i] = data_min[i].min(v);
                data_max[i] = data_max[i].max(v);
            }
        }
        Ok(Self { data_min, data_max })
    }

    pub fn n_features(&self) -> usize {
        self.data_min.len()
    }

    pub fn transform_row(&self, row: &[f64]) -> Result<Vec<f64>> {
        if row.len() != self.n_features() {
            return Err(AgentError::Model(format!(
                "scaler expects {} features, got {}",
                self.n_features(),
                row.len()
            )));
        }
        Ok(row
            .iter()
            .enumerate()
            .map(|(i, &v)| {
                let range = self.data_max[i] - self.data_min[i];
                if range == 0.0 {
                    0.0
                } else {
                    (v - self.data_min[i]) / range
                }
            })
            .collect())
    }

    pub fn transform(&self, rows: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        rows.iter().map(|row| self.transform_row(row)).collect()
    }

    /// Map a scaled value in column `column` back to its original range.
    pub fn inverse_transform_one(&self, value: f64, column: usize) -> f64 {
        let range = self.data_max[column] - self.data_min[column];
        value * range + self.data_min[column]
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            AgentError::Model(format!(
                "failed to read scaler {}: {e}",
                path.as_ref().display()
            ))
        })?;
        let scaler: Self = serde_json::from_str(&raw)
            .map_err(|e| AgentError::Model(format!("failed to parse scaler: {e}")))?;
        if scaler.data_min.len() != scaler.data_max.len() {
            return Err(AgentError::Model(
                "scaler min/max vectors disagree in length".to_string(),
            ));
        }
        Ok(scaler)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let raw = serde_json::to_string_pretty(self)
            .map_err(|e| AgentError::Model(format!("failed to serialize scaler: {e}")))?;
        std::fs::write(path.as_ref(), raw).map_err(|e| {
            AgentError::Model(format!(
                "failed to write scaler {}: {e}",
                path.as_ref().display()
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transform_maps_onto_unit_interval() {
        let scaler = MinMaxScaler::fit(&[vec![0.0, 10.0], vec![5.0, 20.0], vec![10.0, 30.0]])
            .unwrap();
        let scaled = scaler.transform_row(&[5.0, 10.0]).unwrap();
        assert_eq!(scaled, vec![0.5, 0.0]);
    }

    #[test]
    fn inverse_round_trips_in_range_values() {
        let scaler = MinMaxScaler::fit(&[vec![1.0], vec![1.5]]).unwrap();
        let scaled = scaler.transform_row(&[1.2]).unwrap();
        let back = scaler.inverse_transform_one(scaled[0], 0);
        assert!((back - 1.2).abs() < 1e-12);
    }

    #[test]
    fn constant_column_scales_to_zero() {
        let scaler = MinMaxScaler::fit(&[vec![7.0], vec![7.0]]).unwrap();
        let scaled = scaler.transform_row(&[7.0]).unwrap();
        assert_eq!(scaled, vec![0.0]);
    }

    #[test]
    fn dimension_mismatch_is_a_model_error() {
        let scaler = MinMaxScaler::fit(&[vec![0.0, 1.0]]).unwrap();
        assert!(scaler.transform_row(&[1.0]).is_err());
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scaler.json");
        let scaler = MinMaxScaler::fit(&[vec![0.0, -1.0], vec![2.0, 4.0]]).unwrap();
        scaler.save(&path).unwrap();
        let loaded = MinMaxScaler::load(&path).unwrap();
        assert_eq!(loaded.data_min, scaler.data_min);
        assert_eq!(loaded.data_max, scaler.data_max);
    }
}
