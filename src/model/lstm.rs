//! Inference-only stacked LSTM with a dense readout head.
//!
//! The agent never trains: weights come from a serialized artifact written
//! by the offline training pipeline, and only the forward pass exists here.

use crate::error::{AgentError, Result};
use crate::model::ForecastModel;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LstmCell {
    pub input_size: usize,
    pub hidden_size: usize,

    // input gate
    w_ii: Array2<f64>,
    w_hi: Array2<f64>,
    b_i: Array1<f64>,
    // forget gate
    w_if: Array2<f64>,
    w_hf: Array2<f64>,
    b_f: Array1<f64>,
    // cell candidate
    w_ig: Array2<f64>,
    w_hg: Array2<f64>,
    b_g: Array1<f64>,
    // output gate
    w_io: Array2<f64>,
    w_ho: Array2<f64>,
    b_o: Array1<f64>,
}

impl LstmCell {
    /// Zero-initialized cell (forget bias 1.0). Placeholder weights for
    /// artifacts assembled outside the training pipeline, e.g. in tests.
    pub fn zeroed(input_size: usize, hidden_size: usize) -> Self {
        Self {
            input_size,
            hidden_size,
            w_ii: Array2::zeros((hidden_size, input_size)),
            w_hi: Array2::zeros((hidden_size, hidden_size)),
            b_i: Array1::zeros(hidden_size),
            w_if: Array2::zeros((hidden_size, input_size)),
            w_hf: Array2::zeros((hidden_size, hidden_size)),
            b_f: Array1::from_elem(hidden_size, 1.0),
            w_ig: Array2::zeros((hidden_size, input_size)),
            w_hg: Array2::zeros((hidden_size, hidden_size)),
            b_g: Array1::zeros(hidden_size),
            w_io: Array2::zeros((hidden_size, input_size)),
            w_ho: Array2::zeros((hidden_size, hidden_size)),
            b_o: Array1::zeros(hidden_size),
        }
    }

    /// One time step:
    /// i = σ(W_ii·x + W_hi·h + b_i), f = σ(W_if·x + W_hf·h + b_f),
    /// g = tanh(W_ig·x + W_hg·h + b_g), o = σ(W_io·x + W_ho·h + b_o),
    /// c' = f∘c + i∘g, h' = o∘tanh(c').
    fn forward(
        &self,
        x: &Array1<f64>,
        h_prev: &Array1<f64>,
        c_prev: &Array1<f64>,
    ) -> (Array1<f64>, Array1<f64>) {
        let i_gate = sigmoid(&(self.w_ii.dot(x) + self.w_hi.dot(h_prev) + &self.b_i));
        let f_gate = sigmoid(&(self.w_if.dot(x) + self.w_hf.dot(h_prev) + &self.b_f));
        let g = tanh(&(self.w_ig.dot(x) + self.w_hg.dot(h_prev) + &self.b_g));
        let o_gate = sigmoid(&(self.w_io.dot(x) + self.w_ho.dot(h_prev) + &self.b_o));

        let c_next = &f_gate * c_prev + &i_gate * &g;
        let h_next = &o_gate * &tanh(&c_next);

        (h_next, c_next)
    }

    fn init_hidden(&self) -> (Array1<f64>, Array1<f64>) {
        (
            Array1::zeros(self.hidden_size),
            Array1::zeros(self.hidden_size),
        )
    }
}

/// Linear dense layer (the trained readout head uses no activations).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dense {
    weights: Array2<f64>,
    biases: Array1<f64>,
}

impl Dense {
    pub fn zeroed(input_size: usize, output_size: usize) -> Self {
        Self {
            weights: Array2::zeros((output_size, input_size)),
            biases: Array1::zeros(output_size),
        }
    }

    fn forward(&self, x: &Array1<f64>) -> Array1<f64> {
        self.weights.dot(x) + &self.biases
    }
}

/// Stacked LSTM layers feeding a dense readout; the last layer's final
/// hidden state is the head's input, and the head's single output is the
/// scaled price forecast.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LstmForecaster {
    cells: Vec<LstmCell>,
    head: Vec<Dense>,
}

impl LstmForecaster {
    /// Zero-initialized network with the given topology. `hidden_sizes`
    /// lists one size per LSTM layer; `head_sizes` lists the dense layer
    /// widths and must end in 1.
    pub fn zeroed(input_size: usize, hidden_sizes: &[usize], head_sizes: &[usize]) -> Self {
        let mut cells = Vec::with_capacity(hidden_sizes.len());
        let mut in_size = input_size;
        for &hidden in hidden_sizes {
            cells.push(LstmCell::zeroed(in_size, hidden));
            in_size = hidden;
        }

        let mut head = Vec::with_capacity(head_sizes.len());
        for &out_size in head_sizes {
            head.push(Dense::zeroed(in_size, out_size));
            in_size = out_size;
        }

        Self { cells, head }
    }

    pub fn input_size(&self) -> usize {
        self.cells.first().map(|c| c.input_size).unwrap_or(0)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read(path.as_ref()).map_err(|e| {
            AgentError::Model(format!(
                "failed to read model {}: {e}",
                path.as_ref().display()
            ))
        })?;
        bincode::deserialize(&raw)
            .map_err(|e| AgentError::Model(format!("failed to decode model artifact: {e}")))
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let raw = bincode::serialize(self)
            .map_err(|e| AgentError::Model(format!("failed to encode model artifact: {e}")))?;
        std::fs::write(path.as_ref(), raw).map_err(|e| {
            AgentError::Model(format!(
                "failed to write model {}: {e}",
                path.as_ref().display()
            ))
        })
    }
}

impl ForecastModel for LstmForecaster {
    fn predict(&self, sequence: &[Vec<f64>]) -> Result<f64> {
        if self.cells.is_empty() || self.head.is_empty() {
            return Err(AgentError::Model("model has no layers".to_string()));
        }
        if sequence.is_empty() {
            return Err(AgentError::Model("empty input sequence".to_string()));
        }

        let input_size = self.input_size();
        let mut states: Vec<(Array1<f64>, Array1<f64>)> =
            self.cells.iter().map(|cell| cell.init_hidden()).collect();

        for row in sequence {
            if row.len() != input_size {
                return Err(AgentError::Model(format!(
                    "model expects {} features per step, got {}",
                    input_size,
                    row.len()
                )));
            }
            let mut layer_input = Array1::from_vec(row.clone());
            for (layer_idx, cell) in self.cells.iter().enumerate() {
                let (h_prev, c_prev) = &states[layer_idx];
                let (h_next, c_next) = cell.forward(&layer_input, h_prev, c_prev);
                layer_input = h_next.clone();
                states[layer_idx] = (h_next, c_next);
            }
        }

        let mut out = states[self.cells.len() - 1].0.clone();
        for layer in &self.head {
            out = layer.forward(&out);
        }
        Ok(out[0])
    }
}

fn sigmoid(x: &Array1<f64>) -> Array1<f64> {
    x.mapv(|v| 1.0 / (1.0 + (-v).exp()))
}

fn tanh(x: &Array1<f64>) -> Array1<f64> {
    x.mapv(|v| v.tanh())
}
