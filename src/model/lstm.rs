//! Stacked LSTM regressor.
//!
//! A stack of LSTM cells followed by an activation and a linear projection
//! to one output value. Inference is deterministic: there is no sampling
//! and dropout is never applied outside training.

use std::path::Path;

use anyhow::{Context, Result};
use ndarray::{s, Array1, Array2, Array3};
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use serde::{Deserialize, Serialize};

use super::config::ModelArchitecture;
use super::Regressor;
use crate::error::PetrodError;

/// One LSTM cell: four gates over (input, previous hidden).
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
    pub fn new(input_size: usize, hidden_size: usize) -> Self {
        let limit = (1.0 / hidden_size as f64).sqrt();
        let input_w = || Array2::random((hidden_size, input_size), Uniform::new(-limit, limit));
        let hidden_w = || Array2::random((hidden_size, hidden_size), Uniform::new(-limit, limit));

        Self {
            input_size,
            hidden_size,
            w_ii: input_w(),
            w_hi: hidden_w(),
            b_i: Array1::zeros(hidden_size),
            w_if: input_w(),
            w_hf: hidden_w(),
            // forget gate starts open
            b_f: Array1::from_elem(hidden_size, 1.0),
            w_ig: input_w(),
            w_hg: hidden_w(),
            b_g: Array1::zeros(hidden_size),
            w_io: input_w(),
            w_ho: hidden_w(),
            b_o: Array1::zeros(hidden_size),
        }
    }

    /// One time step: returns the next (hidden, cell) state.
    pub fn forward(
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

    pub fn init_hidden(&self) -> (Array1<f64>, Array1<f64>) {
        (
            Array1::zeros(self.hidden_size),
            Array1::zeros(self.hidden_size),
        )
    }
}

/// Linear output projection.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Dense {
    weights: Array2<f64>,
    biases: Array1<f64>,
}

impl Dense {
    fn new(input_size: usize, output_size: usize) -> Self {
        let limit = (1.0 / input_size as f64).sqrt();
        Self {
            weights: Array2::random((output_size, input_size), Uniform::new(-limit, limit)),
            biases: Array1::zeros(output_size),
        }
    }

    fn forward(&self, x: &Array1<f64>) -> Array1<f64> {
        self.weights.dot(x) + &self.biases
    }
}

/// Stacked LSTM with a single-output projection head.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LstmModel {
    architecture: ModelArchitecture,
    cells: Vec<LstmCell>,
    head: Dense,
}

pub const MODEL_FILE: &str = "model.bin";

impl LstmModel {
    /// Fresh model with randomly initialized weights.
    pub fn new(architecture: ModelArchitecture) -> Self {
        let mut cells = Vec::with_capacity(architecture.num_stacked_layers);
        cells.push(LstmCell::new(
            architecture.input_size,
            architecture.hidden_size,
        ));
        for _ in 1..architecture.num_stacked_layers {
            cells.push(LstmCell::new(
                architecture.hidden_size,
                architecture.hidden_size,
            ));
        }

        let head = Dense::new(architecture.hidden_size, 1);

        Self {
            architecture,
            cells,
            head,
        }
    }

    pub fn architecture(&self) -> &ModelArchitecture {
        &self.architecture
    }

    /// Check persisted weight shapes against the recorded architecture.
    pub fn validate(&self) -> Result<(), PetrodError> {
        let arch = &self.architecture;
        if self.cells.len() != arch.num_stacked_layers {
            return Err(PetrodError::ModelLoad(format!(
                "expected {} stacked layers, weights hold {}",
                arch.num_stacked_layers,
                self.cells.len()
            )));
        }
        for (idx, cell) in self.cells.iter().enumerate() {
            let expected_input = if idx == 0 {
                arch.input_size
            } else {
                arch.hidden_size
            };
            if cell.input_size != expected_input || cell.hidden_size != arch.hidden_size {
                return Err(PetrodError::ModelLoad(format!(
                    "layer {} has shape ({}, {}), architecture requires ({}, {})",
                    idx, cell.input_size, cell.hidden_size, expected_input, arch.hidden_size
                )));
            }
        }
        if self.head.weights.ncols() != arch.hidden_size || self.head.weights.nrows() != 1 {
            return Err(PetrodError::ModelLoad(format!(
                "projection head has shape {:?}, architecture requires (1, {})",
                self.head.weights.shape(),
                arch.hidden_size
            )));
        }
        Ok(())
    }

    /// Persist the weights as a bincode blob.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let encoded = bincode::serialize(self)?;
        std::fs::write(path.as_ref(), encoded)
            .with_context(|| format!("writing {}", path.as_ref().display()))?;
        Ok(())
    }

    /// Reload weights and verify them against the expected architecture.
    pub fn load<P: AsRef<Path>>(
        path: P,
        expected: &ModelArchitecture,
    ) -> Result<Self, PetrodError> {
        let data = std::fs::read(path.as_ref()).map_err(|e| {
            PetrodError::ModelLoad(format!("reading {}: {}", path.as_ref().display(), e))
        })?;
        let model: Self = bincode::deserialize(&data)
            .map_err(|e| PetrodError::ModelLoad(format!("decoding weights: {}", e)))?;

        if model.architecture != *expected {
            return Err(PetrodError::ModelLoad(format!(
                "weights were trained with {:?}, manifest declares {:?}",
                model.architecture, expected
            )));
        }
        model.validate()?;
        Ok(model)
    }
}

impl Regressor for LstmModel {
    /// Forward pass over `(batch, seq_len, channels)`, producing
    /// `(batch, 1)` in scaled space.
    fn forward(&self, x: &Array3<f64>) -> Array2<f64> {
        let batch_size = x.shape()[0];
        let seq_len = x.shape()[1];

        let mut outputs = Array2::zeros((batch_size, 1));

        for b in 0..batch_size {
            let mut states: Vec<(Array1<f64>, Array1<f64>)> =
                self.cells.iter().map(|cell| cell.init_hidden()).collect();

            for t in 0..seq_len {
                let mut layer_input: Array1<f64> = x.slice(s![b, t, ..]).to_owned();

                for (layer_idx, cell) in self.cells.iter().enumerate() {
                    let (h_prev, c_prev) = &states[layer_idx];
                    let (h_next, c_next) = cell.forward(&layer_input, h_prev, c_prev);
                    layer_input = h_next.clone();
                    states[layer_idx] = (h_next, c_next);
                }
            }

            let final_hidden = &states[self.cells.len() - 1].0;
            let activated = self.architecture.activation.apply(final_hidden);
            let output = self.head.forward(&activated);
            outputs[[b, 0]] = output[0];
        }

        outputs
    }
}

fn sigmoid(x: &Array1<f64>) -> Array1<f64> {
    x.mapv(|v| 1.0 / (1.0 + (-v).exp()))
}

fn tanh(x: &Array1<f64>) -> Array1<f64> {
    x.mapv(f64::tanh)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_state_shapes() {
        let cell = LstmCell::new(1, 7);
        let x = Array1::zeros(1);
        let (h, c) = cell.init_hidden();

        let (h_next, c_next) = cell.forward(&x, &h, &c);
        assert_eq!(h_next.len(), 7);
        assert_eq!(c_next.len(), 7);
    }

    #[test]
    fn test_forward_output_shape() {
        let model = LstmModel::new(ModelArchitecture::default());
        let x = Array3::zeros((2, 7, 1));
        let out = model.forward(&x);
        assert_eq!(out.shape(), &[2, 1]);
    }

    #[test]
    fn test_forward_is_deterministic() {
        let model = LstmModel::new(ModelArchitecture::default());
        let x = Array3::from_shape_fn((1, 7, 1), |(_, t, _)| 0.1 * t as f64 - 0.3);

        let first = model.forward(&x);
        let second = model.forward(&x);
        assert_eq!(first, second);
    }

    #[test]
    fn test_stacked_layers_count() {
        let arch = ModelArchitecture {
            num_stacked_layers: 2,
            ..Default::default()
        };
        let model = LstmModel::new(arch);
        assert!(model.validate().is_ok());
        assert_eq!(model.cells.len(), 2);
        assert_eq!(model.cells[1].input_size, arch.hidden_size);
    }

    #[test]
    fn test_load_rejects_architecture_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(MODEL_FILE);

        let model = LstmModel::new(ModelArchitecture::default());
        model.save(&path).unwrap();

        let other = ModelArchitecture {
            hidden_size: 16,
            ..Default::default()
        };
        let err = LstmModel::load(&path, &other).unwrap_err();
        assert!(matches!(err, PetrodError::ModelLoad(_)));
    }

    #[test]
    fn test_save_load_preserves_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(MODEL_FILE);

        let model = LstmModel::new(ModelArchitecture::default());
        model.save(&path).unwrap();
        let reloaded = LstmModel::load(&path, &ModelArchitecture::default()).unwrap();

        let x = Array3::from_shape_fn((1, 7, 1), |(_, t, _)| t as f64 / 7.0);
        assert_eq!(model.forward(&x), reloaded.forward(&x));
    }
}
