//! Model architecture contract.
//!
//! The four architecture parameters are a versioned contract between
//! training and serving: weights persisted under one architecture must not
//! load under another.

use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Non-linearity applied to the final hidden state before projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    Tanh,
    Sigmoid,
    Relu,
}

impl Activation {
    pub fn apply(&self, x: &Array1<f64>) -> Array1<f64> {
        match self {
            Activation::Tanh => x.mapv(f64::tanh),
            Activation::Sigmoid => x.mapv(|v| 1.0 / (1.0 + (-v).exp())),
            Activation::Relu => x.mapv(|v| v.max(0.0)),
        }
    }
}

/// Architecture of the sequence model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelArchitecture {
    /// Width of one sequence element (channels).
    #[serde(default = "default_input_size")]
    pub input_size: usize,

    /// Hidden state width of each recurrent layer.
    #[serde(default = "default_hidden_size")]
    pub hidden_size: usize,

    /// Number of stacked recurrent layers.
    #[serde(default = "default_num_stacked_layers")]
    pub num_stacked_layers: usize,

    /// Dropout probability between stacked layers. Recorded as part of the
    /// contract; inference always runs with dropout disabled.
    #[serde(default)]
    pub dropout: f64,

    /// Activation before the output projection.
    #[serde(default = "default_activation")]
    pub activation: Activation,
}

fn default_input_size() -> usize {
    1
}

fn default_hidden_size() -> usize {
    7
}

fn default_num_stacked_layers() -> usize {
    1
}

fn default_activation() -> Activation {
    Activation::Tanh
}

impl Default for ModelArchitecture {
    fn default() -> Self {
        Self {
            input_size: default_input_size(),
            hidden_size: default_hidden_size(),
            num_stacked_layers: default_num_stacked_layers(),
            dropout: 0.0,
            activation: default_activation(),
        }
    }
}
