//! Sequence model components.
//!
//! This module contains the architecture contract and the stacked LSTM
//! regressor, plus the seam that lets the serving pipeline run against any
//! single-output regressor.

mod config;
mod lstm;

pub use config::{Activation, ModelArchitecture};
pub use lstm::{LstmCell, LstmModel, MODEL_FILE};

use ndarray::{Array2, Array3};

/// A model that maps a `(batch, seq_len, channels)` window to one scalar
/// forecast per batch element, in scaled space.
pub trait Regressor: Send + Sync {
    fn forward(&self, window: &Array3<f64>) -> Array2<f64>;
}
