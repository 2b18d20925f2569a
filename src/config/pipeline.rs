//! Pipeline parameters and the shared feature schema.
//!
//! The schema is the single source of truth for lag-column naming and
//! ordering. Both the training-time dataset builder and the serving-time
//! decode path construct their column order from it, and it travels inside
//! the artifact manifest so the two paths cannot diverge.

use ndarray::Array3;
use serde::{Deserialize, Serialize};

use crate::error::PetrodError;

/// Ordering of lag columns within a window.
///
/// Inbound requests always carry values oldest-first (`t-n .. t-1`);
/// `MostRecentFirst` reverses them before scaling and inference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnOrder {
    OldestFirst,
    MostRecentFirst,
}

impl Default for ColumnOrder {
    fn default() -> Self {
        ColumnOrder::OldestFirst
    }
}

/// Pipeline parameters shared by training and serving.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Target column in the raw table.
    #[serde(default = "default_target")]
    pub target: String,

    /// Number of lagged observations per window.
    #[serde(default = "default_num_lags")]
    pub num_lags: usize,

    /// Lag-column ordering used for scaler fitting and model input.
    #[serde(default)]
    pub orientation: ColumnOrder,
}

fn default_target() -> String {
    "pbr".to_string()
}

fn default_num_lags() -> usize {
    7
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            target: default_target(),
            num_lags: default_num_lags(),
            orientation: ColumnOrder::default(),
        }
    }
}

impl PipelineConfig {
    /// Build the feature schema these parameters describe.
    pub fn schema(&self) -> FeatureSchema {
        FeatureSchema::new(&self.target, self.num_lags, self.orientation)
    }
}

/// Ordered list of named lag columns for one target variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSchema {
    target: String,
    num_lags: usize,
    orientation: ColumnOrder,
}

impl FeatureSchema {
    pub fn new(target: &str, num_lags: usize, orientation: ColumnOrder) -> Self {
        Self {
            target: target.to_string(),
            num_lags,
            orientation,
        }
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn num_lags(&self) -> usize {
        self.num_lags
    }

    pub fn orientation(&self) -> ColumnOrder {
        self.orientation
    }

    /// Lag-column names in schema order.
    ///
    /// Oldest-first yields `pbr_(t-7) .. pbr_(t-1)` for seven lags.
    pub fn column_names(&self) -> Vec<String> {
        let mut lags: Vec<usize> = (1..=self.num_lags).rev().collect();
        if self.orientation == ColumnOrder::MostRecentFirst {
            lags.reverse();
        }
        lags.iter()
            .map(|k| format!("{}_(t-{})", self.target, k))
            .collect()
    }

    /// Arrange a wire-order (oldest-first) slice into schema order.
    ///
    /// Fails if the value count does not match `num_lags`.
    pub fn arrange(&self, wire: &[f64]) -> Result<Vec<f64>, PetrodError> {
        if wire.len() != self.num_lags {
            return Err(PetrodError::MalformedRequest(format!(
                "expected {} lag values, got {}",
                self.num_lags,
                wire.len()
            )));
        }
        let mut values = wire.to_vec();
        if self.orientation == ColumnOrder::MostRecentFirst {
            values.reverse();
        }
        Ok(values)
    }

    /// Reshape one schema-ordered record into the model input tensor of
    /// shape `(batch=1, num_lags, channels=1)`.
    ///
    /// No reordering happens here; callers must pass values already in
    /// schema order.
    pub fn to_window(&self, values: &[f64]) -> Result<Array3<f64>, PetrodError> {
        if values.len() != self.num_lags {
            return Err(PetrodError::ShapeMismatch(format!(
                "window holds {} values, schema expects {}",
                values.len(),
                self.num_lags
            )));
        }
        Array3::from_shape_vec((1, self.num_lags, 1), values.to_vec())
            .map_err(|e| PetrodError::ShapeMismatch(e.to_string()))
    }
}
