//! Min-max range scalers and their persistence.
//!
//! Two independently fit scalers travel with every trained model: one over
//! the lag-window features, one over the target column. The same fit
//! parameters must serve forward scaling before inference and inverse
//! scaling after it; mismatched scaler versions silently corrupt
//! predictions, so both blobs are written and loaded together with the
//! artifact manifest.

use std::path::Path;

use anyhow::{Context, Result};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::error::PetrodError;

/// Per-column affine map into a fixed target range, default [-1, 1].
///
/// Values outside the fit range extrapolate linearly. That is accepted
/// behavior: it is logged as a warning, never rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinMaxScaler {
    feature_range: (f64, f64),
    data_min: Vec<f64>,
    data_max: Vec<f64>,
}

impl MinMaxScaler {
    /// New unfit scaler targeting [-1, 1].
    pub fn new() -> Self {
        Self::with_range(-1.0, 1.0)
    }

    /// New unfit scaler targeting a custom range.
    pub fn with_range(low: f64, high: f64) -> Self {
        Self {
            feature_range: (low, high),
            data_min: Vec::new(),
            data_max: Vec::new(),
        }
    }

    pub fn is_fit(&self) -> bool {
        !self.data_min.is_empty()
    }

    /// Number of feature columns seen at fit time.
    pub fn num_features(&self) -> usize {
        self.data_min.len()
    }

    /// Record per-column min/max over the given data.
    pub fn fit(&mut self, data: &Array2<f64>) -> Result<(), PetrodError> {
        if data.nrows() == 0 || data.ncols() == 0 {
            return Err(PetrodError::ShapeMismatch(
                "cannot fit scaler on empty data".to_string(),
            ));
        }

        let ncols = data.ncols();
        let mut mins = vec![f64::INFINITY; ncols];
        let mut maxs = vec![f64::NEG_INFINITY; ncols];

        for row in data.rows() {
            for (j, &v) in row.iter().enumerate() {
                mins[j] = mins[j].min(v);
                maxs[j] = maxs[j].max(v);
            }
        }

        self.data_min = mins;
        self.data_max = maxs;
        Ok(())
    }

    /// Apply the stored affine map.
    pub fn transform(&self, data: &Array2<f64>) -> Result<Array2<f64>, PetrodError> {
        self.check_columns(data)?;

        let (low, high) = self.feature_range;
        let mut out_of_range = 0usize;
        let mut scaled = data.clone();

        for mut row in scaled.rows_mut() {
            for (j, v) in row.iter_mut().enumerate() {
                let min = self.data_min[j];
                let max = self.data_max[j];
                if *v < min || *v > max {
                    out_of_range += 1;
                }
                let span = range_span(min, max);
                *v = (*v - min) / span * (high - low) + low;
            }
        }

        if out_of_range > 0 {
            tracing::warn!(
                out_of_range,
                "values outside the fit range were extrapolated linearly"
            );
        }

        Ok(scaled)
    }

    /// Exact algebraic inverse of [`transform`](Self::transform).
    pub fn inverse_transform(&self, data: &Array2<f64>) -> Result<Array2<f64>, PetrodError> {
        self.check_columns(data)?;

        let (low, high) = self.feature_range;
        let mut restored = data.clone();

        for mut row in restored.rows_mut() {
            for (j, v) in row.iter_mut().enumerate() {
                let min = self.data_min[j];
                let max = self.data_max[j];
                let span = range_span(min, max);
                *v = (*v - low) / (high - low) * span + min;
            }
        }

        Ok(restored)
    }

    /// Fit on the data and return it scaled.
    pub fn fit_transform(&mut self, data: &Array2<f64>) -> Result<Array2<f64>, PetrodError> {
        self.fit(data)?;
        self.transform(data)
    }

    fn check_columns(&self, data: &Array2<f64>) -> Result<(), PetrodError> {
        if !self.is_fit() {
            return Err(PetrodError::ScalerNotLoaded(
                "transform called before fit".to_string(),
            ));
        }
        if data.ncols() != self.num_features() {
            return Err(PetrodError::ShapeMismatch(format!(
                "scaler was fit on {} columns, data has {}",
                self.num_features(),
                data.ncols()
            )));
        }
        Ok(())
    }
}

impl Default for MinMaxScaler {
    fn default() -> Self {
        Self::new()
    }
}

/// A degenerate column (min == max) maps every fit-time value to the low
/// end of the target range instead of dividing by zero.
fn range_span(min: f64, max: f64) -> f64 {
    let span = max - min;
    if span == 0.0 {
        1.0
    } else {
        span
    }
}

/// The input scaler and output scaler for one trained model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalerPair {
    input: MinMaxScaler,
    output: MinMaxScaler,
}

pub const INPUT_SCALER_FILE: &str = "input_scaler.bin";
pub const OUTPUT_SCALER_FILE: &str = "output_scaler.bin";

impl ScalerPair {
    pub fn new(input: MinMaxScaler, output: MinMaxScaler) -> Self {
        Self { input, output }
    }

    pub fn input(&self) -> &MinMaxScaler {
        &self.input
    }

    pub fn output(&self) -> &MinMaxScaler {
        &self.output
    }

    /// Persist both scalers into an artifact directory.
    pub fn save<P: AsRef<Path>>(&self, dir: P) -> Result<()> {
        let dir = dir.as_ref();
        write_blob(&dir.join(INPUT_SCALER_FILE), &self.input)?;
        write_blob(&dir.join(OUTPUT_SCALER_FILE), &self.output)?;
        Ok(())
    }

    /// Reload both scalers from an artifact directory.
    pub fn load<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        Ok(Self {
            input: read_blob(&dir.join(INPUT_SCALER_FILE))?,
            output: read_blob(&dir.join(OUTPUT_SCALER_FILE))?,
        })
    }
}

fn write_blob(path: &Path, scaler: &MinMaxScaler) -> Result<()> {
    let encoded = bincode::serialize(scaler)?;
    std::fs::write(path, encoded).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

fn read_blob(path: &Path) -> Result<MinMaxScaler> {
    let data =
        std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let scaler: MinMaxScaler = bincode::deserialize(&data)?;
    Ok(scaler)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_transform_maps_fit_range_to_target_range() {
        let mut scaler = MinMaxScaler::new();
        let data = array![[1.0, 10.0], [2.0, 20.0]];
        let scaled = scaler.fit_transform(&data).unwrap();

        assert_eq!(scaled[[0, 0]], -1.0);
        assert_eq!(scaled[[1, 0]], 1.0);
        assert_eq!(scaled[[0, 1]], -1.0);
        assert_eq!(scaled[[1, 1]], 1.0);
    }

    #[test]
    fn test_round_trip_identity() {
        let mut input = MinMaxScaler::new();
        let mut output = MinMaxScaler::new();
        let features = array![[3.1, 4.5, 9.9], [1.2, 8.8, 0.4], [5.0, 6.1, 2.2]];
        let targets = array![[55.2], [61.7], [48.9]];

        input.fit(&features).unwrap();
        output.fit(&targets).unwrap();

        let round_in = input
            .inverse_transform(&input.transform(&features).unwrap())
            .unwrap();
        let round_out = output
            .inverse_transform(&output.transform(&targets).unwrap())
            .unwrap();

        for (a, b) in features.iter().zip(round_in.iter()) {
            assert!((a - b).abs() < 1e-9);
        }
        for (a, b) in targets.iter().zip(round_out.iter()) {
            assert!((a - b).abs() < 1e-9);
        }
    }

    #[test]
    fn test_out_of_range_extrapolates_linearly() {
        let mut scaler = MinMaxScaler::new();
        scaler.fit(&array![[1.0], [2.0]]).unwrap();

        let scaled = scaler.transform(&array![[3.0]]).unwrap();
        assert!((scaled[[0, 0]] - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_degenerate_column_maps_to_range_low() {
        let mut scaler = MinMaxScaler::new();
        let data = array![[5.0], [5.0]];
        let scaled = scaler.fit_transform(&data).unwrap();
        assert_eq!(scaled[[0, 0]], -1.0);
    }

    #[test]
    fn test_transform_before_fit_fails() {
        let scaler = MinMaxScaler::new();
        let err = scaler.transform(&array![[1.0]]).unwrap_err();
        assert!(matches!(err, PetrodError::ScalerNotLoaded(_)));
    }

    #[test]
    fn test_column_count_mismatch_fails() {
        let mut scaler = MinMaxScaler::new();
        scaler.fit(&array![[1.0, 2.0]]).unwrap();
        let err = scaler.transform(&array![[1.0]]).unwrap_err();
        assert!(matches!(err, PetrodError::ShapeMismatch(_)));
    }

    #[test]
    fn test_pair_persistence_behaves_identically() {
        let dir = tempfile::tempdir().unwrap();

        let mut input = MinMaxScaler::new();
        let mut output = MinMaxScaler::new();
        let features = array![[1.0, 4.0], [9.0, 2.0]];
        let targets = array![[10.0], [50.0]];
        input.fit(&features).unwrap();
        output.fit(&targets).unwrap();

        let pair = ScalerPair::new(input, output);
        pair.save(dir.path()).unwrap();
        let reloaded = ScalerPair::load(dir.path()).unwrap();

        assert_eq!(pair, reloaded);
        let probe = array![[2.5, 3.5]];
        assert_eq!(
            pair.input().transform(&probe).unwrap(),
            reloaded.input().transform(&probe).unwrap()
        );
    }
}
