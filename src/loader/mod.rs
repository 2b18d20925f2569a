//! Artifact bundle loading.
//!
//! A trained model ships as one directory holding four files that are
//! written together and must be loaded together:
//!
//! - `manifest.json` — format version, feature schema, architecture
//! - `input_scaler.bin` / `output_scaler.bin` — the fitted scaler pair
//! - `model.bin` — the sequence model weights
//!
//! Loading a bundle whose pieces disagree is a configuration error, not a
//! runtime-recoverable one: the process must fail before accepting traffic.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::config::FeatureSchema;
use crate::model::{LstmModel, ModelArchitecture, MODEL_FILE};
use crate::scaler::{ScalerPair, INPUT_SCALER_FILE, OUTPUT_SCALER_FILE};

pub const MANIFEST_FILE: &str = "manifest.json";

/// Bundle format version. Bumped on any incompatible change to the blob
/// layout or manifest fields.
pub const FORMAT_VERSION: u32 = 1;

/// Versioning record written next to the blobs at training time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactManifest {
    pub format_version: u32,
    pub created_at: String,
    pub schema: FeatureSchema,
    pub architecture: ModelArchitecture,
}

impl ArtifactManifest {
    pub fn new(schema: FeatureSchema, architecture: ModelArchitecture) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            created_at: chrono::Utc::now().format("%Y-%m-%d_%H-%M-%S").to_string(),
            schema,
            architecture,
        }
    }

    pub fn load<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let path = dir.as_ref().join(MANIFEST_FILE);
        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.display()))?;
        let manifest: Self = serde_json::from_str(&contents)
            .with_context(|| format!("decoding {}", path.display()))?;
        Ok(manifest)
    }

    pub fn save<P: AsRef<Path>>(&self, dir: P) -> Result<()> {
        let path = dir.as_ref().join(MANIFEST_FILE);
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, contents)
            .with_context(|| format!("writing {}", path.display()))?;
        Ok(())
    }
}

/// Everything serving needs, loaded and cross-checked.
#[derive(Debug)]
pub struct ArtifactBundle {
    pub manifest: ArtifactManifest,
    pub scalers: ScalerPair,
    pub model: LstmModel,
}

/// Check that a directory holds a complete bundle.
pub fn detect_bundle<P: AsRef<Path>>(dir: P) -> Result<PathBuf> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        bail!("artifact path is not a directory: {}", dir.display());
    }

    let required = [
        MANIFEST_FILE,
        INPUT_SCALER_FILE,
        OUTPUT_SCALER_FILE,
        MODEL_FILE,
    ];
    let missing: Vec<&str> = required
        .iter()
        .copied()
        .filter(|name| !dir.join(name).exists())
        .collect();
    if !missing.is_empty() {
        bail!(
            "incomplete artifact bundle at {}: missing {}",
            dir.display(),
            missing.join(", ")
        );
    }

    Ok(dir.to_path_buf())
}

/// Load and validate a complete bundle.
///
/// All version and shape checks happen here, once, at startup.
pub fn load_bundle<P: AsRef<Path>>(dir: P) -> Result<ArtifactBundle> {
    let dir = detect_bundle(dir)?;

    let manifest = ArtifactManifest::load(&dir)?;
    if manifest.format_version != FORMAT_VERSION {
        bail!(
            "artifact bundle has format version {}, this build supports {}",
            manifest.format_version,
            FORMAT_VERSION
        );
    }

    let scalers = ScalerPair::load(&dir)?;
    validate_scalers(&scalers, &manifest.schema)?;

    let model = LstmModel::load(dir.join(MODEL_FILE), &manifest.architecture)?;

    tracing::info!(
        target_column = manifest.schema.target(),
        num_lags = manifest.schema.num_lags(),
        hidden_size = manifest.architecture.hidden_size,
        "artifact bundle loaded from {}",
        dir.display()
    );

    Ok(ArtifactBundle {
        manifest,
        scalers,
        model,
    })
}

fn validate_scalers(scalers: &ScalerPair, schema: &FeatureSchema) -> Result<()> {
    use crate::error::PetrodError;

    if !scalers.input().is_fit() || !scalers.output().is_fit() {
        return Err(PetrodError::ScalerNotLoaded("scaler blob is unfit".to_string()).into());
    }
    if scalers.input().num_features() != schema.num_lags() {
        return Err(PetrodError::ScalerNotLoaded(format!(
            "input scaler covers {} columns, schema declares {} lags",
            scalers.input().num_features(),
            schema.num_lags()
        ))
        .into());
    }
    if scalers.output().num_features() != 1 {
        return Err(PetrodError::ScalerNotLoaded(format!(
            "output scaler covers {} columns, target is a single value",
            scalers.output().num_features()
        ))
        .into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ColumnOrder, FeatureSchema};
    use crate::scaler::MinMaxScaler;
    use ndarray::Array2;

    fn write_test_bundle(dir: &Path, num_lags: usize) {
        let schema = FeatureSchema::new("pbr", num_lags, ColumnOrder::OldestFirst);
        let arch = ModelArchitecture::default();

        let mut input = MinMaxScaler::new();
        let mut output = MinMaxScaler::new();
        input
            .fit(&Array2::from_shape_fn((2, num_lags), |(i, _)| i as f64))
            .unwrap();
        output
            .fit(&Array2::from_shape_fn((2, 1), |(i, _)| 40.0 + i as f64))
            .unwrap();

        ArtifactManifest::new(schema, arch).save(dir).unwrap();
        ScalerPair::new(input, output).save(dir).unwrap();
        LstmModel::new(arch).save(dir.join(MODEL_FILE)).unwrap();
    }

    #[test]
    fn test_load_complete_bundle() {
        let dir = tempfile::tempdir().unwrap();
        write_test_bundle(dir.path(), 7);

        let bundle = load_bundle(dir.path()).unwrap();
        assert_eq!(bundle.manifest.schema.num_lags(), 7);
        assert_eq!(bundle.scalers.input().num_features(), 7);
    }

    #[test]
    fn test_missing_blob_is_detected() {
        let dir = tempfile::tempdir().unwrap();
        write_test_bundle(dir.path(), 7);
        std::fs::remove_file(dir.path().join(MODEL_FILE)).unwrap();

        let err = load_bundle(dir.path()).unwrap_err();
        assert!(err.to_string().contains("incomplete artifact bundle"));
    }

    #[test]
    fn test_scaler_schema_mismatch_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        // scalers fit for 5 lags, manifest declaring 5 as well, then a
        // manifest rewrite pretending the bundle has 7
        write_test_bundle(dir.path(), 5);
        let schema = FeatureSchema::new("pbr", 7, ColumnOrder::OldestFirst);
        ArtifactManifest::new(schema, ModelArchitecture::default())
            .save(dir.path())
            .unwrap();

        assert!(load_bundle(dir.path()).is_err());
    }
}
