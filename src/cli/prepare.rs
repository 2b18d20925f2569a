//! Dataset preparation command
//!
//! Reads the raw time-indexed table, generates the lag columns, fits the
//! scaler pair, and writes the artifact bundle. A missing input file is a
//! fatal error with no partial output.

use std::path::PathBuf;

use anyhow::{bail, Result};

use crate::config::PetrodConfig;
use crate::dataset::{add_lags, DatasetBuilder, Table};
use crate::loader::ArtifactManifest;
use crate::model::{LstmModel, MODEL_FILE};

/// Build the training dataset and persist the fitted artifacts
pub async fn prepare(
    data: PathBuf,
    artifacts: Option<PathBuf>,
    config: Option<PathBuf>,
    init_model: bool,
) -> Result<()> {
    let artifact_dir = super::artifact_dir(artifacts);

    let config = match config {
        Some(path) => PetrodConfig::from_path(path)?,
        None => PetrodConfig::default(),
    };

    if !data.exists() {
        bail!("training data not found: {}", data.display());
    }

    let table = Table::from_csv(&data)?;
    tracing::info!(
        rows = table.num_rows(),
        columns = table.columns().len(),
        "loaded {}",
        data.display()
    );

    let pipeline = &config.pipeline;
    let schema = pipeline.schema();
    let lagged = add_lags(&table, pipeline.num_lags, &[pipeline.target.as_str()])?;
    let dataset = DatasetBuilder::fit(&lagged, &schema)?;

    std::fs::create_dir_all(&artifact_dir)?;
    ArtifactManifest::new(schema, config.architecture).save(&artifact_dir)?;
    dataset.scalers().save(&artifact_dir)?;

    if init_model {
        let model = LstmModel::new(config.architecture);
        model.save(artifact_dir.join(MODEL_FILE))?;
        tracing::info!("wrote freshly initialized model weights");
    }

    tracing::info!(
        samples = dataset.len(),
        num_lags = pipeline.num_lags,
        "artifact bundle written to {}",
        artifact_dir.display()
    );
    println!(
        "Prepared {} samples with {} lags of '{}' into {}",
        dataset.len(),
        pipeline.num_lags,
        pipeline.target,
        artifact_dir.display()
    );

    Ok(())
}
