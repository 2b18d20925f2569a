//! Artifact info command

use std::path::PathBuf;

use anyhow::Result;

use crate::loader::ArtifactManifest;
use crate::model::MODEL_FILE;
use crate::scaler::{INPUT_SCALER_FILE, OUTPUT_SCALER_FILE};

/// Show artifact bundle information
pub async fn info(artifacts: Option<PathBuf>) -> Result<()> {
    let artifact_dir = super::artifact_dir(artifacts);
    let manifest = ArtifactManifest::load(&artifact_dir)?;

    println!("Artifact bundle: {}\n", artifact_dir.display());
    println!("Format version: {}", manifest.format_version);
    println!("Created: {}", manifest.created_at);
    println!();
    println!("Pipeline:");
    println!("  target: {}", manifest.schema.target());
    println!("  num_lags: {}", manifest.schema.num_lags());
    println!("  orientation: {:?}", manifest.schema.orientation());
    println!();
    println!("Architecture:");
    println!("  input_size: {}", manifest.architecture.input_size);
    println!("  hidden_size: {}", manifest.architecture.hidden_size);
    println!(
        "  num_stacked_layers: {}",
        manifest.architecture.num_stacked_layers
    );
    println!("  dropout: {}", manifest.architecture.dropout);
    println!("  activation: {:?}", manifest.architecture.activation);
    println!();
    println!("Blobs:");
    for name in [INPUT_SCALER_FILE, OUTPUT_SCALER_FILE, MODEL_FILE] {
        let status = if artifact_dir.join(name).exists() {
            "present"
        } else {
            "MISSING"
        };
        println!("  {:<20} {}", name, status);
    }

    Ok(())
}
