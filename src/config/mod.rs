//! Configuration system for petrod
//!
//! PetrodConfig bundles the model architecture contract, the pipeline
//! parameters shared by training and serving, and optional server and
//! telemetry settings.

mod metrics;
mod pipeline;
mod server;

pub use metrics::MetricsConfig;
pub use pipeline::{ColumnOrder, FeatureSchema, PipelineConfig};
pub use server::ServerConfig;

use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::model::ModelArchitecture;

/// Petrod configuration
///
/// Combines the architecture contract with pipeline and server settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PetrodConfig {
    /// Model architecture (versioned contract between training and serving)
    #[serde(default)]
    pub architecture: ModelArchitecture,

    /// Pipeline parameters (target column, lags, ordering)
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Server settings (only for `petrod serve`)
    #[serde(default)]
    pub server: Option<ServerConfig>,

    /// Telemetry settings
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl PetrodConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration from a JSON file
    pub fn from_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Load from a path, picking the format from the extension.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml(path),
            _ => Self::from_json(path),
        }
    }

    /// Number of lagged observations per window.
    pub fn num_lags(&self) -> usize {
        self.pipeline.num_lags
    }

    /// Hidden state width of the sequence model.
    pub fn hidden_size(&self) -> usize {
        self.architecture.hidden_size
    }
}
