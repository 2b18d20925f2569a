//! CLI commands
//!
//! Provides the serving, one-shot prediction, dataset preparation, and
//! artifact inspection entry points.

mod info;
mod predict;
mod prepare;
mod serve;

pub use info::info;
pub use predict::predict;
pub use prepare::prepare;
pub use serve::serve;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Petrod - petroleum price forecast server
#[derive(Parser)]
#[command(name = "petrod")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the forecast server
    Serve {
        /// Artifact bundle directory
        #[arg(long, short)]
        artifacts: Option<PathBuf>,

        /// Port to listen on
        #[arg(long, default_value = "8000")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "0.0.0.0")]
        host: String,

        /// Telemetry collector URL (omit to disable uploads)
        #[arg(long)]
        metrics_url: Option<String>,
    },

    /// One-shot forecast (non-interactive)
    Predict {
        /// Artifact bundle directory
        #[arg(long, short)]
        artifacts: Option<PathBuf>,

        /// Comma-separated lag values, oldest first
        #[arg(long, short)]
        input: String,
    },

    /// Prepare the training dataset and fit the scaler pair
    Prepare {
        /// Raw time-indexed CSV file
        data: PathBuf,

        /// Output artifact directory
        #[arg(long, short)]
        artifacts: Option<PathBuf>,

        /// Pipeline/architecture configuration file (YAML or JSON)
        #[arg(long, short)]
        config: Option<PathBuf>,

        /// Also write freshly initialized model weights, so the bundle can
        /// be served before a training run replaces them
        #[arg(long)]
        init_model: bool,
    },

    /// Show artifact bundle information
    Info {
        /// Artifact bundle directory
        #[arg(long, short)]
        artifacts: Option<PathBuf>,
    },
}

/// Resolve the artifact directory: flag, then PETROD_ARTIFACT_DIR, then
/// ./artifacts.
pub(crate) fn artifact_dir(flag: Option<PathBuf>) -> PathBuf {
    flag.unwrap_or_else(|| {
        std::env::var("PETROD_ARTIFACT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./artifacts"))
    })
}
