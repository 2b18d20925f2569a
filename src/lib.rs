//! Petrod - petroleum price forecast serving
//!
//! Petrod serves one-step forecasts from a trained stacked-LSTM regressor
//! and prepares the dataset that model trains on.
//!
//! # Architecture
//!
//! The serving path is one strictly sequential pipeline per request:
//! decode → scale → window → infer → inverse-scale → respond, with
//! per-request telemetry dispatched off the response path. The scaler
//! pair, feature schema, and model weights ship together as one versioned
//! artifact bundle, loaded once at startup into an immutable context.
//!
//! The training-time side mirrors the same schema: lag generation,
//! scaler fitting, and windowing all derive their column order from the
//! one `FeatureSchema` persisted in the bundle manifest.
//!
//! # Example
//!
//! ```bash
//! # Fit scalers and write the artifact bundle
//! petrod prepare petro.csv --artifacts ./artifacts --init-model
//!
//! # Start the server
//! petrod serve --artifacts ./artifacts --port 8000
//!
//! # One-shot forecast
//! petrod predict --input 71.2,71.8,70.9,72.4,73.0,72.6,73.1
//! ```

pub mod cli;
pub mod config;
pub mod dataset;
pub mod engine;
pub mod error;
pub mod loader;
pub mod metrics;
pub mod model;
pub mod scaler;
pub mod server;

// Re-export key types
pub use config::{ColumnOrder, FeatureSchema, PetrodConfig, PipelineConfig, ServerConfig};
pub use engine::{Executor, ServingContext};
pub use error::PetrodError;
pub use loader::{load_bundle, ArtifactBundle, ArtifactManifest};
pub use model::{LstmModel, ModelArchitecture, Regressor};
pub use scaler::{MinMaxScaler, ScalerPair};
