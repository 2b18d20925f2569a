//! Immutable serving context.
//!
//! Everything a request needs — schema, scaler pair, model — is loaded
//! once at startup into one read-only object and shared by reference.
//! Nothing mutates it after construction, so concurrent handlers need no
//! locking.

use std::path::Path;

use anyhow::Result;

use crate::config::FeatureSchema;
use crate::error::PetrodError;
use crate::loader::{self, ArtifactManifest};
use crate::model::Regressor;
use crate::scaler::ScalerPair;

pub struct ServingContext {
    manifest: ArtifactManifest,
    scalers: ScalerPair,
    model: Box<dyn Regressor>,
}

impl ServingContext {
    /// Assemble a context, verifying the scalers match the schema.
    ///
    /// Serving a request through an unfit or mismatched scaler pair is
    /// ruled out here rather than checked per request.
    pub fn new(
        manifest: ArtifactManifest,
        scalers: ScalerPair,
        model: Box<dyn Regressor>,
    ) -> Result<Self, PetrodError> {
        if !scalers.input().is_fit() || !scalers.output().is_fit() {
            return Err(PetrodError::ScalerNotLoaded(
                "serving context built before scalers were fit".to_string(),
            ));
        }
        if scalers.input().num_features() != manifest.schema.num_lags() {
            return Err(PetrodError::ScalerNotLoaded(format!(
                "input scaler covers {} columns, schema declares {} lags",
                scalers.input().num_features(),
                manifest.schema.num_lags()
            )));
        }
        Ok(Self {
            manifest,
            scalers,
            model,
        })
    }

    /// Load a validated artifact bundle into a context. Any failure here
    /// is fatal; the server must not start.
    pub fn load<P: AsRef<Path>>(artifact_dir: P) -> Result<Self> {
        let bundle = loader::load_bundle(artifact_dir)?;
        let context = Self::new(bundle.manifest, bundle.scalers, Box::new(bundle.model))?;
        Ok(context)
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.manifest.schema
    }

    pub fn manifest(&self) -> &ArtifactManifest {
        &self.manifest
    }

    pub fn scalers(&self) -> &ScalerPair {
        &self.scalers
    }

    pub fn model(&self) -> &dyn Regressor {
        self.model.as_ref()
    }
}
