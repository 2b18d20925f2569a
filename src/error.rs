//! Error taxonomy for the serving pipeline.
//!
//! Request-shape errors are surfaced to the caller (4xx); load errors are
//! fatal at startup and the server never starts accepting traffic.

use thiserror::Error;

/// Errors produced by the core pipeline.
#[derive(Debug, Error)]
pub enum PetrodError {
    /// The inbound payload is missing the input key, is not numeric, or
    /// carries the wrong number of values. Rejected with 400.
    #[error("malformed request: {0}")]
    MalformedRequest(String),

    /// A scaler was used before being fit, or its fit parameters do not
    /// match the feature schema. Fatal at startup.
    #[error("scaler not loaded: {0}")]
    ScalerNotLoaded(String),

    /// Persisted model weights do not match the instantiated architecture.
    /// Fatal at startup.
    #[error("model load failed: {0}")]
    ModelLoad(String),

    /// An internal array had an unexpected shape. Surfaced as 500.
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),
}

impl PetrodError {
    /// Whether this error is a client error (request rejected, no crash).
    pub fn is_client_error(&self) -> bool {
        matches!(self, PetrodError::MalformedRequest(_))
    }
}
