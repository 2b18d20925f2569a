//! HTTP request handlers

use std::sync::Arc;

use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::engine::Executor;

/// Shared application state
pub struct AppState {
    pub executor: Executor,
}

impl AppState {
    pub fn new(executor: Executor) -> Self {
        Self { executor }
    }
}

/// Health check endpoint
pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// Artifact summary endpoint
pub async fn info(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let manifest = state.executor.context().manifest();
    let response = InfoResponse {
        target: manifest.schema.target().to_string(),
        num_lags: manifest.schema.num_lags(),
        hidden_size: manifest.architecture.hidden_size,
        num_stacked_layers: manifest.architecture.num_stacked_layers,
        format_version: manifest.format_version,
        created_at: manifest.created_at.clone(),
    };
    (StatusCode::OK, Json(response))
}

/// Prediction endpoint
pub async fn predict(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<serde_json::Value>,
) -> Response {
    match state.executor.predict(&payload) {
        Ok(prediction) => (StatusCode::OK, Json(PredictResponse { prediction })).into_response(),
        Err(err) if err.is_client_error() => (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: ErrorDetail {
                    message: err.to_string(),
                    r#type: "invalid_request_error".to_string(),
                },
            }),
        )
            .into_response(),
        Err(err) => {
            tracing::error!("inference failed: {}", err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: ErrorDetail {
                        message: err.to_string(),
                        r#type: "server_error".to_string(),
                    },
                }),
            )
                .into_response()
        }
    }
}

// Response types

#[derive(Serialize)]
pub struct PredictResponse {
    pub prediction: f64,
}

#[derive(Serialize)]
pub struct InfoResponse {
    pub target: String,
    pub num_lags: usize,
    pub hidden_size: usize,
    pub num_stacked_layers: usize,
    pub format_version: u32,
    pub created_at: String,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub message: String,
    pub r#type: String,
}
