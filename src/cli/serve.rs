//! HTTP server command

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;

use crate::config::{MetricsConfig, ServerConfig};
use crate::engine::{Executor, ServingContext};
use crate::metrics::MetricsEmitter;
use crate::server;

/// Start the forecast server
pub async fn serve(
    artifacts: Option<PathBuf>,
    port: u16,
    host: String,
    metrics_url: Option<String>,
) -> Result<()> {
    let artifact_dir = super::artifact_dir(artifacts);

    tracing::info!("Loading artifact bundle from {}", artifact_dir.display());
    let context = Arc::new(ServingContext::load(&artifact_dir)?);
    tracing::info!("Artifacts loaded successfully");

    let metrics_config = MetricsConfig {
        sink_url: metrics_url,
        ..Default::default()
    };
    if metrics_config.sink_url.is_none() {
        tracing::info!("No metrics sink configured, telemetry stays local");
    }
    let emitter = MetricsEmitter::spawn(&metrics_config);
    let executor = Executor::new(context, emitter);

    let server_config = ServerConfig {
        port,
        host,
        ..Default::default()
    };

    tracing::info!("Starting server at http://{}", server_config.addr());
    server::start(executor, server_config).await?;

    Ok(())
}
