//! One-shot prediction command

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::engine::{Executor, ServingContext};
use crate::metrics::MetricsEmitter;

/// Run one forecast and print the result
pub async fn predict(artifacts: Option<PathBuf>, input: String) -> Result<()> {
    let artifact_dir = super::artifact_dir(artifacts);

    let values = input
        .split(',')
        .map(|field| {
            field
                .trim()
                .parse::<f64>()
                .with_context(|| format!("invalid lag value '{}'", field.trim()))
        })
        .collect::<Result<Vec<f64>>>()?;

    let context = Arc::new(ServingContext::load(&artifact_dir)?);
    let executor = Executor::new(context, MetricsEmitter::disabled());

    let payload = serde_json::json!({ "input": values });
    let prediction = executor.predict(&payload)?;

    println!("{{\"prediction\": {}}}", prediction);
    Ok(())
}
