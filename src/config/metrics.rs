//! Telemetry sink configuration settings

use serde::{Deserialize, Serialize};

/// Configuration for the request-metrics emitter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Collector endpoint for per-request telemetry. With no URL set,
    /// records are logged at debug level and dropped.
    #[serde(default)]
    pub sink_url: Option<String>,

    /// Bounded queue between the request path and the upload worker.
    /// Records beyond capacity are dropped, never waited on.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

fn default_queue_capacity() -> usize {
    64
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            sink_url: None,
            queue_capacity: default_queue_capacity(),
        }
    }
}
