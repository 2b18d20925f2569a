//! Per-request telemetry.
//!
//! Each request produces one [`RequestMetrics`] record that is handed to
//! the emitter and forgotten. The emitter pushes records through a bounded
//! channel to a background upload task; a full queue, a dead worker, or a
//! failing sink drops the record with a log line and never touches the
//! response path. The sink schema is stable and additive-only.

use serde::Serialize;
use sysinfo::System;
use tokio::sync::mpsc;

use crate::config::MetricsConfig;

/// One request's telemetry, in the collector's schema.
#[derive(Debug, Clone, Serialize)]
pub struct RequestMetrics {
    pub date_time: String,
    pub cpu_usage: f32,
    pub memory_usage: f32,
    pub response_time: f64,
    pub input_data: serde_json::Value,
    pub output: f64,
}

impl RequestMetrics {
    /// Record for a completed inference. CPU and memory usage are filled
    /// in by the upload worker so the request path takes no locks.
    pub fn capture(input_data: serde_json::Value, output: f64, response_time: f64) -> Self {
        Self {
            date_time: chrono::Utc::now().format("%Y-%m-%d_%H-%M-%S").to_string(),
            cpu_usage: 0.0,
            memory_usage: 0.0,
            response_time,
            input_data,
            output,
        }
    }
}

/// Host CPU and memory sampling, owned by the upload worker.
struct ResourceProbe {
    system: System,
}

impl ResourceProbe {
    fn new() -> Self {
        let mut system = System::new();
        system.refresh_cpu_usage();
        system.refresh_memory();
        Self { system }
    }

    /// Best-effort (cpu%, memory%) snapshot.
    fn sample(&mut self) -> (f32, f32) {
        self.system.refresh_cpu_usage();
        self.system.refresh_memory();

        let cpu = self.system.global_cpu_usage();
        let total = self.system.total_memory();
        let memory = if total > 0 {
            self.system.used_memory() as f32 / total as f32 * 100.0
        } else {
            0.0
        };
        (cpu, memory)
    }
}

/// Handle for dispatching records to the background upload task.
#[derive(Clone)]
pub struct MetricsEmitter {
    tx: Option<mpsc::Sender<RequestMetrics>>,
}

impl MetricsEmitter {
    /// Start the upload worker and return a handle to feed it.
    ///
    /// With no sink URL configured the worker still drains the queue,
    /// logging records at debug level.
    pub fn spawn(config: &MetricsConfig) -> Self {
        let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
        tokio::spawn(upload_worker(rx, config.sink_url.clone()));
        Self { tx: Some(tx) }
    }

    /// Emitter that silently discards every record.
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    /// Hand off one record. Never blocks, never fails the caller.
    pub fn emit(&self, record: RequestMetrics) {
        let Some(tx) = &self.tx else {
            return;
        };
        if let Err(err) = tx.try_send(record) {
            tracing::warn!("dropping request metrics record: {}", err);
        }
    }
}

async fn upload_worker(mut rx: mpsc::Receiver<RequestMetrics>, sink_url: Option<String>) {
    let client = reqwest::Client::new();
    let mut probe = ResourceProbe::new();

    while let Some(mut record) = rx.recv().await {
        let (cpu, memory) = probe.sample();
        record.cpu_usage = cpu;
        record.memory_usage = memory;

        match &sink_url {
            None => {
                tracing::debug!(output = record.output, "no metrics sink configured, dropping record");
            }
            Some(url) => match client.post(url).json(&record).send().await {
                Ok(resp) if resp.status().is_success() => {
                    tracing::debug!("request metrics uploaded");
                }
                Ok(resp) => {
                    tracing::warn!(status = %resp.status(), "metrics sink rejected record");
                }
                Err(err) => {
                    tracing::warn!("metrics upload failed: {}", err);
                }
            },
        }
    }
}
