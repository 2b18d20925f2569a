//! Per-request inference pipeline.
//!
//! One request runs strictly sequentially through decode, scale, window,
//! infer, inverse-scale, and emit. Requests are independent; the only
//! shared state is the read-only serving context.

use std::sync::Arc;
use std::time::Instant;

use ndarray::Array2;

use crate::config::FeatureSchema;
use crate::engine::ServingContext;
use crate::error::PetrodError;
use crate::metrics::{MetricsEmitter, RequestMetrics};

/// Runs the inference pipeline against a loaded context.
pub struct Executor {
    ctx: Arc<ServingContext>,
    emitter: MetricsEmitter,
}

impl Executor {
    pub fn new(ctx: Arc<ServingContext>, emitter: MetricsEmitter) -> Self {
        Self { ctx, emitter }
    }

    pub fn context(&self) -> &ServingContext {
        &self.ctx
    }

    /// One prediction for one inbound payload.
    pub fn predict(&self, payload: &serde_json::Value) -> Result<f64, PetrodError> {
        let schema = self.ctx.schema();

        // decode into schema order
        let values = decode_request(schema, payload)?;
        let input_snapshot = snapshot(schema, &values);

        // scale
        let row = Array2::from_shape_vec((1, values.len()), values)
            .map_err(|e| PetrodError::ShapeMismatch(e.to_string()))?;
        let scaled = self.ctx.scalers().input().transform(&row)?;

        // window
        let scaled_values: Vec<f64> = scaled.row(0).to_vec();
        let window = schema.to_window(&scaled_values)?;

        // infer, timing this step only
        let start = Instant::now();
        let output = self.ctx.model().forward(&window);
        let inference_time = start.elapsed();

        if output.shape() != [1, 1] {
            return Err(PetrodError::ShapeMismatch(format!(
                "model produced shape {:?}, expected (1, 1)",
                output.shape()
            )));
        }

        // inverse-scale back to price units
        let restored = self.ctx.scalers().output().inverse_transform(&output)?;
        let prediction = restored[[0, 0]];

        // telemetry is fire-and-forget and cannot fail the request
        self.emitter.emit(RequestMetrics::capture(
            input_snapshot,
            prediction,
            inference_time.as_secs_f64(),
        ));

        Ok(prediction)
    }
}

/// Validate the payload and arrange its values into schema order.
fn decode_request(
    schema: &FeatureSchema,
    payload: &serde_json::Value,
) -> Result<Vec<f64>, PetrodError> {
    let input = payload
        .get("input")
        .ok_or_else(|| PetrodError::MalformedRequest("missing 'input' key".to_string()))?;
    let items = input
        .as_array()
        .ok_or_else(|| PetrodError::MalformedRequest("'input' must be an array".to_string()))?;

    let wire = items
        .iter()
        .map(|v| {
            v.as_f64().ok_or_else(|| {
                PetrodError::MalformedRequest(format!("non-numeric lag value: {}", v))
            })
        })
        .collect::<Result<Vec<f64>, PetrodError>>()?;

    schema.arrange(&wire)
}

/// Named column → value map of the decoded record, for telemetry.
fn snapshot(schema: &FeatureSchema, values: &[f64]) -> serde_json::Value {
    let mut map = serde_json::Map::new();
    for (name, &value) in schema.column_names().iter().zip(values) {
        map.insert(name.clone(), serde_json::json!(value));
    }
    serde_json::Value::Object(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ColumnOrder, FeatureSchema};
    use crate::dataset::{add_lags, DatasetBuilder, Table};
    use crate::loader::ArtifactManifest;
    use crate::model::{ModelArchitecture, Regressor};
    use crate::scaler::{MinMaxScaler, ScalerPair};
    use ndarray::{Array2, Array3};
    use serde_json::json;

    /// Test double: passes the window's last sequence element through.
    struct LastElement;

    impl Regressor for LastElement {
        fn forward(&self, window: &Array3<f64>) -> Array2<f64> {
            let batch = window.shape()[0];
            let seq_len = window.shape()[1];
            Array2::from_shape_fn((batch, 1), |(b, _)| window[[b, seq_len - 1, 0]])
        }
    }

    /// Scalers fit over [1.0, 2.0] per feature column and for the target.
    fn unit_scalers(num_lags: usize) -> ScalerPair {
        let mut input = MinMaxScaler::new();
        let mut output = MinMaxScaler::new();
        input
            .fit(&Array2::from_shape_fn((2, num_lags), |(i, _)| 1.0 + i as f64))
            .unwrap();
        output
            .fit(&Array2::from_shape_fn((2, 1), |(i, _)| 1.0 + i as f64))
            .unwrap();
        ScalerPair::new(input, output)
    }

    fn test_executor(num_lags: usize) -> Executor {
        let schema = FeatureSchema::new("pbr", num_lags, ColumnOrder::OldestFirst);
        let manifest = ArtifactManifest::new(schema, ModelArchitecture::default());
        let ctx =
            ServingContext::new(manifest, unit_scalers(num_lags), Box::new(LastElement)).unwrap();
        Executor::new(Arc::new(ctx), MetricsEmitter::disabled())
    }

    #[test]
    fn test_decode_accepts_exact_lag_count() {
        let schema = FeatureSchema::new("pbr", 7, ColumnOrder::OldestFirst);
        let payload = json!({"input": [1.0, 1.1, 1.2, 1.3, 1.4, 1.5, 1.6]});
        let values = decode_request(&schema, &payload).unwrap();
        assert_eq!(values.len(), 7);
        assert_eq!(schema.to_window(&values).unwrap().shape(), &[1, 7, 1]);
    }

    #[test]
    fn test_decode_rejects_missing_key() {
        let schema = FeatureSchema::new("pbr", 7, ColumnOrder::OldestFirst);
        let err = decode_request(&schema, &json!({"window": [1.0]})).unwrap_err();
        assert!(matches!(err, PetrodError::MalformedRequest(_)));
    }

    #[test]
    fn test_decode_rejects_wrong_length() {
        let schema = FeatureSchema::new("pbr", 7, ColumnOrder::OldestFirst);
        let err = decode_request(&schema, &json!({"input": [1.0, 2.0]})).unwrap_err();
        assert!(matches!(err, PetrodError::MalformedRequest(_)));
    }

    #[test]
    fn test_decode_rejects_non_numeric_values() {
        let schema = FeatureSchema::new("pbr", 2, ColumnOrder::OldestFirst);
        let err = decode_request(&schema, &json!({"input": [1.0, "high"]})).unwrap_err();
        assert!(matches!(err, PetrodError::MalformedRequest(_)));
    }

    #[test]
    fn test_end_to_end_scale_infer_inverse() {
        // Scaler fit over [1.0, 2.0] -> [-1, 1]: 1.1 scales to -0.8. With a
        // pass-through model reading the window's final element, a window
        // ending in 1.1 must come back as exactly 1.1.
        let executor = test_executor(7);

        let payload = json!({"input": [1.0, 1.2, 1.4, 1.6, 1.5, 1.3, 1.1]});
        let prediction = executor.predict(&payload).unwrap();
        assert!((prediction - 1.1).abs() < 1e-9);

        // and the scaled window underlying it holds -0.8 in that slot
        let scalers = executor.context().scalers();
        let scaled = scalers
            .input()
            .transform(&Array2::from_shape_vec((1, 7), vec![1.0, 1.2, 1.4, 1.6, 1.5, 1.3, 1.1]).unwrap())
            .unwrap();
        assert!((scaled[[0, 6]] + 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_prediction_is_deterministic() {
        let executor = test_executor(7);
        let payload = json!({"input": [1.0, 1.1, 1.2, 1.3, 1.4, 1.5, 1.6]});

        let first = executor.predict(&payload).unwrap();
        let second = executor.predict(&payload).unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_emitter_failure_leaves_prediction_unaffected() {
        let schema = FeatureSchema::new("pbr", 7, ColumnOrder::OldestFirst);
        let manifest = ArtifactManifest::new(schema.clone(), ModelArchitecture::default());
        let ctx = Arc::new(
            ServingContext::new(manifest, unit_scalers(7), Box::new(LastElement)).unwrap(),
        );

        // a sink that cannot be reached
        let failing = MetricsEmitter::spawn(&crate::config::MetricsConfig {
            sink_url: Some("http://127.0.0.1:1/ingest".to_string()),
            queue_capacity: 1,
        });
        let with_failing_sink = Executor::new(Arc::clone(&ctx), failing);
        let silent = Executor::new(ctx, MetricsEmitter::disabled());

        let payload = json!({"input": [1.0, 1.1, 1.2, 1.3, 1.4, 1.5, 1.6]});
        assert_eq!(
            with_failing_sink.predict(&payload).unwrap(),
            silent.predict(&payload).unwrap()
        );
    }

    #[test]
    fn test_training_and_serving_scale_identically() {
        // The same synthetic window pushed through the dataset fit path and
        // the serving decode path must produce identical scaled values.
        let n = 20;
        let index: Vec<String> = (0..n).map(|i| format!("2024-02-{:02}", i + 1)).collect();
        let prices: Vec<f64> = (0..n).map(|i| 40.0 + (i as f64) * 1.5).collect();
        let table = Table::new(
            index,
            vec!["pbr".to_string()],
            Array2::from_shape_vec((n, 1), prices.clone()).unwrap(),
        )
        .unwrap();

        let schema = FeatureSchema::new("pbr", 7, ColumnOrder::OldestFirst);
        let lagged = add_lags(&table, 7, &["pbr"]).unwrap();
        let dataset = DatasetBuilder::fit(&lagged, &schema).unwrap();

        // last row of the lagged table corresponds to the most recent window
        let row = dataset.len() - 1;
        let (window, _) = dataset.get(row);

        // the same seven raw values as a serving request, oldest first
        let wire: Vec<f64> = prices[n - 8..n - 1].to_vec();
        let arranged = schema.arrange(&wire).unwrap();
        let scaled = dataset
            .scalers()
            .input()
            .transform(&Array2::from_shape_vec((1, 7), arranged).unwrap())
            .unwrap();

        for t in 0..7 {
            assert!((window[[t, 0]] - scaled[[0, t]]).abs() < 1e-12);
        }
    }
}
