//! Prometheus metrics for floor price predictions
//!
//! Metric names carry a configurable prefix (`floor_estimator_` by default).

use prometheus::{CounterVec, Histogram, HistogramOpts, Opts, Registry, TextEncoder};
use std::sync::Arc;

pub const OUTCOME_OK: &str = "ok";
pub const OUTCOME_INVALID_INPUT: &str = "invalid_input";
pub const OUTCOME_TIMEOUT: &str = "timeout";

/// Prediction outcome and latency metrics
#[derive(Clone)]
pub struct PredictionMetrics {
    registry: Arc<Registry>,
    /// Predictions by outcome (`ok`, `invalid_input`, `timeout` or a backend failure kind)
    pub predictions_total: CounterVec,
    /// Time spent inside the scoring backend, in seconds
    pub prediction_latency_seconds: Histogram,
}

impl PredictionMetrics {
    pub fn new(prefix: &str) -> anyhow::Result<Self> {
        let registry = Registry::new();

        let predictions_total = CounterVec::new(
            Opts::new(
                format!("{}_predictions_total", prefix),
                "Total floor price predictions by outcome",
            ),
            &["outcome"],
        )?;
        registry.register(Box::new(predictions_total.clone()))?;

        let prediction_latency_seconds = Histogram::with_opts(
            HistogramOpts::new(
                format!("{}_prediction_latency_seconds", prefix),
                "Floor price prediction latency in seconds",
            )
            .buckets(vec![
                0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25,
            ]),
        )?;
        registry.register(Box::new(prediction_latency_seconds.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            predictions_total,
            prediction_latency_seconds,
        })
    }

    /// Render all metrics in Prometheus text format
    pub fn render(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        encoder
            .encode_to_string(&metric_families)
            .unwrap_or_default()
    }

    pub fn inc_outcome(&self, outcome: &str) {
        self.predictions_total.with_label_values(&[outcome]).inc();
    }

    pub fn outcome_count(&self, outcome: &str) -> u64 {
        self.predictions_total.with_label_values(&[outcome]).get() as u64
    }
}
