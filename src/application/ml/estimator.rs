use super::invoker;
use crate::domain::errors::{BackendError, EstimatorError};
use crate::domain::ml::feature_record::{self, FeatureRecord, FloorPriceRequest};
use crate::domain::ports::{ModelSignature, ScoringBackend};
use crate::infrastructure::observability::metrics::{OUTCOME_INVALID_INPUT, OUTCOME_OK};
use crate::infrastructure::observability::{LatencyGuard, PredictionMetrics};
use std::sync::Arc;
use tracing::debug;

/// Recommends a floor price for an auction request.
///
/// The backend is built and owned elsewhere; the estimator only holds a
/// shared handle to it and never loads, reloads or closes the model.
pub struct FloorPriceEstimator<B: ScoringBackend> {
    backend: Arc<B>,
    signature: ModelSignature,
    metrics: Option<PredictionMetrics>,
}

impl<B: ScoringBackend> FloorPriceEstimator<B> {
    pub fn new(backend: Arc<B>, signature: ModelSignature) -> Self {
        Self {
            backend,
            signature,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: PredictionMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    /// Predict the floor price for `request`.
    ///
    /// Returns `Err` only for invalid input, before the backend is touched.
    /// Any backend failure yields `Ok(None)`.
    pub fn predict(&self, request: &FloorPriceRequest) -> Result<Option<f32>, EstimatorError> {
        let record = self.encode(request)?;

        let result = {
            let _latency = self.latency_guard();
            self.score(&record)
        };

        Ok(self.settle(result))
    }

    /// Positional form of [`predict`](Self::predict).
    #[allow(clippy::too_many_arguments)]
    pub fn predict_signals(
        &self,
        inventory_id: &str,
        request_type: &str,
        ex_floor_price: f32,
        state_code: &str,
        country_code: &str,
        city_code: &str,
        device_os: &str,
        device_os_version: &str,
        hour_of_day: &str,
    ) -> Result<Option<f32>, EstimatorError> {
        self.predict(&FloorPriceRequest::new(
            inventory_id,
            request_type,
            ex_floor_price,
            state_code,
            country_code,
            city_code,
            device_os,
            device_os_version,
            hour_of_day,
        ))
    }

    /// Encodes `request`, counting a rejection as `invalid_input`.
    pub(crate) fn encode(&self, request: &FloorPriceRequest) -> Result<FeatureRecord, EstimatorError> {
        feature_record::encode(request).inspect_err(|e| {
            debug!("Rejected floor price request: {}", e);
            self.record_outcome(OUTCOME_INVALID_INPUT);
        })
    }

    /// Runs the backend for an encoded record. Records no metrics.
    pub(crate) fn score(&self, record: &FeatureRecord) -> Result<f32, BackendError> {
        invoker::try_invoke(self.backend.as_ref(), &self.signature, record)
    }

    /// Counts the outcome of a finished call and absorbs any failure.
    pub(crate) fn settle(&self, result: Result<f32, BackendError>) -> Option<f32> {
        match &result {
            Ok(_) => self.record_outcome(OUTCOME_OK),
            Err(e) => self.record_outcome(e.kind()),
        }
        invoker::absorb(self.backend.name(), result)
    }

    pub(crate) fn latency_guard(&self) -> LatencyGuard {
        match &self.metrics {
            Some(m) => LatencyGuard::new(m.prediction_latency_seconds.clone()),
            None => LatencyGuard::disabled(),
        }
    }

    pub(crate) fn record_outcome(&self, outcome: &str) {
        if let Some(metrics) = &self.metrics {
            metrics.inc_outcome(outcome);
        }
    }
}
