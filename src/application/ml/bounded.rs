use super::estimator::FloorPriceEstimator;
use crate::domain::errors::{BackendError, EstimatorError};
use crate::domain::ml::feature_record::FloorPriceRequest;
use crate::domain::ports::ScoringBackend;
use crate::infrastructure::observability::LatencyGuard;
use crate::infrastructure::observability::metrics::OUTCOME_TIMEOUT;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinError;
use tracing::warn;

/// Runs a prediction on the blocking pool and gives up after `timeout`.
///
/// A timed-out call counts as "no estimate". The blocking call itself is not
/// cancelled and finishes in the background without touching the metrics, so
/// each request records exactly one outcome.
pub async fn predict_within<B>(
    estimator: Arc<FloorPriceEstimator<B>>,
    request: FloorPriceRequest,
    timeout: Duration,
) -> Result<Option<f32>, EstimatorError>
where
    B: ScoringBackend + 'static,
{
    // Fail fast on bad input without occupying a blocking thread
    let record = estimator.encode(&request)?;

    let latency = estimator.latency_guard();
    let worker = estimator.clone();
    let task = tokio::task::spawn_blocking(move || worker.score(&record));

    match tokio::time::timeout(timeout, task).await {
        Ok(joined) => Ok(settle_joined(&estimator, joined, latency)),
        Err(_) => {
            warn!("Floor price prediction timed out after {:?}", timeout);
            latency.discard();
            estimator.record_outcome(OUTCOME_TIMEOUT);
            Ok(None)
        }
    }
}

/// Settles a blocking task that came back before the deadline.
///
/// A task that died without an answer is counted like a timeout.
fn settle_joined<B: ScoringBackend>(
    estimator: &FloorPriceEstimator<B>,
    joined: Result<Result<f32, BackendError>, JoinError>,
    latency: LatencyGuard,
) -> Option<f32> {
    match joined {
        Ok(result) => {
            drop(latency);
            estimator.settle(result)
        }
        Err(join_error) => {
            warn!("Floor price prediction task failed: {}", join_error);
            latency.discard();
            estimator.record_outcome(OUTCOME_TIMEOUT);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::ModelSignature;
    use crate::infrastructure::mock::StubBackend;
    use crate::infrastructure::observability::PredictionMetrics;
    use crate::infrastructure::observability::metrics::OUTCOME_OK;

    fn request(price: f32) -> FloorPriceRequest {
        FloorPriceRequest::new(
            "inv1", "banner", price, "CA", "US", "SF", "android", "10", "14",
        )
    }

    #[tokio::test]
    async fn test_fast_backend_answers_within_timeout() {
        let metrics = PredictionMetrics::new("bounded_fast").unwrap();
        let estimator = Arc::new(
            FloorPriceEstimator::new(
                Arc::new(StubBackend::constant(0.42)),
                ModelSignature::default(),
            )
            .with_metrics(metrics.clone()),
        );

        let result = predict_within(estimator, request(0.5), Duration::from_secs(5)).await;
        assert_eq!(result, Ok(Some(0.42)));
        assert_eq!(metrics.outcome_count(OUTCOME_OK), 1);
        assert_eq!(metrics.prediction_latency_seconds.get_sample_count(), 1);
    }

    #[tokio::test]
    async fn test_invalid_input_fails_before_spawning() {
        let estimator = Arc::new(FloorPriceEstimator::new(
            Arc::new(StubBackend::constant(0.42)),
            ModelSignature::default(),
        ));

        let result =
            predict_within(estimator.clone(), request(f32::NAN), Duration::from_secs(5)).await;
        assert!(result.is_err());
        assert!(estimator.backend().calls().is_empty());
    }

    #[tokio::test]
    async fn test_failed_task_counts_as_timeout() {
        let metrics = PredictionMetrics::new("bounded_join").unwrap();
        let estimator = FloorPriceEstimator::new(
            Arc::new(StubBackend::constant(0.42)),
            ModelSignature::default(),
        )
        .with_metrics(metrics.clone());

        let joined = tokio::task::spawn_blocking(|| -> Result<f32, BackendError> {
            panic!("scoring thread died")
        })
        .await;
        assert!(joined.is_err());

        let estimate = settle_joined(&estimator, joined, estimator.latency_guard());

        assert_eq!(estimate, None);
        assert_eq!(metrics.outcome_count(OUTCOME_TIMEOUT), 1);
        assert_eq!(metrics.outcome_count(OUTCOME_OK), 0);
        assert_eq!(metrics.prediction_latency_seconds.get_sample_count(), 0);
    }
}
