use crate::domain::errors::BackendError;
use crate::domain::ml::example_codec;
use crate::domain::ml::feature_record::FeatureRecord;
use crate::domain::ports::{ModelSignature, ScoringBackend};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, warn};

/// Scores one record and returns the estimate, or `None` on any backend failure.
pub fn invoke<B: ScoringBackend>(
    backend: &B,
    signature: &ModelSignature,
    record: &FeatureRecord,
) -> Option<f32> {
    absorb(backend.name(), try_invoke(backend, signature, record))
}

/// Scores one record, keeping the failure for callers that need to classify it.
pub fn try_invoke<B: ScoringBackend>(
    backend: &B,
    signature: &ModelSignature,
    record: &FeatureRecord,
) -> Result<f32, BackendError> {
    let serialized = example_codec::serialize(record)?;

    // The graph expects a batch even for a single example
    let batch = vec![serialized];

    // Tensors live inside the closure, so unwinding still drops them
    panic::catch_unwind(AssertUnwindSafe(|| score_batch(backend, signature, &batch)))
        .unwrap_or_else(|payload| {
            Err(BackendError::Panicked {
                message: panic_message(payload.as_ref()),
            })
        })
}

/// Converts an invocation result into the fail-soft contract.
pub fn absorb(backend_name: &str, result: Result<f32, BackendError>) -> Option<f32> {
    match result {
        Ok(score) => {
            debug!(backend = backend_name, score, "Floor price estimated");
            Some(score)
        }
        Err(e) => {
            warn!(
                backend = backend_name,
                kind = e.kind(),
                "Floor price prediction failed: {}",
                e
            );
            None
        }
    }
}

fn score_batch<B: ScoringBackend>(
    backend: &B,
    signature: &ModelSignature,
    batch: &[Vec<u8>],
) -> Result<f32, BackendError> {
    let input = backend.example_batch(batch)?;
    let output = backend.run(&signature.input_node, &input, &signature.output_node)?;
    let values = backend.scalars(&output)?;

    match values.as_slice() {
        [score] if score.is_finite() => Ok(*score),
        [score] => Err(BackendError::NonFiniteScore { value: *score }),
        other => Err(BackendError::ShapeMismatch {
            expected: 1,
            actual: other.len(),
        }),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ml::feature_record::{FloorPriceRequest, encode};
    use crate::infrastructure::mock::{FailureMode, StubBackend};

    fn sample_record() -> FeatureRecord {
        encode(&FloorPriceRequest::new(
            "inv1", "banner", 0.5, "CA", "US", "SF", "android", "10", "14",
        ))
        .unwrap()
    }

    #[test]
    fn test_known_scalar_is_returned_exactly() {
        let backend = StubBackend::constant(0.42);
        let score = invoke(&backend, &ModelSignature::default(), &sample_record());
        assert_eq!(score, Some(0.42f32));
    }

    #[test]
    fn test_backend_sees_one_example_on_signature_nodes() {
        let backend = StubBackend::constant(1.0);
        let signature = ModelSignature::new("examples", "scores:0");
        invoke(&backend, &signature, &sample_record());

        let calls = backend.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].batch_size, 1);
        assert_eq!(calls[0].input_node, "examples");
        assert_eq!(calls[0].output_node, "scores:0");
    }

    #[test]
    fn test_every_failure_mode_is_absorbed() {
        for mode in [
            FailureMode::Allocation,
            FailureMode::Invocation,
            FailureMode::MissingOutput,
            FailureMode::Extraction,
            FailureMode::Panic,
        ] {
            let backend = StubBackend::failing(mode);
            let score = invoke(&backend, &ModelSignature::default(), &sample_record());
            assert_eq!(score, None, "{:?} should yield no estimate", mode);
            assert_eq!(backend.live_tensors(), 0, "{:?} leaked a tensor", mode);
        }
    }

    #[test]
    fn test_failure_kinds_are_preserved() {
        let backend = StubBackend::failing(FailureMode::Panic);
        let err = try_invoke(&backend, &ModelSignature::default(), &sample_record()).unwrap_err();
        assert_eq!(err.kind(), "panicked");

        let backend = StubBackend::failing(FailureMode::MissingOutput);
        let err = try_invoke(&backend, &ModelSignature::default(), &sample_record()).unwrap_err();
        assert_eq!(err.kind(), "missing_output");
    }

    #[test]
    fn test_multi_value_output_is_rejected() {
        let backend = StubBackend::with_output(vec![0.1, 0.2]);
        let err = try_invoke(&backend, &ModelSignature::default(), &sample_record()).unwrap_err();
        assert!(matches!(
            err,
            BackendError::ShapeMismatch {
                expected: 1,
                actual: 2
            }
        ));

        let backend = StubBackend::with_output(vec![]);
        assert_eq!(
            invoke(&backend, &ModelSignature::default(), &sample_record()),
            None
        );
    }

    #[test]
    fn test_non_finite_output_is_rejected() {
        let backend = StubBackend::with_output(vec![f32::NAN]);
        let err = try_invoke(&backend, &ModelSignature::default(), &sample_record()).unwrap_err();
        assert_eq!(err.kind(), "non_finite_score");
    }

    #[test]
    fn test_tensors_released_after_success() {
        let backend = StubBackend::constant(0.42);
        invoke(&backend, &ModelSignature::default(), &sample_record());
        assert_eq!(backend.live_tensors(), 0);
        assert_eq!(backend.released_tensors(), 2);
    }

    #[test]
    fn test_repeated_calls_are_identical() {
        let backend = StubBackend::constant(0.37);
        let record = sample_record();
        let first = invoke(&backend, &ModelSignature::default(), &record);
        let second = invoke(&backend, &ModelSignature::default(), &record);
        assert_eq!(first, second);
    }
}
