use floor_estimator::application::ml::FloorPriceEstimator;
use floor_estimator::domain::errors::EstimatorError;
use floor_estimator::domain::ml::example_codec::{self, feature};
use floor_estimator::domain::ml::feature_record::{FEATURE_NAMES, FeatureValue, FloorPriceRequest, encode};
use floor_estimator::domain::ports::ModelSignature;
use floor_estimator::infrastructure::mock::{FailureMode, StubBackend};
use floor_estimator::infrastructure::observability::PredictionMetrics;
use std::sync::Arc;

fn sample_request() -> FloorPriceRequest {
    FloorPriceRequest::new("inv1", "banner", 0.5, "CA", "US", "SF", "android", "10", "14")
}

#[test]
fn test_encode_then_predict_with_echo_backend() {
    // 1. Encode the auction signals
    let record = encode(&sample_request()).unwrap();
    assert_eq!(record.get("ex_floor_price"), Some(&FeatureValue::Float(vec![0.5])));
    assert_eq!(
        record.get("inventory_id").and_then(FeatureValue::as_bytes),
        Some("inv1".as_bytes())
    );

    // 2. Predict through a stub that echoes 0.42
    let estimator = FloorPriceEstimator::new(
        Arc::new(StubBackend::constant(0.42)),
        ModelSignature::default(),
    );
    let result = estimator.predict(&sample_request());

    // 3. Verification
    assert_eq!(result, Ok(Some(0.42f32)));
    assert_eq!(estimator.backend().live_tensors(), 0);
    assert_eq!(estimator.backend().released_tensors(), 2);
}

#[test]
fn test_backend_receives_a_parseable_single_example() {
    let estimator = FloorPriceEstimator::new(
        Arc::new(StubBackend::floor_multiplier(3.0)),
        ModelSignature::default(),
    );

    let result = estimator.predict(&sample_request()).unwrap();
    assert_eq!(result, Some(1.5));

    let calls = estimator.backend().calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].batch_size, 1);
    assert_eq!(calls[0].input_node, "input_example_tensor");
    assert_eq!(calls[0].output_node, "Squeeze:0");
}

#[test]
fn test_serialized_example_matches_feature_schema() {
    let record = encode(&sample_request()).unwrap();
    let example = example_codec::deserialize(&example_codec::serialize(&record).unwrap()).unwrap();

    for name in FEATURE_NAMES {
        match example.feature(name) {
            Some(feature::Kind::FloatList(list)) => {
                assert_eq!(*name, "ex_floor_price");
                assert_eq!(list.value, vec![0.5]);
            }
            Some(feature::Kind::BytesList(list)) => {
                assert_ne!(*name, "ex_floor_price");
                assert_eq!(list.value.len(), 1);
            }
            other => panic!("unexpected feature {} = {:?}", name, other),
        }
    }
}

#[test]
fn test_invalid_floor_price_surfaces_before_backend() {
    let estimator = FloorPriceEstimator::new(
        Arc::new(StubBackend::constant(0.42)),
        ModelSignature::default(),
    );

    let mut missing = sample_request();
    missing.ex_floor_price = None;
    let mut nan = sample_request();
    nan.ex_floor_price = Some(f32::NAN);

    for request in [missing, nan] {
        let err = estimator.predict(&request).unwrap_err();
        assert!(matches!(err, EstimatorError::InvalidInput { field: "ex_floor_price", .. }));
    }
    assert!(estimator.backend().calls().is_empty());
}

#[test]
fn test_failing_backends_never_raise() {
    for mode in [
        FailureMode::Allocation,
        FailureMode::Invocation,
        FailureMode::MissingOutput,
        FailureMode::Extraction,
        FailureMode::Panic,
    ] {
        let metrics = PredictionMetrics::new("flow_test").unwrap();
        let estimator = FloorPriceEstimator::new(
            Arc::new(StubBackend::failing(mode)),
            ModelSignature::default(),
        )
        .with_metrics(metrics.clone());

        let result = estimator.predict(&sample_request());

        assert_eq!(result, Ok(None), "{:?} should degrade to no estimate", mode);
        assert_eq!(estimator.backend().live_tensors(), 0, "{:?} leaked a tensor", mode);
        assert_eq!(metrics.outcome_count("ok"), 0);
    }
}

#[test]
fn test_identical_inputs_give_identical_results() {
    let estimator = FloorPriceEstimator::new(
        Arc::new(StubBackend::floor_multiplier(1.1)),
        ModelSignature::default(),
    );

    let first = estimator.predict(&sample_request()).unwrap();
    let second = estimator.predict(&sample_request()).unwrap();
    assert!(first.is_some());
    assert_eq!(first, second);
}
