pub mod batch;
pub mod bounded;
pub mod estimator;
pub mod invoker;

pub use bounded::predict_within;
pub use estimator::FloorPriceEstimator;
