// Feature encoding, model invocation and the estimator facade
pub mod ml;
