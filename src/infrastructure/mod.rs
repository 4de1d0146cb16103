pub mod mock;
pub mod model_locator;
pub mod observability;
pub mod onnx_backend;

pub use mock::StubBackend;
pub use onnx_backend::OnnxScoringBackend;
