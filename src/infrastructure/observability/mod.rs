//! Push-based observability for the floor price estimator
//!
//! Metrics live in a private Prometheus registry and are rendered as text on
//! demand. Nothing here listens for incoming requests.

pub mod latency_tracker;
pub mod metrics;

pub use latency_tracker::LatencyGuard;
pub use metrics::PredictionMetrics;
