use prometheus::Histogram;
use std::time::Instant;

/// RAII guard for measuring and recording prediction latency
pub struct LatencyGuard {
    start: Instant,
    histogram: Option<Histogram>,
}

impl LatencyGuard {
    pub fn new(histogram: Histogram) -> Self {
        Self {
            start: Instant::now(),
            histogram: Some(histogram),
        }
    }

    /// A guard that records nothing, for estimators without metrics.
    pub fn disabled() -> Self {
        Self {
            start: Instant::now(),
            histogram: None,
        }
    }

    /// Drops the guard without recording a sample.
    pub fn discard(mut self) {
        self.histogram = None;
    }
}

impl Drop for LatencyGuard {
    fn drop(&mut self) {
        if let Some(histogram) = &self.histogram {
            histogram.observe(self.start.elapsed().as_secs_f64());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prometheus::{Histogram, HistogramOpts};

    #[test]
    fn test_latency_guard_records_time() {
        let opts = HistogramOpts::new("test_latency", "test");
        let histogram = Histogram::with_opts(opts).unwrap();

        {
            let _guard = LatencyGuard::new(histogram.clone());
            std::thread::sleep(std::time::Duration::from_millis(10));
        }

        assert!(histogram.get_sample_sum() >= 0.01);
        assert_eq!(histogram.get_sample_count(), 1);
    }

    #[test]
    fn test_discarded_guard_records_nothing() {
        let opts = HistogramOpts::new("test_discarded_latency", "test");
        let histogram = Histogram::with_opts(opts).unwrap();

        LatencyGuard::new(histogram.clone()).discard();

        assert_eq!(histogram.get_sample_count(), 0);
    }

    #[test]
    fn test_disabled_guard_is_inert() {
        let _guard = LatencyGuard::disabled();
    }
}
