use prometheus::Histogram;
use std::time::Instant;

/// RAII guard that records the elapsed time into a histogram when dropped
pub struct LatencyGuard {
    start: Instant,
    histogram: Histogram,
}

impl LatencyGuard {
    pub fn new(histogram: Histogram) -> Self {
        Self {
            start: Instant::now(),
            histogram,
        }
    }

    /// Elapsed time so far, in seconds
    pub fn elapsed_seconds(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}

impl Drop for LatencyGuard {
    fn drop(&mut self) {
        self.histogram.observe(self.elapsed_seconds());
    }
}
