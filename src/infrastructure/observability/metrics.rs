//! Prometheus metrics definitions for the analytics engine
//!
//! All metrics use the `gnosis_` prefix and are read-only.

use prometheus::{
    GaugeVec, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;

/// Prometheus metrics for the session workers
#[derive(Clone)]
pub struct Metrics {
    registry: Arc<Registry>,
    /// Bars accepted by a session
    pub bars_processed_total: IntCounter,
    /// Bars rejected by validation
    pub bars_rejected_total: IntCounter,
    /// Rejections by reason label
    pub bars_rejected_by_reason: IntCounterVec,
    /// Snapshot writes that failed
    pub persistence_failures_total: IntCounter,
    /// Messages handed to the stream bus
    pub broadcast_messages_total: IntCounter,
    /// Symbol sessions currently running
    pub active_sessions: IntGauge,
    /// Latest hazard rate per symbol
    pub hazard_rate: GaugeVec,
    /// Time spent applying one bar to a session
    pub update_latency_seconds: Histogram,
}

impl Metrics {
    /// Create a new Metrics instance with all gauges and counters registered
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let bars_processed_total = IntCounter::with_opts(Opts::new(
            "gnosis_bars_processed_total",
            "Total bars accepted by symbol sessions",
        ))?;
        registry.register(Box::new(bars_processed_total.clone()))?;

        let bars_rejected_total = IntCounter::with_opts(Opts::new(
            "gnosis_bars_rejected_total",
            "Total bars rejected by validation",
        ))?;
        registry.register(Box::new(bars_rejected_total.clone()))?;

        let bars_rejected_by_reason = IntCounterVec::new(
            Opts::new(
                "gnosis_bars_rejected_by_reason_total",
                "Rejected bars by validation reason",
            ),
            &["reason"],
        )?;
        registry.register(Box::new(bars_rejected_by_reason.clone()))?;

        let persistence_failures_total = IntCounter::with_opts(Opts::new(
            "gnosis_persistence_failures_total",
            "Snapshot writes that failed",
        ))?;
        registry.register(Box::new(persistence_failures_total.clone()))?;

        let broadcast_messages_total = IntCounter::with_opts(Opts::new(
            "gnosis_broadcast_messages_total",
            "Messages published on the stream bus",
        ))?;
        registry.register(Box::new(broadcast_messages_total.clone()))?;

        let active_sessions = IntGauge::with_opts(Opts::new(
            "gnosis_active_sessions",
            "Number of running symbol sessions",
        ))?;
        registry.register(Box::new(active_sessions.clone()))?;

        let hazard_rate = GaugeVec::new(
            Opts::new("gnosis_hazard_rate", "Latest per-bar hazard rate by symbol"),
            &["symbol"],
        )?;
        registry.register(Box::new(hazard_rate.clone()))?;

        let update_latency_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "gnosis_update_latency_seconds",
                "Time to apply one bar to a symbol session",
            )
            .buckets(vec![
                0.00005, 0.0001, 0.00025, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05,
            ]),
        )?;
        registry.register(Box::new(update_latency_seconds.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            bars_processed_total,
            bars_rejected_total,
            bars_rejected_by_reason,
            persistence_failures_total,
            broadcast_messages_total,
            active_sessions,
            hazard_rate,
            update_latency_seconds,
        })
    }

    /// Render all metrics in Prometheus text format
    pub fn render(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        encoder
            .encode_to_string(&metric_families)
            .unwrap_or_default()
    }

    pub fn record_rejection(&self, reason: &str) {
        self.bars_rejected_total.inc();
        self.bars_rejected_by_reason
            .with_label_values(&[reason])
            .inc();
    }

    pub fn set_hazard_rate(&self, symbol: &str, lambda: f64) {
        self.hazard_rate.with_label_values(&[symbol]).set(lambda);
    }

    pub fn add_broadcast(&self, messages: usize) {
        self.broadcast_messages_total.inc_by(messages as u64);
    }

    /// Mean update latency in seconds, 0 before the first observation
    pub fn mean_update_latency(&self) -> f64 {
        let count = self.update_latency_seconds.get_sample_count();
        if count == 0 {
            return 0.0;
        }
        self.update_latency_seconds.get_sample_sum() / count as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new().expect("Failed to create metrics");
        metrics.bars_processed_total.inc();
        assert!(metrics.render().contains("gnosis_bars_processed_total 1"));
    }

    #[test]
    fn test_rejections_by_reason() {
        let metrics = Metrics::new().expect("Failed to create metrics");
        metrics.record_rejection("non_monotonic_timestamp");
        metrics.record_rejection("ohlc_ordering");
        metrics.record_rejection("ohlc_ordering");

        assert_eq!(metrics.bars_rejected_total.get(), 3);
        let output = metrics.render();
        assert!(output.contains("gnosis_bars_rejected_by_reason_total"));
        assert!(output.contains("ohlc_ordering"));
    }

    #[test]
    fn test_hazard_rate_per_symbol() {
        let metrics = Metrics::new().expect("Failed to create metrics");
        metrics.set_hazard_rate("SPY", 0.05);
        metrics.set_hazard_rate("QQQ", 0.07);
        let output = metrics.render();
        assert!(output.contains("SPY"));
        assert!(output.contains("QQQ"));
    }

    #[test]
    fn test_mean_update_latency() {
        let metrics = Metrics::new().expect("Failed to create metrics");
        assert_eq!(metrics.mean_update_latency(), 0.0);
        metrics.update_latency_seconds.observe(0.001);
        metrics.update_latency_seconds.observe(0.003);
        assert!((metrics.mean_update_latency() - 0.002).abs() < 1e-12);
    }
}
