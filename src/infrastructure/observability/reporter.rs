//! Push-based metrics reporter
//!
//! Periodically outputs session metrics as structured JSON to stdout.
//! Nothing listens for incoming requests.

use crate::infrastructure::observability::metrics::Metrics;
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Metrics snapshot for JSON output
#[derive(Debug, Serialize)]
pub struct MetricsSnapshot {
    pub timestamp: String,
    pub uptime_seconds: u64,
    pub version: String,
    pub sessions: SessionsSnapshot,
    pub latency: LatencySnapshot,
}

#[derive(Debug, Serialize)]
pub struct SessionsSnapshot {
    pub active: i64,
    pub bars_processed: u64,
    pub bars_rejected: u64,
    pub persistence_failures: u64,
    pub broadcast_messages: u64,
}

#[derive(Debug, Serialize)]
pub struct LatencySnapshot {
    pub updates: u64,
    pub mean_ms: f64,
}

/// Outputs metrics as `METRICS_JSON:` lines on a fixed interval
pub struct MetricsReporter {
    metrics: Metrics,
    start_time: Instant,
    interval: Duration,
}

impl MetricsReporter {
    pub fn new(metrics: Metrics, interval_seconds: u64) -> Self {
        Self {
            metrics,
            start_time: Instant::now(),
            interval: Duration::from_secs(interval_seconds.max(1)),
        }
    }

    /// Run the reporter in a loop, outputting metrics periodically
    pub async fn run(self) {
        info!(
            "MetricsReporter: Starting push-based metrics (interval: {:?})",
            self.interval
        );

        loop {
            tokio::time::sleep(self.interval).await;

            let snapshot = self.collect_snapshot();
            match serde_json::to_string(&snapshot) {
                Ok(json) => {
                    println!("METRICS_JSON:{}", json);
                    info!(
                        "Sessions: {} | Bars: {} accepted, {} rejected | Uptime: {}s",
                        snapshot.sessions.active,
                        snapshot.sessions.bars_processed,
                        snapshot.sessions.bars_rejected,
                        snapshot.uptime_seconds
                    );
                }
                Err(e) => warn!("Failed to serialize metrics: {}", e),
            }
        }
    }

    pub fn collect_snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            timestamp: chrono::Utc::now().to_rfc3339(),
            uptime_seconds: self.start_time.elapsed().as_secs(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            sessions: SessionsSnapshot {
                active: self.metrics.active_sessions.get(),
                bars_processed: self.metrics.bars_processed_total.get(),
                bars_rejected: self.metrics.bars_rejected_total.get(),
                persistence_failures: self.metrics.persistence_failures_total.get(),
                broadcast_messages: self.metrics.broadcast_messages_total.get(),
            },
            latency: LatencySnapshot {
                updates: self.metrics.update_latency_seconds.get_sample_count(),
                mean_ms: self.metrics.mean_update_latency() * 1000.0,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_reflects_counters() {
        let metrics = Metrics::new().expect("Failed to create metrics");
        metrics.active_sessions.set(2);
        metrics.bars_processed_total.inc_by(10);
        metrics.record_rejection("symbol_mismatch");

        let reporter = MetricsReporter::new(metrics, 60);
        let snapshot = reporter.collect_snapshot();

        assert_eq!(snapshot.sessions.active, 2);
        assert_eq!(snapshot.sessions.bars_processed, 10);
        assert_eq!(snapshot.sessions.bars_rejected, 1);
        assert_eq!(snapshot.latency.updates, 0);
        assert!(!snapshot.timestamp.is_empty());

        let json = serde_json::to_string(&snapshot).expect("Failed to serialize");
        assert!(json.contains("\"bars_processed\":10"));
    }
}
