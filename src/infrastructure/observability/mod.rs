//! Push-based observability
//!
//! Outbound data only: Prometheus metrics kept in-process and rendered on
//! demand, plus periodic JSON lines on stdout for log shippers.

pub mod latency_tracker;
pub mod metrics;
pub mod reporter;

pub use latency_tracker::LatencyGuard;
pub use metrics::Metrics;
pub use reporter::MetricsReporter;
