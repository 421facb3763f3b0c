//! Gnosis - headless analytics service
//!
//! Streams bars from the configured feed through one analytics session per
//! symbol. Collapse-field updates are logged, snapshots are kept in memory and
//! metrics are pushed via structured JSON logs to stdout.
//!
//! # Usage
//! ```sh
//! SYMBOLS=SPY,QQQ FEED=mock cargo run --bin gnosis
//! ```
//!
//! # Environment Variables
//! - `SYMBOLS` - Comma-separated symbols (default: SPY,QQQ)
//! - `FEED` - `mock` or `csv` (with `FEED_CSV_PATH`)
//! - `ENGINE_CONFIG_PATH` - Optional TOML file with engine parameters
//! - `OBSERVABILITY_ENABLED` - Enable metrics reporting (default: true)
//! - `OBSERVABILITY_INTERVAL` - Interval in seconds between metric outputs (default: 60)

use anyhow::Result;
use gnosis::application::session::AnalyticsService;
use gnosis::config::{Config, FeedMode};
use gnosis::domain::analytics::StreamMessage;
use gnosis::domain::ports::BarFeed;
use gnosis::domain::repositories::SnapshotRepository;
use gnosis::infrastructure::{
    CsvBarFeed, InMemorySnapshotRepository, Metrics, MetricsReporter, MockBarFeed, StreamBus,
};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{Level, debug, info, warn};
use tracing_subscriber::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let stdout_layer = tracing_subscriber::fmt::layer().with_target(false).pretty();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(stdout_layer)
        .init();

    info!("Gnosis {} starting...", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;
    info!(
        "Configuration loaded: Symbols={:?}, Feed={:?}, Z-grid={} points",
        config.runtime.symbols,
        config.runtime.feed,
        config.engine.z_grid()?.len()
    );

    let metrics = Metrics::new()?;
    let bus = StreamBus::new(config.runtime.broadcast_capacity);
    let repository = Arc::new(InMemorySnapshotRepository::with_retention(
        config.runtime.snapshot_retention,
    ));

    let feed: Box<dyn BarFeed> = match &config.runtime.feed {
        FeedMode::Mock => Box::new(MockBarFeed::new(
            config.runtime.mock_seed,
            config.runtime.mock_interval_ms,
        )),
        FeedMode::Csv(path) => Box::new(CsvBarFeed::new(path.clone())),
    };
    let rx = feed.subscribe(config.runtime.symbols.clone()).await?;

    let mut live = bus.subscribe();
    tokio::spawn(async move {
        loop {
            match live.recv().await {
                Ok(StreamMessage::CollapseField(field)) if field.ready => {
                    let peak = field
                        .pool_field
                        .points
                        .iter()
                        .max_by(|a, b| a.density.total_cmp(&b.density))
                        .map(|p| p.z)
                        .unwrap_or(0.0);
                    info!(
                        "{} @ {}: z={:+.2} v={:+.3} peak={:+.2} p={:.2} q={:.2} hazard={:.3}",
                        field.symbol,
                        field.timestamp,
                        field.particle.position,
                        field.particle.velocity,
                        peak,
                        field.dealer.p,
                        field.dealer.q,
                        field.hazard.lambda
                    );
                }
                Ok(message) => debug!("{} {} @ {}", message.kind(), message.symbol(), message.timestamp()),
                Err(RecvError::Lagged(skipped)) => warn!("Live log lagged, skipped {} messages", skipped),
                Err(RecvError::Closed) => break,
            }
        }
    });

    if config.observability.enabled {
        let reporter = MetricsReporter::new(metrics.clone(), config.observability.interval_seconds);
        tokio::spawn(async move {
            reporter.run().await;
        });
        info!(
            "Metrics reporter started (interval: {}s)",
            config.observability.interval_seconds
        );
    } else {
        info!("Metrics reporting disabled.");
    }

    let mut service = AnalyticsService::new(
        config.engine.clone(),
        repository.clone(),
        bus,
        metrics,
        config.runtime.session_channel_capacity,
    );

    info!("Service running. Press Ctrl+C to shutdown.");
    tokio::select! {
        result = service.run(rx) => result?,
        signal = tokio::signal::ctrl_c() => {
            signal?;
            info!("Shutdown signal received.");
        }
    }

    for summary in service.shutdown().await {
        let stored = repository.count(&summary.symbol).await?;
        info!(
            "{}: accepted={} rejected={} state={:?} stored={}",
            summary.symbol, summary.accepted, summary.rejected, summary.state, stored.0
        );
    }

    Ok(())
}
