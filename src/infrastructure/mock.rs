use crate::domain::market::{Bar, BarEnvelope, OrderFlowSignal};
use crate::domain::ports::BarFeed;
use anyhow::Result;
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use std::time::Duration;
use tokio::sync::mpsc::{self, Receiver};
use tracing::{debug, info};

const MINUTE_MS: i64 = 60_000;

fn base_price(symbol: &str) -> f64 {
    match symbol {
        "SPY" => 470.0,
        "QQQ" => 405.0,
        "IWM" => 200.0,
        "DIA" => 375.0,
        _ => 150.0,
    }
}

fn to_decimal(value: f64) -> Decimal {
    Decimal::from_f64(value)
        .map(|d| d.round_dp(4))
        .unwrap_or(Decimal::ZERO)
}

/// Deterministic random-walk bar source for one set of symbols.
///
/// The simulated clock advances one minute per call to `next_round`,
/// independent of wall time.
pub struct MockBarGenerator {
    rng: StdRng,
    symbols: Vec<String>,
    prices: Vec<f64>,
    timestamp: i64,
}

impl MockBarGenerator {
    pub fn new(symbols: Vec<String>, seed: u64, start_timestamp: i64) -> Self {
        let prices = symbols.iter().map(|s| base_price(s)).collect();
        Self {
            rng: StdRng::seed_from_u64(seed),
            symbols,
            prices,
            timestamp: start_timestamp - start_timestamp.rem_euclid(MINUTE_MS),
        }
    }

    /// One bar per symbol for the next simulated minute
    pub fn next_round(&mut self) -> Vec<BarEnvelope> {
        let timestamp = self.timestamp;
        self.timestamp += MINUTE_MS;

        let mut envelopes = Vec::with_capacity(self.symbols.len());
        for idx in 0..self.symbols.len() {
            let symbol = self.symbols[idx].clone();
            let open = self.prices[idx];

            // roughly 0.1% per-minute volatility
            let ret: f64 = self.rng.random_range(-0.002..0.002);
            let close = (open * (1.0 + ret)).max(0.01);
            let wick_up: f64 = self.rng.random_range(0.0..0.0008);
            let wick_down: f64 = self.rng.random_range(0.0..0.0008);
            let high = open.max(close) * (1.0 + wick_up);
            let low = open.min(close) * (1.0 - wick_down);
            let volume: u32 = self.rng.random_range(5_000..50_000);

            let spread = close * 0.0001;
            let bid_size: u32 = self.rng.random_range(1..20);
            let ask_size: u32 = self.rng.random_range(1..20);

            let bar = Bar::new(
                symbol.clone(),
                timestamp,
                to_decimal(open),
                to_decimal(high),
                to_decimal(low),
                to_decimal(close),
                Decimal::from(volume),
            )
            .with_quote(
                to_decimal(close - spread),
                to_decimal(close + spread),
                Decimal::from(bid_size * 100),
                Decimal::from(ask_size * 100),
            );

            let mut envelope = BarEnvelope::new(bar);
            if self.rng.random_bool(0.3) {
                let call: u32 = self.rng.random_range(0..500);
                let put: u32 = self.rng.random_range(0..500);
                envelope = envelope.with_order_flow(OrderFlowSignal {
                    symbol: symbol.clone(),
                    timestamp,
                    call_premium: Decimal::from(call) * Decimal::from(1_000),
                    put_premium: Decimal::from(put) * Decimal::from(1_000),
                    bullish_sweeps: self.rng.random_range(0..4),
                    bearish_sweeps: self.rng.random_range(0..4),
                });
            }

            self.prices[idx] = close;
            envelopes.push(envelope);
        }
        envelopes
    }
}

/// Bar feed that streams a seeded random walk, for demos and tests
#[derive(Debug, Clone)]
pub struct MockBarFeed {
    seed: u64,
    interval: Duration,
    start_timestamp: i64,
    max_rounds: Option<usize>,
}

impl MockBarFeed {
    pub fn new(seed: u64, interval_ms: u64) -> Self {
        Self {
            seed,
            interval: Duration::from_millis(interval_ms),
            start_timestamp: chrono::Utc::now().timestamp_millis(),
            max_rounds: None,
        }
    }

    pub fn with_start(mut self, start_timestamp: i64) -> Self {
        self.start_timestamp = start_timestamp;
        self
    }

    /// Stop after `rounds` simulated minutes instead of running forever
    pub fn with_max_rounds(mut self, rounds: usize) -> Self {
        self.max_rounds = Some(rounds);
        self
    }
}

#[async_trait]
impl BarFeed for MockBarFeed {
    async fn subscribe(&self, symbols: Vec<String>) -> Result<Receiver<BarEnvelope>> {
        let (tx, rx) = mpsc::channel(256);
        let mut generator = MockBarGenerator::new(symbols.clone(), self.seed, self.start_timestamp);
        let interval = self.interval;
        let max_rounds = self.max_rounds;

        info!(
            "MockBarFeed: Starting simulation for {:?} (seed {}, every {:?})",
            symbols, self.seed, interval
        );

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            let mut rounds = 0usize;
            loop {
                if let Some(max) = max_rounds
                    && rounds >= max
                {
                    debug!("MockBarFeed: Reached {} rounds, closing", max);
                    break;
                }
                ticker.tick().await;
                for envelope in generator.next_round() {
                    if tx.send(envelope).await.is_err() {
                        debug!("MockBarFeed: Receiver dropped, stopping simulation");
                        return;
                    }
                }
                rounds += 1;
            }
        });

        Ok(rx)
    }
}
