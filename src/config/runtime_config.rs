//! Service runtime configuration parsing from environment variables.
//!
//! Covers which symbols to run, where bars come from, and channel sizing.

use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

/// Where the service reads bars from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedMode {
    /// Seeded random-walk bars
    Mock,
    /// Bars replayed from a CSV file
    Csv(PathBuf),
}

impl FromStr for FeedMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mock" => Ok(FeedMode::Mock),
            "csv" => {
                let path = env::var("FEED_CSV_PATH")
                    .context("FEED=csv requires FEED_CSV_PATH to be set")?;
                Ok(FeedMode::Csv(PathBuf::from(path)))
            }
            _ => anyhow::bail!("Invalid FEED: {}. Must be 'mock' or 'csv'", s),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RuntimeEnvConfig {
    pub symbols: Vec<String>,
    pub feed: FeedMode,
    /// Bounded capacity of each per-symbol session channel
    pub session_channel_capacity: usize,
    /// Capacity of the live broadcast ring buffer
    pub broadcast_capacity: usize,
    /// Snapshots of each kind kept in memory per symbol
    pub snapshot_retention: usize,
    pub mock_seed: u64,
    /// Wall-clock delay between mock bars
    pub mock_interval_ms: u64,
}

impl RuntimeEnvConfig {
    pub fn from_env() -> Result<Self> {
        let symbols = env::var("SYMBOLS")
            .unwrap_or_else(|_| "SPY,QQQ".to_string())
            .split(',')
            .map(|s| s.trim().to_uppercase())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>();
        if symbols.is_empty() {
            anyhow::bail!("SYMBOLS must name at least one symbol");
        }

        let feed = FeedMode::from_str(&env::var("FEED").unwrap_or_else(|_| "mock".to_string()))?;

        let session_channel_capacity = Self::parse_usize("SESSION_CHANNEL_CAPACITY", 256)?;
        if session_channel_capacity == 0 {
            anyhow::bail!("SESSION_CHANNEL_CAPACITY must be > 0");
        }
        let broadcast_capacity = Self::parse_usize("BROADCAST_CAPACITY", 1024)?;
        if broadcast_capacity == 0 {
            anyhow::bail!("BROADCAST_CAPACITY must be > 0");
        }

        let snapshot_retention = Self::parse_usize("SNAPSHOT_RETENTION", 1440)?;
        if snapshot_retention == 0 {
            anyhow::bail!("SNAPSHOT_RETENTION must be > 0");
        }

        Ok(Self {
            symbols,
            feed,
            session_channel_capacity,
            broadcast_capacity,
            snapshot_retention,
            mock_seed: Self::parse_u64("MOCK_SEED", 7)?,
            mock_interval_ms: Self::parse_u64("MOCK_INTERVAL_MS", 250)?,
        })
    }

    fn parse_usize(key: &str, default: usize) -> Result<usize> {
        env::var(key)
            .unwrap_or_else(|_| default.to_string())
            .parse::<usize>()
            .context(format!("Failed to parse {}", key))
    }

    fn parse_u64(key: &str, default: u64) -> Result<u64> {
        env::var(key)
            .unwrap_or_else(|_| default.to_string())
            .parse::<u64>()
            .context(format!("Failed to parse {}", key))
    }
}
