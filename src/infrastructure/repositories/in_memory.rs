//! In-Memory Repository Implementations
//!
//! Thread-safe, in-memory implementation of `SnapshotRepository`.
//!
//! # Limitations
//!
//! - Data is lost on application restart
//! - Unbounded unless built `with_retention`, which keeps only the newest
//!   snapshots of each kind per symbol

use crate::domain::analytics::{CollapseFieldSnapshot, IndicatorSnapshot};
use crate::domain::repositories::SnapshotRepository;
use anyhow::Result;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

type BySymbol<T> = HashMap<String, BTreeMap<i64, T>>;

/// In-memory implementation of SnapshotRepository
#[derive(Clone, Default)]
pub struct InMemorySnapshotRepository {
    indicators: Arc<RwLock<BySymbol<IndicatorSnapshot>>>,
    collapse_fields: Arc<RwLock<BySymbol<CollapseFieldSnapshot>>>,
    /// Max snapshots kept per symbol and kind
    retention: Option<usize>,
}

/// Inserts under `timestamp`, then evicts the oldest keys beyond `retention`
fn insert_bounded<T>(
    series: &mut BTreeMap<i64, T>,
    timestamp: i64,
    value: T,
    retention: Option<usize>,
) {
    series.insert(timestamp, value);
    if let Some(limit) = retention {
        while series.len() > limit {
            series.pop_first();
        }
    }
}

impl InMemorySnapshotRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Repository that keeps at most `retention` snapshots per symbol and kind
    pub fn with_retention(retention: usize) -> Self {
        Self {
            retention: Some(retention.max(1)),
            ..Self::default()
        }
    }

    /// Symbols with at least one stored snapshot, sorted
    pub async fn symbols(&self) -> Vec<String> {
        let mut symbols: Vec<String> = self.indicators.read().await.keys().cloned().collect();
        symbols.sort();
        symbols
    }
}

#[async_trait]
impl SnapshotRepository for InMemorySnapshotRepository {
    async fn save_indicators(&self, snapshot: &IndicatorSnapshot) -> Result<()> {
        let mut indicators = self.indicators.write().await;
        let series = indicators.entry(snapshot.symbol.clone()).or_default();
        insert_bounded(series, snapshot.timestamp, snapshot.clone(), self.retention);
        Ok(())
    }

    async fn save_collapse_field(&self, snapshot: &CollapseFieldSnapshot) -> Result<()> {
        let mut fields = self.collapse_fields.write().await;
        let series = fields.entry(snapshot.symbol.clone()).or_default();
        insert_bounded(series, snapshot.timestamp, snapshot.clone(), self.retention);
        Ok(())
    }

    async fn find_indicators(
        &self,
        symbol: &str,
        timestamp: i64,
    ) -> Result<Option<IndicatorSnapshot>> {
        Ok(self
            .indicators
            .read()
            .await
            .get(symbol)
            .and_then(|series| series.get(&timestamp))
            .cloned())
    }

    async fn find_collapse_field(
        &self,
        symbol: &str,
        timestamp: i64,
    ) -> Result<Option<CollapseFieldSnapshot>> {
        Ok(self
            .collapse_fields
            .read()
            .await
            .get(symbol)
            .and_then(|series| series.get(&timestamp))
            .cloned())
    }

    async fn latest_collapse_field(&self, symbol: &str) -> Result<Option<CollapseFieldSnapshot>> {
        Ok(self
            .collapse_fields
            .read()
            .await
            .get(symbol)
            .and_then(|series| series.values().next_back())
            .cloned())
    }

    async fn indicator_range(
        &self,
        symbol: &str,
        start: i64,
        end: i64,
    ) -> Result<Vec<IndicatorSnapshot>> {
        if start > end {
            return Ok(Vec::new());
        }
        Ok(self
            .indicators
            .read()
            .await
            .get(symbol)
            .map(|series| series.range(start..=end).map(|(_, s)| s.clone()).collect())
            .unwrap_or_default())
    }

    async fn count(&self, symbol: &str) -> Result<(usize, usize)> {
        let indicators = self
            .indicators
            .read()
            .await
            .get(symbol)
            .map_or(0, BTreeMap::len);
        let collapse_fields = self
            .collapse_fields
            .read()
            .await
            .get(symbol)
            .map_or(0, BTreeMap::len);
        Ok((indicators, collapse_fields))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn indicator(symbol: &str, timestamp: i64, rsi: Option<f64>) -> IndicatorSnapshot {
        IndicatorSnapshot {
            symbol: symbol.to_string(),
            timestamp,
            sigma: None,
            vwap: None,
            rsi,
            bollinger: None,
            ichimoku: None,
            ready: false,
        }
    }

    #[tokio::test]
    async fn test_keyed_by_symbol_and_timestamp() {
        let repo = InMemorySnapshotRepository::new();
        repo.save_indicators(&indicator("SPY", 60_000, Some(40.0))).await.unwrap();
        repo.save_indicators(&indicator("SPY", 120_000, Some(45.0))).await.unwrap();
        repo.save_indicators(&indicator("QQQ", 60_000, Some(60.0))).await.unwrap();

        let found = repo.find_indicators("SPY", 60_000).await.unwrap().unwrap();
        assert_eq!(found.rsi, Some(40.0));
        assert!(repo.find_indicators("SPY", 180_000).await.unwrap().is_none());
        assert_eq!(repo.count("SPY").await.unwrap(), (2, 0));
        assert_eq!(repo.symbols().await, vec!["QQQ".to_string(), "SPY".to_string()]);
    }

    #[tokio::test]
    async fn test_save_replaces_same_key() {
        let repo = InMemorySnapshotRepository::new();
        repo.save_indicators(&indicator("SPY", 60_000, Some(40.0))).await.unwrap();
        repo.save_indicators(&indicator("SPY", 60_000, Some(41.0))).await.unwrap();

        assert_eq!(repo.count("SPY").await.unwrap(), (1, 0));
        let found = repo.find_indicators("SPY", 60_000).await.unwrap().unwrap();
        assert_eq!(found.rsi, Some(41.0));
    }

    #[tokio::test]
    async fn test_range_is_inclusive_and_ordered() {
        let repo = InMemorySnapshotRepository::new();
        for ts in [180_000, 60_000, 120_000, 240_000] {
            repo.save_indicators(&indicator("SPY", ts, None)).await.unwrap();
        }
        let range = repo.indicator_range("SPY", 60_000, 180_000).await.unwrap();
        let timestamps: Vec<i64> = range.iter().map(|s| s.timestamp).collect();
        assert_eq!(timestamps, vec![60_000, 120_000, 180_000]);
        assert!(repo.indicator_range("SPY", 10, 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_retention_evicts_oldest_per_symbol() {
        let repo = InMemorySnapshotRepository::with_retention(3);
        for minute in 0..10 {
            repo.save_indicators(&indicator("SPY", minute * 60_000, None)).await.unwrap();
        }
        repo.save_indicators(&indicator("QQQ", 0, None)).await.unwrap();

        assert_eq!(repo.count("SPY").await.unwrap(), (3, 0));
        assert_eq!(repo.count("QQQ").await.unwrap(), (1, 0));
        assert!(repo.find_indicators("SPY", 6 * 60_000).await.unwrap().is_none());
        let kept: Vec<i64> = repo
            .indicator_range("SPY", 0, i64::MAX)
            .await
            .unwrap()
            .iter()
            .map(|s| s.timestamp)
            .collect();
        assert_eq!(kept, vec![7 * 60_000, 8 * 60_000, 9 * 60_000]);
    }
}
