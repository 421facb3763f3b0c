//! Repository Pattern Abstractions
//!
//! Snapshots leave the engines through these traits so that analytics code
//! never depends on a storage implementation.
//!
//! # Current Implementation
//!
//! `InMemorySnapshotRepository` provides thread-safe, in-memory storage
//! using `Arc<RwLock>` for concurrent access.
//!
//! # Example
//!
//! ```rust,no_run
//! use gnosis::domain::repositories::SnapshotRepository;
//! use gnosis::infrastructure::InMemorySnapshotRepository;
//!
//! # async {
//! let repo = InMemorySnapshotRepository::new();
//! let latest = repo.latest_collapse_field("SPY").await;
//! # };
//! ```

use crate::domain::analytics::{CollapseFieldSnapshot, IndicatorSnapshot};
use anyhow::Result;
use async_trait::async_trait;

/// Stores analytics snapshots keyed by `(symbol, timestamp)`.
///
/// Saving a snapshot for a key that already exists replaces it.
#[async_trait]
pub trait SnapshotRepository: Send + Sync {
    async fn save_indicators(&self, snapshot: &IndicatorSnapshot) -> Result<()>;

    async fn save_collapse_field(&self, snapshot: &CollapseFieldSnapshot) -> Result<()>;

    async fn find_indicators(&self, symbol: &str, timestamp: i64)
    -> Result<Option<IndicatorSnapshot>>;

    async fn find_collapse_field(
        &self,
        symbol: &str,
        timestamp: i64,
    ) -> Result<Option<CollapseFieldSnapshot>>;

    /// Most recent collapse-field snapshot for a symbol
    async fn latest_collapse_field(&self, symbol: &str) -> Result<Option<CollapseFieldSnapshot>>;

    /// Indicator snapshots for a symbol in `[start, end]`, oldest first
    async fn indicator_range(
        &self,
        symbol: &str,
        start: i64,
        end: i64,
    ) -> Result<Vec<IndicatorSnapshot>>;

    /// Number of stored (indicator, collapse-field) snapshots for a symbol
    async fn count(&self, symbol: &str) -> Result<(usize, usize)>;
}
