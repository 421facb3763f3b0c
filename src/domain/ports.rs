use crate::domain::market::BarEnvelope;
use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc::Receiver;

/// Source of bars for the analytics service.
///
/// Implementations deliver envelopes in strictly increasing timestamp order
/// per symbol; interleaving across symbols is unspecified.
#[async_trait]
pub trait BarFeed: Send + Sync {
    async fn subscribe(&self, symbols: Vec<String>) -> Result<Receiver<BarEnvelope>>;
}
