use crate::application::session::symbol_session::SymbolSession;
use crate::config::EngineConfig;
use crate::domain::analytics::{SessionSnapshot, SessionSummary};
use crate::domain::errors::ServiceError;
use crate::domain::market::BarEnvelope;
use crate::domain::repositories::SnapshotRepository;
use crate::infrastructure::event_bus::StreamBus;
use crate::infrastructure::observability::{LatencyGuard, Metrics};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::mpsc::{self, Receiver, Sender};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

struct Worker {
    tx: Sender<BarEnvelope>,
    handle: JoinHandle<SessionSummary>,
}

/// Routes bars to one worker task per symbol.
///
/// Each worker owns its `SymbolSession` outright and is fed through a
/// bounded channel, so symbols progress independently and a slow consumer
/// applies backpressure to the feed. A worker that dies is dropped and its
/// symbol stays closed; the other symbols keep running.
pub struct AnalyticsService {
    config: Arc<EngineConfig>,
    repository: Arc<dyn SnapshotRepository>,
    bus: StreamBus,
    metrics: Metrics,
    channel_capacity: usize,
    workers: HashMap<String, Worker>,
    closed: HashSet<String>,
}

impl AnalyticsService {
    pub fn new(
        config: Arc<EngineConfig>,
        repository: Arc<dyn SnapshotRepository>,
        bus: StreamBus,
        metrics: Metrics,
        channel_capacity: usize,
    ) -> Self {
        Self {
            config,
            repository,
            bus,
            metrics,
            channel_capacity: channel_capacity.max(1),
            workers: HashMap::new(),
            closed: HashSet::new(),
        }
    }

    /// Symbols with a running worker, sorted
    pub fn active_symbols(&self) -> Vec<String> {
        let mut symbols: Vec<String> = self.workers.keys().cloned().collect();
        symbols.sort();
        symbols
    }

    /// Sends one bar to its symbol's worker, starting the worker on first sight
    pub async fn dispatch(&mut self, envelope: BarEnvelope) -> Result<(), ServiceError> {
        let symbol = envelope.symbol().to_string();
        if self.closed.contains(&symbol) {
            return Err(ServiceError::WorkerClosed { symbol });
        }
        if !self.workers.contains_key(&symbol) {
            let worker = self.spawn_worker(&symbol)?;
            self.workers.insert(symbol.clone(), worker);
        }

        let Some(worker) = self.workers.get(&symbol) else {
            return Err(ServiceError::WorkerClosed { symbol });
        };
        if worker.tx.send(envelope).await.is_err() {
            self.retire(&symbol).await;
            return Err(ServiceError::WorkerClosed { symbol });
        }
        Ok(())
    }

    /// Dispatches everything the feed delivers until it closes.
    ///
    /// A failing symbol is logged and skipped; the loop keeps serving the rest.
    pub async fn run(&mut self, mut rx: Receiver<BarEnvelope>) -> Result<(), ServiceError> {
        while let Some(envelope) = rx.recv().await {
            if let Err(e) = self.dispatch(envelope).await {
                warn!("AnalyticsService: dropping bar: {}", e);
            }
        }
        info!("AnalyticsService: feed closed");
        Ok(())
    }

    /// Closes every worker channel and waits for the workers to drain.
    ///
    /// Summaries are sorted by symbol.
    pub async fn shutdown(self) -> Vec<SessionSummary> {
        let mut summaries = Vec::with_capacity(self.workers.len());
        for (symbol, worker) in self.workers {
            drop(worker.tx);
            match worker.handle.await {
                Ok(summary) => summaries.push(summary),
                Err(e) => {
                    self.metrics.active_sessions.dec();
                    error!("AnalyticsService: worker for {} failed: {}", symbol, e);
                }
            }
        }
        summaries.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        info!("AnalyticsService: stopped {} sessions", summaries.len());
        summaries
    }

    /// Removes a worker whose task has ended and closes its symbol
    async fn retire(&mut self, symbol: &str) {
        self.closed.insert(symbol.to_string());
        let Some(dead) = self.workers.remove(symbol) else {
            return;
        };
        drop(dead.tx);
        match dead.handle.await {
            Ok(summary) => warn!(
                "AnalyticsService: worker for {} exited early after {} bars",
                symbol, summary.accepted
            ),
            Err(e) => {
                // A panicked worker never reaches its own gauge update
                self.metrics.active_sessions.dec();
                error!("AnalyticsService: worker for {} failed: {}", symbol, e);
            }
        }
    }

    fn spawn_worker(&self, symbol: &str) -> Result<Worker, ServiceError> {
        let session = SymbolSession::new(symbol, &self.config)?;
        let (tx, rx) = mpsc::channel(self.channel_capacity);

        let worker = SessionWorker {
            session,
            repository: self.repository.clone(),
            bus: self.bus.clone(),
            metrics: self.metrics.clone(),
        };
        self.metrics.active_sessions.inc();
        info!("AnalyticsService: started session for {}", symbol);

        Ok(Worker {
            tx,
            handle: tokio::spawn(worker.run(rx)),
        })
    }
}

struct SessionWorker {
    session: SymbolSession,
    repository: Arc<dyn SnapshotRepository>,
    bus: StreamBus,
    metrics: Metrics,
}

impl SessionWorker {
    async fn run(mut self, mut rx: Receiver<BarEnvelope>) -> SessionSummary {
        while let Some(envelope) = rx.recv().await {
            let result = {
                let _latency = LatencyGuard::new(self.metrics.update_latency_seconds.clone());
                self.session.apply(&envelope)
            };

            match result {
                Ok(snapshot) => {
                    self.metrics.bars_processed_total.inc();
                    self.metrics.set_hazard_rate(
                        self.session.symbol(),
                        snapshot.collapse_field.hazard.lambda,
                    );
                    self.persist(&snapshot).await;
                    let delivered = self.bus.publish_snapshot(snapshot);
                    self.metrics.add_broadcast(delivered);
                }
                Err(e) => self.metrics.record_rejection(e.reason()),
            }
        }

        self.metrics.active_sessions.dec();
        self.session.summary()
    }

    async fn persist(&self, snapshot: &SessionSnapshot) {
        if let Err(e) = self.repository.save_indicators(&snapshot.indicators).await {
            warn!(
                "SessionWorker [{}]: failed to store indicators at {}: {:#}",
                snapshot.symbol, snapshot.timestamp, e
            );
            self.metrics.persistence_failures_total.inc();
        }
        if let Err(e) = self
            .repository
            .save_collapse_field(&snapshot.collapse_field)
            .await
        {
            warn!(
                "SessionWorker [{}]: failed to store collapse field at {}: {:#}",
                snapshot.symbol, snapshot.timestamp, e
            );
            self.metrics.persistence_failures_total.inc();
        }
    }
}
