use gnosis::application::session::AnalyticsService;
use gnosis::config::EngineConfig;
use gnosis::domain::analytics::{MessageKind, StreamMessage, WarmupState};
use gnosis::domain::market::{Bar, BarEnvelope, OrderFlowSignal};
use gnosis::domain::ports::BarFeed;
use gnosis::domain::repositories::SnapshotRepository;
use gnosis::infrastructure::{InMemorySnapshotRepository, Metrics, MockBarFeed, StreamBus};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast::error::TryRecvError;

const BASE: i64 = 1704067200000;

fn envelope(symbol: &str, minute: i64, close: Decimal) -> BarEnvelope {
    let bar = Bar::new(
        symbol,
        BASE + minute * 60_000,
        close,
        close + dec!(0.2),
        close - dec!(0.2),
        close,
        dec!(1500),
    );
    BarEnvelope::new(bar)
}

fn service(
    repository: Arc<InMemorySnapshotRepository>,
    bus: StreamBus,
    metrics: Metrics,
) -> AnalyticsService {
    AnalyticsService::new(Arc::new(EngineConfig::default()), repository, bus, metrics, 16)
}

fn drain(rx: &mut tokio::sync::broadcast::Receiver<StreamMessage>) -> Vec<StreamMessage> {
    let mut messages = Vec::new();
    loop {
        match rx.try_recv() {
            Ok(message) => messages.push(message),
            Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            Err(TryRecvError::Lagged(n)) => panic!("subscriber lagged by {}", n),
        }
    }
    messages
}

#[tokio::test]
async fn test_two_symbols_are_processed_independently() {
    let repository = Arc::new(InMemorySnapshotRepository::new());
    let bus = StreamBus::new(1024);
    let mut live = bus.subscribe();
    let metrics = Metrics::new().unwrap();
    let mut service = service(repository.clone(), bus, metrics.clone());

    for minute in 0..30 {
        let spy = dec!(470) + Decimal::from(minute % 5) * dec!(0.1);
        let qqq = dec!(405) - Decimal::from(minute % 4) * dec!(0.1);
        service.dispatch(envelope("SPY", minute, spy)).await.unwrap();
        service.dispatch(envelope("QQQ", minute, qqq)).await.unwrap();
    }
    assert_eq!(service.active_symbols(), vec!["QQQ", "SPY"]);

    let summaries = service.shutdown().await;
    assert_eq!(summaries.len(), 2);
    for summary in &summaries {
        assert_eq!(summary.accepted, 30);
        assert_eq!(summary.rejected, 0);
        assert_eq!(summary.state, WarmupState::Warming);
        assert_eq!(summary.last_timestamp, Some(BASE + 29 * 60_000));
    }

    // persisted under (symbol, timestamp)
    assert_eq!(repository.count("SPY").await.unwrap(), (30, 30));
    assert_eq!(repository.count("QQQ").await.unwrap(), (30, 30));
    let spy = repository
        .find_indicators("SPY", BASE + 10 * 60_000)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(spy.symbol, "SPY");
    let latest = repository.latest_collapse_field("QQQ").await.unwrap().unwrap();
    assert_eq!(latest.timestamp, BASE + 29 * 60_000);

    // three messages per accepted bar, in bar/indicator/collapse order per symbol
    let messages = drain(&mut live);
    assert_eq!(messages.len(), 180);
    let mut per_symbol: HashMap<String, Vec<&StreamMessage>> = HashMap::new();
    for message in &messages {
        per_symbol
            .entry(message.symbol().to_string())
            .or_default()
            .push(message);
    }
    for (_, stream) in per_symbol {
        assert_eq!(stream.len(), 90);
        for (i, chunk) in stream.chunks(3).enumerate() {
            assert_eq!(chunk[0].kind(), MessageKind::Bar);
            assert_eq!(chunk[1].kind(), MessageKind::Indicator);
            assert_eq!(chunk[2].kind(), MessageKind::CollapseField);
            let ts = BASE + i as i64 * 60_000;
            assert!(chunk.iter().all(|m| m.timestamp() == ts));
        }
    }

    assert_eq!(metrics.bars_processed_total.get(), 60);
    assert_eq!(metrics.broadcast_messages_total.get(), 180);
}

#[tokio::test]
async fn test_out_of_order_bar_is_rejected_and_skipped() {
    let repository = Arc::new(InMemorySnapshotRepository::new());
    let metrics = Metrics::new().unwrap();
    let mut service = service(repository.clone(), StreamBus::new(64), metrics.clone());

    service.dispatch(envelope("SPY", 0, dec!(470))).await.unwrap();
    service.dispatch(envelope("SPY", 2, dec!(471))).await.unwrap();
    service.dispatch(envelope("SPY", 1, dec!(472))).await.unwrap();
    service.dispatch(envelope("SPY", 2, dec!(473))).await.unwrap();
    service.dispatch(envelope("SPY", 3, dec!(474))).await.unwrap();

    let summaries = service.shutdown().await;
    assert_eq!(summaries[0].accepted, 3);
    assert_eq!(summaries[0].rejected, 2);
    assert_eq!(metrics.bars_rejected_total.get(), 2);
    assert!(
        metrics
            .render()
            .contains("gnosis_bars_rejected_by_reason_total{reason=\"non_monotonic_timestamp\"} 2")
    );

    assert!(
        repository
            .find_indicators("SPY", BASE + 60_000)
            .await
            .unwrap()
            .is_none()
    );
    let kept = repository
        .find_indicators("SPY", BASE + 2 * 60_000)
        .await
        .unwrap();
    assert!(kept.is_some());
}

#[tokio::test]
async fn test_malformed_bar_never_reaches_engines() {
    let repository = Arc::new(InMemorySnapshotRepository::new());
    let metrics = Metrics::new().unwrap();
    let mut service = service(repository.clone(), StreamBus::new(64), metrics.clone());

    let mut broken = envelope("SPY", 0, dec!(470));
    broken.bar.low = dec!(471);
    service.dispatch(broken).await.unwrap();

    let mut flow = envelope("SPY", 1, dec!(470));
    flow.order_flow = Some(OrderFlowSignal {
        symbol: "SPY".to_string(),
        timestamp: BASE + 60_000,
        call_premium: dec!(120000),
        put_premium: dec!(30000),
        bullish_sweeps: 2,
        bearish_sweeps: 1,
    });
    service.dispatch(flow).await.unwrap();

    let summaries = service.shutdown().await;
    assert_eq!(summaries[0].accepted, 1);
    assert_eq!(summaries[0].rejected, 1);
    assert_eq!(repository.count("SPY").await.unwrap(), (1, 1));

    let field = repository
        .find_collapse_field("SPY", BASE + 60_000)
        .await
        .unwrap()
        .unwrap();
    assert!(field.dealer.q > field.dealer.p);
}

#[tokio::test]
async fn test_service_runs_mock_feed_to_completion() {
    let repository = Arc::new(InMemorySnapshotRepository::new());
    let metrics = Metrics::new().unwrap();
    let mut service = service(repository.clone(), StreamBus::new(16), metrics.clone());

    let feed = MockBarFeed::new(99, 1).with_start(BASE).with_max_rounds(25);
    let rx = feed
        .subscribe(vec!["SPY".to_string(), "IWM".to_string()])
        .await
        .unwrap();

    service.run(rx).await.unwrap();
    let summaries = service.shutdown().await;

    assert_eq!(summaries.len(), 2);
    assert_eq!(summaries[0].symbol, "IWM");
    assert!(summaries.iter().all(|s| s.accepted == 25 && s.rejected == 0));
    assert_eq!(repository.count("IWM").await.unwrap(), (25, 25));
    assert_eq!(metrics.active_sessions.get(), 0);
}

#[tokio::test]
async fn test_retention_bounds_stored_snapshots() {
    let repository = Arc::new(InMemorySnapshotRepository::with_retention(10));
    let metrics = Metrics::new().unwrap();
    let mut service = service(repository.clone(), StreamBus::new(16), metrics.clone());

    for minute in 0..30 {
        let close = dec!(470) + Decimal::from(minute % 5) * dec!(0.1);
        service.dispatch(envelope("SPY", minute, close)).await.unwrap();
    }
    let summaries = service.shutdown().await;

    assert_eq!(summaries[0].accepted, 30);
    assert_eq!(repository.count("SPY").await.unwrap(), (10, 10));
    assert!(repository.find_collapse_field("SPY", BASE).await.unwrap().is_none());
    let latest = repository.latest_collapse_field("SPY").await.unwrap().unwrap();
    assert_eq!(latest.timestamp, BASE + 29 * 60_000);
}
