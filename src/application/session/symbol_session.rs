use crate::application::collapse::CollapseFieldEngine;
use crate::application::indicators::IndicatorEngine;
use crate::config::EngineConfig;
use crate::domain::analytics::{SessionSnapshot, SessionSummary, WarmupState};
use crate::domain::errors::{EngineError, ValidationError};
use crate::domain::market::{Bar, BarEnvelope, OrderFlowSignal};
use crate::domain::validation::BarValidator;
use tracing::{debug, info, warn};

/// All analytics state for one symbol.
///
/// A session has exactly one writer: bars are applied in arrival order and
/// each accepted bar advances both engines once.
#[derive(Debug, Clone)]
pub struct SymbolSession {
    symbol: String,
    validator: BarValidator,
    indicators: IndicatorEngine,
    collapse: CollapseFieldEngine,
    state: WarmupState,
    accepted: u64,
    rejected: u64,
}

impl SymbolSession {
    pub fn new(symbol: impl Into<String>, config: &EngineConfig) -> Result<Self, EngineError> {
        let symbol = symbol.into();
        Ok(Self {
            validator: BarValidator::new(symbol.clone()),
            indicators: IndicatorEngine::new(symbol.clone(), config)?,
            collapse: CollapseFieldEngine::new(symbol.clone(), config)?,
            state: WarmupState::Cold,
            accepted: 0,
            rejected: 0,
            symbol,
        })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn state(&self) -> WarmupState {
        self.state
    }

    /// Applies one bar and its order-flow signal, if the signal belongs to it.
    ///
    /// Rejected bars leave every engine untouched.
    pub fn apply(&mut self, envelope: &BarEnvelope) -> Result<SessionSnapshot, ValidationError> {
        let order_flow = envelope
            .order_flow
            .as_ref()
            .filter(|signal| self.is_aligned(&envelope.bar, signal));
        self.update(&envelope.bar, order_flow)
    }

    pub fn apply_bar(&mut self, bar: &Bar) -> Result<SessionSnapshot, ValidationError> {
        self.update(bar, None)
    }

    fn is_aligned(&self, bar: &Bar, signal: &OrderFlowSignal) -> bool {
        let aligned = signal.symbol == bar.symbol && signal.timestamp == bar.timestamp;
        if !aligned {
            debug!(
                "SymbolSession [{}]: ignoring order flow for {}@{} on bar {}",
                self.symbol, signal.symbol, signal.timestamp, bar.timestamp
            );
        }
        aligned
    }

    fn update(
        &mut self,
        bar: &Bar,
        order_flow: Option<&OrderFlowSignal>,
    ) -> Result<SessionSnapshot, ValidationError> {
        if let Err(e) = self.validator.accept(bar) {
            self.rejected += 1;
            warn!("SymbolSession [{}]: rejected bar: {}", self.symbol, e);
            return Err(e);
        }
        self.accepted += 1;

        let indicators = self.indicators.update(bar);
        let collapse_field = self
            .collapse
            .update(bar, self.indicators.sigma(), order_flow);

        let previous = self.state;
        self.state = self
            .state
            .advance(indicators.ready && collapse_field.ready);
        if self.state.is_ready() && !previous.is_ready() {
            info!(
                "SymbolSession [{}]: Ready after {} bars (at {})",
                self.symbol, self.accepted, bar.timestamp
            );
        }

        Ok(SessionSnapshot {
            symbol: self.symbol.clone(),
            timestamp: bar.timestamp,
            state: self.state,
            bar: bar.clone(),
            indicators,
            collapse_field,
        })
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            symbol: self.symbol.clone(),
            accepted: self.accepted,
            rejected: self.rejected,
            state: self.state,
            last_timestamp: self.validator.last_timestamp(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    const BASE: i64 = 1704067200000;

    fn bar(symbol: &str, minute: i64, close: Decimal) -> Bar {
        Bar::new(
            symbol,
            BASE + minute * 60_000,
            close,
            close + dec!(0.5),
            close - dec!(0.5),
            close,
            dec!(1000),
        )
    }

    #[test]
    fn test_first_bar_moves_to_warming() {
        let mut session = SymbolSession::new("SPY", &EngineConfig::default()).unwrap();
        assert_eq!(session.state(), WarmupState::Cold);

        let snapshot = session.apply_bar(&bar("SPY", 0, dec!(470))).unwrap();
        assert_eq!(snapshot.state, WarmupState::Warming);
        assert_eq!(snapshot.indicators.timestamp, BASE);
        assert_eq!(snapshot.collapse_field.timestamp, BASE);
    }

    #[test]
    fn test_rejections_do_not_advance_engines() {
        let mut session = SymbolSession::new("SPY", &EngineConfig::default()).unwrap();
        session.apply_bar(&bar("SPY", 1, dec!(470))).unwrap();

        let err = session.apply_bar(&bar("SPY", 1, dec!(471))).unwrap_err();
        assert_eq!(err.reason(), "non_monotonic_timestamp");
        let err = session.apply_bar(&bar("QQQ", 2, dec!(400))).unwrap_err();
        assert_eq!(err.reason(), "symbol_mismatch");

        let summary = session.summary();
        assert_eq!(summary.accepted, 1);
        assert_eq!(summary.rejected, 2);
        assert_eq!(summary.last_timestamp, Some(BASE + 60_000));
    }

    #[test]
    fn test_misaligned_order_flow_is_ignored() {
        let mut session = SymbolSession::new("SPY", &EngineConfig::default()).unwrap();
        let b = bar("SPY", 0, dec!(470));
        let envelope = BarEnvelope::new(b.clone()).with_order_flow(OrderFlowSignal {
            symbol: "SPY".to_string(),
            timestamp: b.timestamp - 60_000,
            call_premium: dec!(100000),
            put_premium: dec!(0),
            bullish_sweeps: 5,
            bearish_sweeps: 0,
        });

        let snapshot = session.apply(&envelope).unwrap();
        assert_ne!(
            snapshot.collapse_field.dealer.source,
            crate::domain::analytics::ImbalanceSource::OrderFlow
        );
    }

    #[test]
    fn test_aligned_order_flow_is_used() {
        let mut session = SymbolSession::new("SPY", &EngineConfig::default()).unwrap();
        let b = bar("SPY", 0, dec!(470));
        let envelope = BarEnvelope::new(b.clone()).with_order_flow(OrderFlowSignal {
            symbol: "SPY".to_string(),
            timestamp: b.timestamp,
            call_premium: dec!(100000),
            put_premium: dec!(0),
            bullish_sweeps: 5,
            bearish_sweeps: 0,
        });

        let snapshot = session.apply(&envelope).unwrap();
        assert_eq!(
            snapshot.collapse_field.dealer.source,
            crate::domain::analytics::ImbalanceSource::OrderFlow
        );
    }
}
