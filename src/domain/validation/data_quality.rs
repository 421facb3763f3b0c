use crate::domain::errors::ValidationError;
use crate::domain::market::Bar;
use rust_decimal::Decimal;
use tracing::warn;

/// Rejects bars that are physically impossible.
///
/// Stateless checks live in [`BarValidator::validate_bar`]; a validator
/// instance also remembers the last accepted timestamp for its symbol so
/// that out-of-order or duplicate bars are refused.
#[derive(Debug, Clone)]
pub struct BarValidator {
    symbol: String,
    last_timestamp: Option<i64>,
}

impl BarValidator {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            last_timestamp: None,
        }
    }

    pub fn last_timestamp(&self) -> Option<i64> {
        self.last_timestamp
    }

    /// Validates the bar and, if it passes, records it as the latest accepted bar
    pub fn accept(&mut self, bar: &Bar) -> Result<(), ValidationError> {
        if bar.symbol != self.symbol {
            return Err(ValidationError::SymbolMismatch {
                expected: self.symbol.clone(),
                actual: bar.symbol.clone(),
            });
        }

        if let Some(previous) = self.last_timestamp
            && bar.timestamp <= previous
        {
            warn!(
                "Validation FAILED: {} bar at {} is not after last accepted {}",
                bar.symbol, bar.timestamp, previous
            );
            return Err(ValidationError::NonMonotonicTimestamp {
                symbol: bar.symbol.clone(),
                previous,
                timestamp: bar.timestamp,
            });
        }

        Self::validate_bar(bar)?;
        self.last_timestamp = Some(bar.timestamp);
        Ok(())
    }

    /// Checks a single bar in isolation
    pub fn validate_bar(bar: &Bar) -> Result<(), ValidationError> {
        if bar.open <= Decimal::ZERO
            || bar.high <= Decimal::ZERO
            || bar.low <= Decimal::ZERO
            || bar.close <= Decimal::ZERO
        {
            warn!(
                "Validation FAILED: Bar for {} has non-positive price component(s)",
                bar.symbol
            );
            return Err(ValidationError::NonPositivePrice {
                symbol: bar.symbol.clone(),
                timestamp: bar.timestamp,
            });
        }

        let body_low = bar.open.min(bar.close);
        let body_high = bar.open.max(bar.close);
        if bar.low > body_low || body_high > bar.high {
            warn!(
                "Validation FAILED: Bar for {} has inconsistent OHLC (o={} h={} l={} c={})",
                bar.symbol, bar.open, bar.high, bar.low, bar.close
            );
            return Err(ValidationError::OhlcOrdering {
                symbol: bar.symbol.clone(),
                timestamp: bar.timestamp,
                open: bar.open,
                high: bar.high,
                low: bar.low,
                close: bar.close,
            });
        }

        if bar.volume < Decimal::ZERO {
            warn!(
                "Validation FAILED: Bar for {} has negative volume: {}",
                bar.symbol, bar.volume
            );
            return Err(ValidationError::NegativeVolume {
                symbol: bar.symbol.clone(),
                timestamp: bar.timestamp,
                volume: bar.volume,
            });
        }

        Self::validate_quote(bar)
    }

    fn validate_quote(bar: &Bar) -> Result<(), ValidationError> {
        let invalid = |reason: String| {
            warn!("Validation FAILED: Bar for {} has invalid quote: {}", bar.symbol, reason);
            Err(ValidationError::InvalidQuote {
                symbol: bar.symbol.clone(),
                timestamp: bar.timestamp,
                reason,
            })
        };

        for (side, size) in [("bid_size", bar.bid_size), ("ask_size", bar.ask_size)] {
            if let Some(size) = size
                && size < Decimal::ZERO
            {
                return invalid(format!("negative {}: {}", side, size));
            }
        }
        for (side, price) in [("bid", bar.bid), ("ask", bar.ask)] {
            if let Some(price) = price
                && price <= Decimal::ZERO
            {
                return invalid(format!("non-positive {}: {}", side, price));
            }
        }
        if let (Some(bid), Some(ask)) = (bar.bid, bar.ask)
            && bid > ask
        {
            return invalid(format!("crossed book: bid {} > ask {}", bid, ask));
        }
        Ok(())
    }
}
