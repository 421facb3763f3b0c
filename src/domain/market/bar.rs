use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

/// One-minute OHLCV bar with an optional top-of-book quote
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub symbol: String,
    /// Bar open time, Unix milliseconds
    pub timestamp: i64,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bid: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ask: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bid_size: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ask_size: Option<Decimal>,
}

/// Floating-point view of a bar, used by the numeric engines
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ohlcv {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Ohlcv {
    pub fn typical_price(&self) -> f64 {
        (self.high + self.low + self.close) / 3.0
    }
}

pub(crate) fn to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}

impl Bar {
    /// Builds a bar without quote data
    pub fn new(
        symbol: impl Into<String>,
        timestamp: i64,
        open: Decimal,
        high: Decimal,
        low: Decimal,
        close: Decimal,
        volume: Decimal,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            timestamp,
            open,
            high,
            low,
            close,
            volume,
            bid: None,
            ask: None,
            bid_size: None,
            ask_size: None,
        }
    }

    /// Attaches a top-of-book quote
    pub fn with_quote(
        mut self,
        bid: Decimal,
        ask: Decimal,
        bid_size: Decimal,
        ask_size: Decimal,
    ) -> Self {
        self.bid = Some(bid);
        self.ask = Some(ask);
        self.bid_size = Some(bid_size);
        self.ask_size = Some(ask_size);
        self
    }

    pub fn ohlcv(&self) -> Ohlcv {
        Ohlcv {
            open: to_f64(self.open),
            high: to_f64(self.high),
            low: to_f64(self.low),
            close: to_f64(self.close),
            volume: to_f64(self.volume),
        }
    }

    /// Bid and ask sizes, when both sides are quoted
    pub fn quote_sizes(&self) -> Option<(f64, f64)> {
        match (self.bid_size, self.ask_size) {
            (Some(bid), Some(ask)) => Some((to_f64(bid), to_f64(ask))),
            _ => None,
        }
    }
}
