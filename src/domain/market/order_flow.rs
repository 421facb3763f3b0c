use crate::domain::market::bar::{Ohlcv, to_f64};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Per-bar aggregate of options order flow for one symbol.
///
/// Premiums are notional dollars traded in calls and puts during the bar;
/// sweeps are aggressive multi-venue orders classified by direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderFlowSignal {
    pub symbol: String,
    pub timestamp: i64,
    pub call_premium: Decimal,
    pub put_premium: Decimal,
    #[serde(default)]
    pub bullish_sweeps: u32,
    #[serde(default)]
    pub bearish_sweeps: u32,
}

impl OrderFlowSignal {
    /// Net customer pressure in [-1, 1]; positive means net buying.
    ///
    /// Mean of the premium skew and the sweep skew, using whichever of the two
    /// has any activity. Zero when the signal carries no flow at all.
    pub fn imbalance(&self) -> f64 {
        let premium = skew(to_f64(self.call_premium), to_f64(self.put_premium));
        let sweeps = skew(self.bullish_sweeps as f64, self.bearish_sweeps as f64);

        match (premium, sweeps) {
            (Some(p), Some(s)) => (p + s) / 2.0,
            (Some(p), None) => p,
            (None, Some(s)) => s,
            (None, None) => 0.0,
        }
    }
}

/// `(a - b) / (a + b)` clamped to [-1, 1], `None` when there is nothing to compare
pub fn skew(a: f64, b: f64) -> Option<f64> {
    let a = a.max(0.0);
    let b = b.max(0.0);
    let total = a + b;
    if total <= f64::EPSILON || !total.is_finite() {
        return None;
    }
    Some(((a - b) / total).clamp(-1.0, 1.0))
}

/// Quote size skew: resting bids outweighing asks reads as buying pressure
pub fn quote_skew(bid_size: f64, ask_size: f64) -> f64 {
    skew(bid_size, ask_size).unwrap_or(0.0)
}

/// Close location value in [-1, 1]: +1 closes on the high, -1 on the low.
///
/// A zero-range bar carries no directional information and scores 0.
pub fn close_location_value(bar: &Ohlcv) -> f64 {
    let range = bar.high - bar.low;
    if range <= f64::EPSILON {
        return 0.0;
    }
    (((bar.close - bar.low) - (bar.high - bar.close)) / range).clamp(-1.0, 1.0)
}
