use crate::domain::market::bar::Bar;
use crate::domain::market::timeframe::Timeframe;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A bar aggregated from base bars over one timeframe period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeframeBar {
    pub timeframe: Timeframe,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
    /// Start timestamp of the period (ms)
    pub timestamp: i64,
    /// Timestamp of the latest base bar merged (ms)
    pub last_timestamp: i64,
    /// Number of base bars merged so far
    pub bar_count: usize,
}

impl TimeframeBar {
    /// Opens a new period from its first base bar
    pub fn open_with(timeframe: Timeframe, period_start: i64, bar: &Bar) -> Self {
        Self {
            timeframe,
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
            volume: bar.volume,
            timestamp: period_start,
            last_timestamp: bar.timestamp,
            bar_count: 1,
        }
    }

    /// Merges a later base bar of the same period
    pub fn merge(&mut self, bar: &Bar) {
        if bar.high > self.high {
            self.high = bar.high;
        }
        if bar.low < self.low {
            self.low = bar.low;
        }
        self.close = bar.close;
        self.volume += bar.volume;
        self.last_timestamp = bar.timestamp;
        self.bar_count += 1;
    }

    /// A period is complete once its latest base bar covers the period end.
    ///
    /// `cadence_ms` is the span of one base bar.
    pub fn is_complete(&self, cadence_ms: i64) -> bool {
        self.last_timestamp + cadence_ms >= self.end_timestamp()
    }

    /// End timestamp (exclusive) of the period
    pub fn end_timestamp(&self) -> i64 {
        self.timestamp + self.timeframe.to_seconds() * 1000
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn bar(ts: i64, high: Decimal, low: Decimal, close: Decimal) -> Bar {
        Bar::new("QQQ", ts, dec!(100), high, low, close, dec!(1000))
    }

    #[test]
    fn test_merge_keeps_extremes_and_last_close() {
        let base = 1704067200000i64;
        let mut tf_bar = TimeframeBar::open_with(
            Timeframe::FiveMin,
            base,
            &bar(base, dec!(105), dec!(99), dec!(103)),
        );
        tf_bar.merge(&bar(base + 60_000, dec!(107), dec!(102), dec!(106)));

        assert_eq!(tf_bar.open, dec!(100));
        assert_eq!(tf_bar.high, dec!(107));
        assert_eq!(tf_bar.low, dec!(99));
        assert_eq!(tf_bar.close, dec!(106));
        assert_eq!(tf_bar.volume, dec!(2000));
        assert_eq!(tf_bar.bar_count, 2);
        assert!(!tf_bar.is_complete(60_000));
        assert_eq!(tf_bar.last_timestamp, base + 60_000);
        assert_eq!(tf_bar.end_timestamp(), base + 300_000);
    }

    #[test]
    fn test_is_complete() {
        let base = 1704067200000i64;
        let mut tf_bar = TimeframeBar::open_with(
            Timeframe::FiveMin,
            base,
            &bar(base, dec!(101), dec!(99), dec!(100)),
        );
        for i in 1..5 {
            tf_bar.merge(&bar(base + i * 60_000, dec!(101), dec!(99), dec!(100)));
        }
        assert!(tf_bar.is_complete(60_000));
    }

    #[test]
    fn test_is_complete_follows_cadence() {
        let base = 1704067200000i64;
        let mut tf_bar = TimeframeBar::open_with(
            Timeframe::FiveMin,
            base,
            &bar(base, dec!(101), dec!(99), dec!(100)),
        );
        // Half-minute bars: five of them only cover the first 2.5 minutes
        for i in 1..5 {
            tf_bar.merge(&bar(base + i * 30_000, dec!(101), dec!(99), dec!(100)));
        }
        assert!(!tf_bar.is_complete(30_000));
        for i in 5..10 {
            tf_bar.merge(&bar(base + i * 30_000, dec!(101), dec!(99), dec!(100)));
        }
        assert_eq!(tf_bar.bar_count, 10);
        assert!(tf_bar.is_complete(30_000));

        // Five-minute bars fill the period with a single bar
        let single = TimeframeBar::open_with(
            Timeframe::FiveMin,
            base,
            &bar(base, dec!(101), dec!(99), dec!(100)),
        );
        assert!(single.is_complete(300_000));
    }
}
