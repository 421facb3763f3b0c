use crate::domain::market::{Bar, Timeframe, TimeframeBar};
use std::collections::HashMap;

const DEFAULT_CADENCE_MS: i64 = 60_000;

/// Aggregates base bars of a single symbol into higher timeframes.
///
/// A period is emitted when its latest base bar reaches the period end, or
/// when a bar from a later period arrives (gaps close the open period early).
/// Bars falling in a period that was already emitted are dropped.
#[derive(Debug, Clone)]
pub struct TimeframeAggregator {
    cadence_ms: i64,
    active: HashMap<Timeframe, TimeframeBar>,
    closed: HashMap<Timeframe, i64>,
}

impl Default for TimeframeAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeframeAggregator {
    /// Aggregator for one-minute base bars
    pub fn new() -> Self {
        Self {
            cadence_ms: DEFAULT_CADENCE_MS,
            active: HashMap::new(),
            closed: HashMap::new(),
        }
    }

    /// Aggregator for base bars spaced `cadence_seconds` apart
    pub fn with_cadence(cadence_seconds: u32) -> Self {
        Self {
            cadence_ms: i64::from(cadence_seconds.max(1)) * 1000,
            ..Self::new()
        }
    }

    /// Feeds one base bar and returns any periods it completed, oldest first
    pub fn process_bar(&mut self, bar: &Bar, timeframes: &[Timeframe]) -> Vec<TimeframeBar> {
        let mut completed = Vec::new();

        for &timeframe in timeframes {
            let period_start = timeframe.period_start(bar.timestamp);
            if self
                .closed
                .get(&timeframe)
                .is_some_and(|&closed| period_start <= closed)
            {
                continue;
            }

            let pending = match self.active.remove(&timeframe) {
                Some(mut active) if active.timestamp == period_start => {
                    active.merge(bar);
                    active
                }
                previous => {
                    // New period: the previous one (if any) is closed as-is
                    if let Some(stale) = previous {
                        self.closed.insert(timeframe, stale.timestamp);
                        completed.push(stale);
                    }
                    TimeframeBar::open_with(timeframe, period_start, bar)
                }
            };

            if pending.is_complete(self.cadence_ms) {
                self.closed.insert(timeframe, pending.timestamp);
                completed.push(pending);
            } else {
                self.active.insert(timeframe, pending);
            }
        }

        completed
    }

    /// Closes and returns every open period
    pub fn flush(&mut self) -> Vec<TimeframeBar> {
        let mut open: Vec<_> = self.active.drain().map(|(_, v)| v).collect();
        for tf_bar in &open {
            self.closed.insert(tf_bar.timeframe, tf_bar.timestamp);
        }
        open.sort_by_key(|b| (b.timeframe.to_minutes(), b.timestamp));
        open
    }

    pub fn active_bar(&self, timeframe: Timeframe) -> Option<&TimeframeBar> {
        self.active.get(&timeframe)
    }
}
