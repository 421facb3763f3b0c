use crate::domain::analytics::collapse_field::CollapseFieldSnapshot;
use crate::domain::analytics::indicators::IndicatorSnapshot;
use crate::domain::analytics::stream::StreamMessage;
use crate::domain::analytics::warmup::WarmupState;
use crate::domain::market::Bar;
use serde::{Deserialize, Serialize};

/// Everything a symbol session produces for one accepted bar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub symbol: String,
    pub timestamp: i64,
    pub state: WarmupState,
    pub bar: Bar,
    pub indicators: IndicatorSnapshot,
    pub collapse_field: CollapseFieldSnapshot,
}

impl SessionSnapshot {
    /// Stream messages in publication order: bar, indicators, collapse field
    pub fn into_messages(self) -> [StreamMessage; 3] {
        [
            StreamMessage::Bar(self.bar),
            StreamMessage::Indicator(self.indicators),
            StreamMessage::CollapseField(self.collapse_field),
        ]
    }
}

/// Counters reported by a session worker when it stops
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub symbol: String,
    pub accepted: u64,
    pub rejected: u64,
    pub state: WarmupState,
    pub last_timestamp: Option<i64>,
}
