use crate::domain::analytics::collapse_field::CollapseFieldSnapshot;
use crate::domain::analytics::indicators::IndicatorSnapshot;
use crate::domain::market::Bar;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Live update pushed to subscribers, tagged by kind.
///
/// Serialized as `{"type": "collapse_field", "data": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum StreamMessage {
    Bar(Bar),
    Indicator(IndicatorSnapshot),
    CollapseField(CollapseFieldSnapshot),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Bar,
    Indicator,
    CollapseField,
}

impl StreamMessage {
    pub fn kind(&self) -> MessageKind {
        match self {
            StreamMessage::Bar(_) => MessageKind::Bar,
            StreamMessage::Indicator(_) => MessageKind::Indicator,
            StreamMessage::CollapseField(_) => MessageKind::CollapseField,
        }
    }

    pub fn symbol(&self) -> &str {
        match self {
            StreamMessage::Bar(bar) => &bar.symbol,
            StreamMessage::Indicator(snapshot) => &snapshot.symbol,
            StreamMessage::CollapseField(snapshot) => &snapshot.symbol,
        }
    }

    pub fn timestamp(&self) -> i64 {
        match self {
            StreamMessage::Bar(bar) => bar.timestamp,
            StreamMessage::Indicator(snapshot) => snapshot.timestamp,
            StreamMessage::CollapseField(snapshot) => snapshot.timestamp,
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            MessageKind::Bar => "bar",
            MessageKind::Indicator => "indicator",
            MessageKind::CollapseField => "collapse_field",
        };
        write!(f, "{}", label)
    }
}
