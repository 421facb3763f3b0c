// Market data domain
pub mod bar;
pub mod order_flow;
pub mod timeframe;
pub mod timeframe_bar;

pub use bar::{Bar, Ohlcv};
pub use order_flow::OrderFlowSignal;
pub use timeframe::Timeframe;
pub use timeframe_bar::TimeframeBar;

use serde::{Deserialize, Serialize};

/// A bar together with the order-flow signal observed for the same minute, if any
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarEnvelope {
    pub bar: Bar,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_flow: Option<OrderFlowSignal>,
}

impl BarEnvelope {
    pub fn new(bar: Bar) -> Self {
        Self {
            bar,
            order_flow: None,
        }
    }

    pub fn with_order_flow(mut self, signal: OrderFlowSignal) -> Self {
        self.order_flow = Some(signal);
        self
    }

    pub fn symbol(&self) -> &str {
        &self.bar.symbol
    }
}
