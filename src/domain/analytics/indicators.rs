use serde::{Deserialize, Serialize};

/// Classical indicator values for one symbol at one bar.
///
/// `None` means the indicator's window has not filled yet, never zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    pub symbol: String,
    pub timestamp: i64,
    pub sigma: Option<f64>,
    pub vwap: Option<f64>,
    pub rsi: Option<f64>,
    pub bollinger: Option<BollingerBands>,
    pub ichimoku: Option<IchimokuValues>,
    /// Every rolling window of the indicator engine is filled
    pub ready: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BollingerBands {
    pub lower: f64,
    pub mid: f64,
    pub upper: f64,
    /// (upper - lower) / mid
    pub bandwidth: f64,
    /// Bandwidth sits at or below the low percentile of its recent history
    pub squeeze: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IchimokuValues {
    pub tenkan: f64,
    pub kijun: f64,
    /// Leading span A computed this period, plotted `displacement` periods ahead
    pub senkou_a: f64,
    /// Leading span B computed this period, plotted `displacement` periods ahead
    pub senkou_b: f64,
    /// Latest aggregated close, plotted `displacement` periods back
    pub chikou: f64,
    /// Cloud in force for the current period, once enough leading history exists
    pub cloud: Option<IchimokuCloud>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IchimokuCloud {
    pub span_a: f64,
    pub span_b: f64,
    pub position: CloudPosition,
    /// |span_a - span_b|
    pub thickness: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloudPosition {
    Above,
    Inside,
    Below,
}

impl IchimokuCloud {
    pub fn new(span_a: f64, span_b: f64, close: f64) -> Self {
        let top = span_a.max(span_b);
        let bottom = span_a.min(span_b);
        let position = if close > top {
            CloudPosition::Above
        } else if close < bottom {
            CloudPosition::Below
        } else {
            CloudPosition::Inside
        };
        Self {
            span_a,
            span_b,
            position,
            thickness: top - bottom,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cloud_position() {
        assert_eq!(IchimokuCloud::new(10.0, 12.0, 13.0).position, CloudPosition::Above);
        assert_eq!(IchimokuCloud::new(12.0, 10.0, 11.0).position, CloudPosition::Inside);
        assert_eq!(IchimokuCloud::new(10.0, 12.0, 9.0).position, CloudPosition::Below);
        assert_eq!(IchimokuCloud::new(12.0, 10.0, 9.0).thickness, 2.0);
    }
}
