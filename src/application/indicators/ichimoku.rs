use crate::application::market_data::TimeframeAggregator;
use crate::domain::analytics::{IchimokuCloud, IchimokuValues};
use crate::domain::errors::EngineError;
use crate::domain::market::bar::to_f64;
use crate::domain::market::{Bar, Timeframe, TimeframeBar};
use std::collections::VecDeque;
use ta::Next;
use ta::indicators::{Maximum, Minimum};

#[derive(Debug, Clone)]
pub struct IchimokuParams {
    pub timeframe: Timeframe,
    /// Spacing of the base bars fed in
    pub cadence_seconds: u32,
    pub tenkan: usize,
    pub kijun: usize,
    pub senkou_b: usize,
    pub displacement: usize,
}

/// Midpoint of the highest high and lowest low over `period` bars
#[derive(Debug, Clone)]
struct DonchianMid {
    period: usize,
    highs: Maximum,
    lows: Minimum,
    seen: usize,
}

impl DonchianMid {
    fn new(period: usize) -> Result<Self, EngineError> {
        let construction = |e: ta::errors::TaError| EngineError::Construction {
            what: "ichimoku channel",
            reason: format!("{:?}", e),
        };
        Ok(Self {
            period,
            highs: Maximum::new(period).map_err(construction)?,
            lows: Minimum::new(period).map_err(construction)?,
            seen: 0,
        })
    }

    fn update(&mut self, high: f64, low: f64) -> Option<f64> {
        let hh = self.highs.next(high);
        let ll = self.lows.next(low);
        self.seen += 1;
        (self.seen >= self.period).then(|| (hh + ll) / 2.0)
    }
}

/// Ichimoku Kinko Hyo over aggregated higher-timeframe bars.
///
/// Leading spans are reported as computed on the latest completed period;
/// the cloud reported alongside is the one computed `displacement` periods
/// earlier, which is the cloud plotted under the current period.
#[derive(Debug, Clone)]
pub struct IchimokuCalculator {
    params: IchimokuParams,
    aggregator: TimeframeAggregator,
    tenkan: DonchianMid,
    kijun: DonchianMid,
    senkou_b: DonchianMid,
    leading: VecDeque<(f64, f64)>,
    periods: usize,
    latest: Option<IchimokuValues>,
}

impl IchimokuCalculator {
    pub fn new(params: IchimokuParams) -> Result<Self, EngineError> {
        Ok(Self {
            tenkan: DonchianMid::new(params.tenkan)?,
            kijun: DonchianMid::new(params.kijun)?,
            senkou_b: DonchianMid::new(params.senkou_b)?,
            leading: VecDeque::with_capacity(params.displacement + 1),
            aggregator: TimeframeAggregator::with_cadence(params.cadence_seconds),
            periods: 0,
            latest: None,
            params,
        })
    }

    /// Feeds a base bar; values only move when a period completes
    pub fn update(&mut self, bar: &Bar) -> Option<IchimokuValues> {
        for period in self.aggregator.process_bar(bar, &[self.params.timeframe]) {
            self.on_period(&period);
        }
        self.latest
    }

    fn on_period(&mut self, period: &TimeframeBar) {
        let high = to_f64(period.high);
        let low = to_f64(period.low);
        let close = to_f64(period.close);
        self.periods += 1;

        let tenkan = self.tenkan.update(high, low);
        let kijun = self.kijun.update(high, low);
        let senkou_b = self.senkou_b.update(high, low);

        let (Some(tenkan), Some(kijun), Some(senkou_b)) = (tenkan, kijun, senkou_b) else {
            return;
        };
        let senkou_a = (tenkan + kijun) / 2.0;

        self.leading.push_back((senkou_a, senkou_b));
        if self.leading.len() > self.params.displacement + 1 {
            self.leading.pop_front();
        }
        let cloud = if self.leading.len() > self.params.displacement {
            self.leading
                .front()
                .map(|&(span_a, span_b)| IchimokuCloud::new(span_a, span_b, close))
        } else {
            None
        };

        self.latest = Some(IchimokuValues {
            tenkan,
            kijun,
            senkou_a,
            senkou_b,
            chikou: close,
            cloud,
        });
    }

    pub fn value(&self) -> Option<IchimokuValues> {
        self.latest
    }

    pub fn is_ready(&self) -> bool {
        self.latest.is_some()
    }

    /// Completed aggregated periods so far
    pub fn periods(&self) -> usize {
        self.periods
    }
}
