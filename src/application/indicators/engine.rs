use crate::application::indicators::bollinger::{BollingerCalculator, BollingerParams};
use crate::application::indicators::ichimoku::{IchimokuCalculator, IchimokuParams};
use crate::application::indicators::rsi::RsiCalculator;
use crate::application::indicators::sigma::SigmaEstimator;
use crate::application::indicators::vwap::VwapAccumulator;
use crate::config::EngineConfig;
use crate::domain::analytics::IndicatorSnapshot;
use crate::domain::errors::EngineError;
use crate::domain::market::Bar;
use tracing::debug;

/// Classical indicators for one symbol.
///
/// Expects validated bars in strictly increasing timestamp order; each call
/// to [`IndicatorEngine::update`] advances every indicator by one bar.
#[derive(Debug, Clone)]
pub struct IndicatorEngine {
    symbol: String,
    sigma: SigmaEstimator,
    vwap: VwapAccumulator,
    rsi: RsiCalculator,
    bollinger: BollingerCalculator,
    ichimoku: IchimokuCalculator,
    ready: bool,
}

impl IndicatorEngine {
    pub fn new(symbol: impl Into<String>, config: &EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;

        let ichimoku = IchimokuCalculator::new(IchimokuParams {
            timeframe: config.ichimoku_timeframe()?,
            cadence_seconds: config.data_cadence_seconds,
            tenkan: config.ichimoku_tenkan,
            kijun: config.ichimoku_kijun,
            senkou_b: config.ichimoku_senkou_b,
            displacement: config.ichimoku_displacement,
        })?;

        Ok(Self {
            symbol: symbol.into(),
            sigma: SigmaEstimator::new(config.ewma_span),
            vwap: VwapAccumulator::new(config.vwap_window),
            rsi: RsiCalculator::new(config.rsi_period),
            bollinger: BollingerCalculator::new(BollingerParams {
                period: config.bollinger_period,
                std_multiplier: config.bollinger_std,
                squeeze_lookback: config.bollinger_squeeze_lookback,
                squeeze_percentile: config.bollinger_squeeze_percentile,
                squeeze_min_history: config.bollinger_squeeze_min_history,
            }),
            ichimoku,
            ready: false,
        })
    }

    pub fn update(&mut self, bar: &Bar) -> IndicatorSnapshot {
        let v = bar.ohlcv();

        let sigma = self.sigma.update(v.close);
        let vwap = self.vwap.update(&v, bar.timestamp);
        let rsi = self.rsi.update(v.close);
        let bollinger = self.bollinger.update(v.close);
        let ichimoku = self.ichimoku.update(bar);

        if !self.ready && self.windows_filled() {
            self.ready = true;
            debug!(
                "IndicatorEngine [{}]: all indicator windows filled at {}",
                self.symbol, bar.timestamp
            );
        }

        IndicatorSnapshot {
            symbol: self.symbol.clone(),
            timestamp: bar.timestamp,
            sigma,
            vwap,
            rsi,
            bollinger,
            ichimoku,
            ready: self.ready,
        }
    }

    fn windows_filled(&self) -> bool {
        self.sigma.is_ready()
            && self.rsi.is_ready()
            && self.bollinger.is_ready()
            && self.ichimoku.is_ready()
            && self.vwap.is_warm()
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn sigma(&self) -> Option<f64> {
        self.sigma.value()
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }
}
