use crate::application::statistics::RollingWindow;
use crate::domain::analytics::BollingerBands;
use statrs::statistics::{Data, OrderStatistics};

#[derive(Debug, Clone)]
pub struct BollingerParams {
    pub period: usize,
    pub std_multiplier: f64,
    pub squeeze_lookback: usize,
    pub squeeze_percentile: usize,
    pub squeeze_min_history: usize,
}

/// Bollinger bands over closes, with bandwidth squeeze detection
#[derive(Debug, Clone)]
pub struct BollingerCalculator {
    params: BollingerParams,
    closes: RollingWindow,
    bandwidths: RollingWindow,
}

impl BollingerCalculator {
    pub fn new(params: BollingerParams) -> Self {
        Self {
            closes: RollingWindow::new(params.period),
            bandwidths: RollingWindow::new(params.squeeze_lookback),
            params,
        }
    }

    pub fn update(&mut self, close: f64) -> Option<BollingerBands> {
        self.closes.push(close);
        if !self.closes.is_ready() {
            return None;
        }

        let mid = self.closes.mean()?;
        let sd = self.closes.std_dev()?;
        let half_width = self.params.std_multiplier * sd;
        let upper = mid + half_width;
        let lower = mid - half_width;
        let bandwidth = if mid.abs() > f64::EPSILON {
            (upper - lower) / mid
        } else {
            0.0
        };

        self.bandwidths.push(bandwidth);
        let squeeze = self.is_squeeze(bandwidth);

        Some(BollingerBands {
            lower,
            mid,
            upper,
            bandwidth,
            squeeze,
        })
    }

    /// Bandwidth at or below the configured percentile of recent bandwidths
    fn is_squeeze(&self, bandwidth: f64) -> bool {
        if self.bandwidths.len() <= self.params.squeeze_min_history {
            return false;
        }
        let mut history = Data::new(self.bandwidths.to_vec());
        let threshold = history.percentile(self.params.squeeze_percentile);
        bandwidth <= threshold
    }

    pub fn is_ready(&self) -> bool {
        self.closes.is_ready()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> BollingerParams {
        BollingerParams {
            period: 20,
            std_multiplier: 2.0,
            squeeze_lookback: 780,
            squeeze_percentile: 15,
            squeeze_min_history: 50,
        }
    }

    #[test]
    fn test_flat_prices_collapse_bands() {
        let mut bb = BollingerCalculator::new(params());
        let mut last = None;
        for _ in 0..25 {
            last = bb.update(100.0);
        }
        let bands = last.unwrap();
        assert_eq!(bands.mid, 100.0);
        assert!(bands.bandwidth.abs() < 1e-12);
        assert!(!bands.squeeze);
    }

    #[test]
    fn test_band_ordering() {
        let mut bb = BollingerCalculator::new(params());
        for i in 0..40 {
            if let Some(bands) = bb.update(100.0 + (i as f64 * 0.7).sin() * 3.0) {
                assert!(bands.lower <= bands.mid && bands.mid <= bands.upper);
                assert!(bands.bandwidth >= 0.0);
            }
        }
        assert!(bb.is_ready());
    }

    #[test]
    fn test_squeeze_after_volatility_contracts() {
        let mut bb = BollingerCalculator::new(params());
        let mut last = None;
        // Wide swings then a quiet tape
        for i in 0..120 {
            let amplitude = if i < 90 { 5.0 } else { 0.01 };
            let close = 100.0 + if i % 2 == 0 { amplitude } else { -amplitude };
            last = bb.update(close);
        }
        assert!(last.unwrap().squeeze);
    }
}
