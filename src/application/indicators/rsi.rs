use crate::application::statistics::WilderSmoother;

/// Relative Strength Index with Wilder smoothing
#[derive(Debug, Clone)]
pub struct RsiCalculator {
    gains: WilderSmoother,
    losses: WilderSmoother,
    last_close: Option<f64>,
}

impl RsiCalculator {
    pub fn new(period: usize) -> Self {
        Self {
            gains: WilderSmoother::new(period),
            losses: WilderSmoother::new(period),
            last_close: None,
        }
    }

    /// Feeds a close; ready after `period` price changes
    pub fn update(&mut self, close: f64) -> Option<f64> {
        if let Some(prev) = self.last_close {
            let change = close - prev;
            self.gains.update(change.max(0.0));
            self.losses.update((-change).max(0.0));
        }
        self.last_close = Some(close);
        self.value()
    }

    pub fn value(&self) -> Option<f64> {
        let avg_gain = self.gains.value()?;
        let avg_loss = self.losses.value()?;
        Some(Self::from_averages(avg_gain, avg_loss))
    }

    pub fn is_ready(&self) -> bool {
        self.gains.is_ready()
    }

    /// RSI from smoothed averages.
    ///
    /// No losses means 100 when there were gains, 50 when nothing moved.
    pub fn from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
        if avg_loss <= 0.0 {
            return if avg_gain > 0.0 { 100.0 } else { 50.0 };
        }
        let rs = avg_gain / avg_loss;
        (100.0 - 100.0 / (1.0 + rs)).clamp(0.0, 100.0)
    }
}
