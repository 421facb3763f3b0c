use crate::application::statistics::RollingWindow;
use crate::config::VwapWindow;
use crate::domain::market::Ohlcv;
use chrono::{DateTime, NaiveDate};

/// Volume-weighted average of the typical price over a configurable window
#[derive(Debug, Clone)]
pub struct VwapAccumulator {
    window: VwapWindow,
    pv_sum: f64,
    volume_sum: f64,
    current_day: Option<NaiveDate>,
    rolling: Option<(RollingWindow, RollingWindow)>,
}

impl VwapAccumulator {
    pub fn new(window: VwapWindow) -> Self {
        let rolling = match window {
            VwapWindow::Rolling(n) => Some((RollingWindow::new(n), RollingWindow::new(n))),
            _ => None,
        };
        Self {
            window,
            pv_sum: 0.0,
            volume_sum: 0.0,
            current_day: None,
            rolling,
        }
    }

    pub fn update(&mut self, bar: &Ohlcv, timestamp: i64) -> Option<f64> {
        let pv = bar.typical_price() * bar.volume;

        match (&mut self.rolling, self.window) {
            (Some((pv_window, volume_window)), _) => {
                pv_window.push(pv);
                volume_window.push(bar.volume);
                self.pv_sum = pv_window.sum();
                self.volume_sum = volume_window.sum();
            }
            (None, VwapWindow::Daily) => {
                let day = DateTime::from_timestamp_millis(timestamp).map(|dt| dt.date_naive());
                if day != self.current_day {
                    self.pv_sum = 0.0;
                    self.volume_sum = 0.0;
                    self.current_day = day;
                }
                self.pv_sum += pv;
                self.volume_sum += bar.volume;
            }
            (None, _) => {
                self.pv_sum += pv;
                self.volume_sum += bar.volume;
            }
        }

        self.value()
    }

    /// `None` while the window holds no volume
    pub fn value(&self) -> Option<f64> {
        if self.volume_sum > 0.0 {
            Some(self.pv_sum / self.volume_sum)
        } else {
            None
        }
    }

    /// Only the rolling variant has a window to fill
    pub fn is_warm(&self) -> bool {
        match &self.rolling {
            Some((_, volume_window)) => volume_window.is_ready(),
            None => true,
        }
    }
}
