use crate::application::collapse::kernel::logistic;
use crate::application::statistics::RollingWindow;
use crate::domain::analytics::Hazard;

#[derive(Debug, Clone)]
pub struct HazardParams {
    pub window: usize,
    pub weight_volatility: f64,
    pub weight_volume: f64,
    pub bias: f64,
    pub z_cap: f64,
}

/// Regime-change intensity from volatility and volume anomalies.
///
/// `lambda = logistic(w_vol * |z_vol| + w_volume * |z_volume| - bias)`,
/// with both z-scores taken against history that excludes the current bar.
#[derive(Debug, Clone)]
pub struct HazardModel {
    params: HazardParams,
    volatility: RollingWindow,
    volume: RollingWindow,
}

impl HazardModel {
    pub fn new(params: HazardParams) -> Self {
        Self {
            volatility: RollingWindow::new(params.window),
            volume: RollingWindow::new(params.window),
            params,
        }
    }

    /// `sigma` is skipped (z = 0, nothing recorded) until the indicator side has it
    pub fn update(&mut self, sigma: Option<f64>, volume: f64) -> Hazard {
        let z_volatility = match sigma {
            Some(s) => {
                let z = self.volatility.zscore(s, self.params.z_cap);
                self.volatility.push(s);
                z
            }
            None => 0.0,
        };
        let z_volume = self.volume.zscore(volume, self.params.z_cap);
        self.volume.push(volume);

        Hazard {
            lambda: self.rate(z_volatility, z_volume),
            z_volatility,
            z_volume,
        }
    }

    /// Hazard for given anomaly scores; non-decreasing in each magnitude
    pub fn rate(&self, z_volatility: f64, z_volume: f64) -> f64 {
        let x = self.params.weight_volatility * z_volatility.abs()
            + self.params.weight_volume * z_volume.abs()
            - self.params.bias;
        logistic(x).clamp(0.0, 1.0)
    }

    /// Hazard with no anomaly at all
    pub fn floor(&self) -> f64 {
        self.rate(0.0, 0.0)
    }

    pub fn is_ready(&self) -> bool {
        self.volatility.is_ready() && self.volume.is_ready()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> HazardModel {
        HazardModel::new(HazardParams {
            window: 10,
            weight_volatility: 1.0,
            weight_volume: 0.5,
            bias: 3.0,
            z_cap: 6.0,
        })
    }

    #[test]
    fn test_quiet_market_sits_at_floor() {
        let mut hazard = model();
        let mut last = None;
        for _ in 0..20 {
            last = Some(hazard.update(Some(0.001), 500.0));
        }
        let last = last.unwrap();
        assert_eq!(last.lambda, hazard.floor());
        assert!(hazard.is_ready());
    }

    #[test]
    fn test_volatility_spike_raises_hazard() {
        let mut hazard = model();
        for i in 0..10 {
            hazard.update(Some(0.001 + (i % 2) as f64 * 1e-4), 500.0);
        }
        let spike = hazard.update(Some(0.01), 500.0);
        assert!(spike.z_volatility > 0.0);
        assert!(spike.lambda > hazard.floor());
    }

    #[test]
    fn test_rate_bounded_and_monotone() {
        let hazard = model();
        let mut previous = hazard.rate(0.0, 1.0);
        for step in 1..100 {
            let z = step as f64 * 0.1;
            let rate = hazard.rate(z, 1.0);
            assert!((0.0..=1.0).contains(&rate));
            assert!(rate >= previous);
            // Sign of the anomaly does not matter
            assert_eq!(rate, hazard.rate(-z, 1.0));
            previous = rate;
        }
    }

    #[test]
    fn test_missing_sigma_scores_zero() {
        let mut hazard = model();
        let h = hazard.update(None, 100.0);
        assert_eq!(h.z_volatility, 0.0);
        assert!(!hazard.is_ready());
    }
}
