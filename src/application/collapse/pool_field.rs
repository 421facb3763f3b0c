use crate::application::collapse::kernel::GaussianKernel;
use crate::application::statistics::RollingWindow;
use crate::config::BandwidthRule;
use crate::domain::analytics::{FieldPoint, PoolField, ZGrid};

const DEGENERATE_EPS: f64 = 1e-12;

/// Kernel density estimate of standardized returns over the z-grid
#[derive(Debug, Clone)]
pub struct PoolFieldEstimator {
    grid: ZGrid,
    rule: BandwidthRule,
    min_bandwidth: f64,
    kernel: GaussianKernel,
}

impl PoolFieldEstimator {
    pub fn new(grid: ZGrid, rule: BandwidthRule, min_bandwidth: f64, kernel: GaussianKernel) -> Self {
        Self {
            grid,
            rule,
            min_bandwidth,
            kernel,
        }
    }

    /// Builds L(z) from the current return window.
    ///
    /// Returns are standardized with the window's own mean and population
    /// std-dev (all zero when the spread is degenerate). An empty window
    /// yields the kernel centred at zero.
    pub fn estimate(&self, returns: &RollingWindow) -> PoolField {
        let samples = standardize(returns);
        let bandwidth = self.rule.bandwidth(samples.len()).max(self.min_bandwidth);

        let mut densities: Vec<f64> = self
            .grid
            .points()
            .iter()
            .map(|&g| {
                samples
                    .iter()
                    .map(|&z| self.kernel.pdf((g - z) / bandwidth))
                    .sum::<f64>()
            })
            .collect();

        let mut total: f64 = densities.iter().sum();
        if !(total.is_finite() && total > 0.0) {
            // All mass fell off the grid; fall back to a centred kernel
            densities = self
                .grid
                .points()
                .iter()
                .map(|&g| self.kernel.pdf(g / bandwidth))
                .collect();
            total = densities.iter().sum();
        }

        let points = self
            .grid
            .points()
            .iter()
            .zip(densities)
            .map(|(&z, d)| FieldPoint {
                z,
                density: if total > 0.0 { d / total } else { 0.0 },
            })
            .collect();

        PoolField {
            points,
            bandwidth,
            sample_count: returns.len(),
        }
    }
}

fn standardize(returns: &RollingWindow) -> Vec<f64> {
    match (returns.mean(), returns.std_dev()) {
        (Some(mean), Some(sd)) if sd > DEGENERATE_EPS => {
            returns.iter().map(|r| (r - mean) / sd).collect()
        }
        (Some(_), Some(_)) => vec![0.0; returns.len()],
        _ => vec![0.0],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn estimator() -> PoolFieldEstimator {
        PoolFieldEstimator::new(
            ZGrid::standard(),
            BandwidthRule::Silverman,
            0.25,
            GaussianKernel::new().unwrap(),
        )
    }

    #[test]
    fn test_empty_window_is_centred() {
        let field = estimator().estimate(&RollingWindow::new(10));
        assert_eq!(field.points.len(), 33);
        assert!((field.total_mass() - 1.0).abs() < 1e-9);
        assert!(field.mean().abs() < 1e-9);
        assert_eq!(field.sample_count, 0);
    }

    #[test]
    fn test_degenerate_returns_collapse_to_zero() {
        let mut returns = RollingWindow::new(30);
        for _ in 0..30 {
            returns.push(0.0);
        }
        let field = estimator().estimate(&returns);
        assert!((field.total_mass() - 1.0).abs() < 1e-9);
        let peak = field
            .points
            .iter()
            .max_by(|a, b| a.density.total_cmp(&b.density))
            .unwrap();
        assert_eq!(peak.z, 0.0);
    }

    #[test]
    fn test_normalized_and_non_negative() {
        let mut returns = RollingWindow::new(120);
        for i in 0..120 {
            returns.push(((i * 37 % 17) as f64 - 8.0) * 1e-3);
        }
        let field = estimator().estimate(&returns);
        assert!((field.total_mass() - 1.0).abs() < 1e-6);
        assert!(field.points.iter().all(|p| p.density >= 0.0));
        assert!(field.bandwidth >= 0.25);
    }
}
