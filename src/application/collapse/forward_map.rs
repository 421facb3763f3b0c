use crate::application::collapse::kernel::GaussianKernel;
use crate::domain::analytics::{
    ConfidenceInterval, FieldPoint, ForwardProjection, Particle, PoolField, ZGrid,
};
use std::collections::BTreeMap;

const BISECTION_STEPS: usize = 100;
const DEGENERATE_EPS: f64 = 1e-12;

#[derive(Debug, Clone)]
pub struct ForwardMapParams {
    /// Ascending, unique
    pub horizons_minutes: Vec<u32>,
    /// Ascending, unique, each in (0, 1)
    pub confidence_levels: Vec<f64>,
    pub cadence_seconds: u32,
    pub diffusion_floor: f64,
    pub diffusion_cap: f64,
}

/// Projects the particle forward through the pool field.
///
/// For a horizon of `tau` bars the projected position is a mixture: one
/// Gaussian component per grid point, centred at `center + (z_j - mean(L))`,
/// weighted by `L(z_j)`, all sharing the scale
/// `sqrt(base^2 + diffusion^2 * tau)`. `base` is half a grid step, so the
/// discretized field is treated as a continuous density.
#[derive(Debug, Clone)]
pub struct ForwardMapper {
    params: ForwardMapParams,
    grid: ZGrid,
    kernel: GaussianKernel,
}

struct Mixture {
    centers: Vec<f64>,
    weights: Vec<f64>,
    scale: f64,
}

impl ForwardMapper {
    pub fn new(params: ForwardMapParams, grid: ZGrid, kernel: GaussianKernel) -> Self {
        Self {
            params,
            grid,
            kernel,
        }
    }

    /// Per-bar diffusion of the particle in z units.
    ///
    /// Sigma is a per-bar log-return scale; dividing the implied price move
    /// by the price std-dev of the standardization window expresses it on
    /// the particle's axis. Falls back to the floor when either is missing.
    pub fn diffusion(&self, sigma: Option<f64>, close: f64, price_std: Option<f64>) -> f64 {
        match (sigma, price_std) {
            (Some(s), Some(sd)) if sd > DEGENERATE_EPS && s.is_finite() => (s * close / sd)
                .clamp(self.params.diffusion_floor, self.params.diffusion_cap),
            _ => self.params.diffusion_floor,
        }
    }

    pub fn horizon_bars(&self, horizon_minutes: u32) -> f64 {
        horizon_minutes as f64 * 60.0 / self.params.cadence_seconds.max(1) as f64
    }

    pub fn project(
        &self,
        pool: &PoolField,
        particle: Particle,
        diffusion: f64,
        hazard: f64,
    ) -> BTreeMap<u32, ForwardProjection> {
        let pool_mean = pool.mean();
        let pool_variance = pool.variance();
        let base = self.grid.step() / 2.0;
        let levels = &self.params.confidence_levels;

        // Running half-width envelopes per level, carried across horizons
        let mut envelope_low = vec![0.0f64; levels.len()];
        let mut envelope_high = vec![0.0f64; levels.len()];

        let mut map = BTreeMap::new();
        for &horizon in &self.params.horizons_minutes {
            let tau = self.horizon_bars(horizon);
            let center = particle.position + particle.velocity * tau;
            let scale = (base * base + diffusion * diffusion * tau).sqrt();

            let mixture = self.mixture(pool, center - pool_mean, scale);
            let density = self.density_on_grid(&mixture);

            let mut intervals = Vec::with_capacity(levels.len());
            for (i, &level) in levels.iter().enumerate() {
                let low = self.quantile(&mixture, (1.0 - level) / 2.0);
                let high = self.quantile(&mixture, (1.0 + level) / 2.0);

                let mut half_low = (center - low).max(0.0).max(envelope_low[i]);
                let mut half_high = (high - center).max(0.0).max(envelope_high[i]);
                if i > 0 {
                    half_low = half_low.max(envelope_low[i - 1]);
                    half_high = half_high.max(envelope_high[i - 1]);
                }
                envelope_low[i] = half_low;
                envelope_high[i] = half_high;

                intervals.push(ConfidenceInterval {
                    level,
                    z_low: center - half_low,
                    z_high: center + half_high,
                });
            }

            let survival = (1.0 - hazard.clamp(0.0, 1.0)).powf(tau).clamp(0.0, 1.0);

            map.insert(
                horizon,
                ForwardProjection {
                    horizon_minutes: horizon,
                    center,
                    spread: (pool_variance + scale * scale).sqrt(),
                    survival,
                    density,
                    intervals,
                },
            );
        }
        map
    }

    fn mixture(&self, pool: &PoolField, shift: f64, scale: f64) -> Mixture {
        let (centers, weights): (Vec<f64>, Vec<f64>) = pool
            .points
            .iter()
            .filter(|p| p.density > 0.0)
            .map(|p| (p.z + shift, p.density))
            .unzip();
        let total: f64 = weights.iter().sum();

        if total > 0.0 {
            Mixture {
                centers,
                weights: weights.into_iter().map(|w| w / total).collect(),
                scale,
            }
        } else {
            Mixture {
                centers: vec![shift],
                weights: vec![1.0],
                scale,
            }
        }
    }

    fn density_on_grid(&self, mixture: &Mixture) -> Vec<FieldPoint> {
        let raw: Vec<f64> = self
            .grid
            .points()
            .iter()
            .map(|&g| {
                mixture
                    .centers
                    .iter()
                    .zip(&mixture.weights)
                    .map(|(c, w)| w * self.kernel.pdf((g - c) / mixture.scale))
                    .sum::<f64>()
            })
            .collect();
        let total: f64 = raw.iter().sum();

        if !(total > 0.0 && total.is_finite()) {
            // Mass has drifted beyond the grid: pin it to the nearest edge point
            let mean: f64 = mixture
                .centers
                .iter()
                .zip(&mixture.weights)
                .map(|(c, w)| c * w)
                .sum();
            let nearest = self.grid.nearest_index(mean);
            return self
                .grid
                .points()
                .iter()
                .enumerate()
                .map(|(i, &z)| FieldPoint {
                    z,
                    density: if i == nearest { 1.0 } else { 0.0 },
                })
                .collect();
        }

        self.grid
            .points()
            .iter()
            .zip(raw)
            .map(|(&z, d)| FieldPoint { z, density: d / total })
            .collect()
    }

    fn cdf(&self, mixture: &Mixture, x: f64) -> f64 {
        mixture
            .centers
            .iter()
            .zip(&mixture.weights)
            .map(|(c, w)| w * self.kernel.cdf((x - c) / mixture.scale))
            .sum()
    }

    fn quantile(&self, mixture: &Mixture, p: f64) -> f64 {
        let reach = 12.0 * mixture.scale;
        let mut lo = mixture
            .centers
            .iter()
            .copied()
            .fold(f64::INFINITY, f64::min)
            - reach;
        let mut hi = mixture
            .centers
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max)
            + reach;

        for _ in 0..BISECTION_STEPS {
            let mid = 0.5 * (lo + hi);
            if self.cdf(mixture, mid) < p {
                lo = mid;
            } else {
                hi = mid;
            }
            if hi - lo < 1e-10 {
                break;
            }
        }
        0.5 * (lo + hi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapper() -> ForwardMapper {
        ForwardMapper::new(
            ForwardMapParams {
                horizons_minutes: vec![1, 5, 15, 30, 60],
                confidence_levels: vec![0.68, 0.95, 0.997],
                cadence_seconds: 60,
                diffusion_floor: 0.02,
                diffusion_cap: 1.0,
            },
            ZGrid::standard(),
            GaussianKernel::new().unwrap(),
        )
    }

    fn point_mass_at_zero() -> PoolField {
        let grid = ZGrid::standard();
        PoolField {
            points: grid
                .points()
                .iter()
                .map(|&z| FieldPoint {
                    z,
                    density: if z == 0.0 { 1.0 } else { 0.0 },
                })
                .collect(),
            bandwidth: 0.25,
            sample_count: 1,
        }
    }

    #[test]
    fn test_single_component_matches_normal_quantiles() {
        let particle = Particle {
            position: 0.5,
            velocity: 0.0,
        };
        let map = mapper().project(&point_mass_at_zero(), particle, 0.1, 0.0);
        let projection = &map[&1];
        let scale = (0.125f64.powi(2) + 0.01).sqrt();
        let ci = projection.interval(0.95).unwrap();
        assert!((ci.z_high - 0.5 - 1.959_964 * scale).abs() < 1e-4);
        assert!((0.5 - ci.z_low - 1.959_964 * scale).abs() < 1e-4);
        assert_eq!(projection.survival, 1.0);
    }

    #[test]
    fn test_center_follows_velocity() {
        let particle = Particle {
            position: 0.2,
            velocity: 0.01,
        };
        let map = mapper().project(&point_mass_at_zero(), particle, 0.05, 0.05);
        for (horizon, projection) in &map {
            let expected = 0.2 + 0.01 * *horizon as f64;
            assert!((projection.center - expected).abs() < 1e-12);
            let ci = projection.interval(0.68).unwrap();
            let midpoint = (ci.z_low + ci.z_high) / 2.0;
            assert!((midpoint - expected).abs() < 1e-6);
        }
    }

    #[test]
    fn test_intervals_nested_and_widening() {
        let particle = Particle {
            position: -1.0,
            velocity: 0.02,
        };
        let map = mapper().project(&point_mass_at_zero(), particle, 0.08, 0.1);
        let mut previous: Option<Vec<f64>> = None;
        for projection in map.values() {
            let widths: Vec<f64> = projection.intervals.iter().map(|c| c.width()).collect();
            for pair in projection.intervals.windows(2) {
                assert!(pair[1].contains(&pair[0]));
            }
            if let Some(prev) = &previous {
                for (w, p) in widths.iter().zip(prev) {
                    assert!(w + 1e-12 >= *p);
                }
            }
            let mass: f64 = projection.density.iter().map(|p| p.density).sum();
            assert!((mass - 1.0).abs() < 1e-9 || mass == 0.0);
            previous = Some(widths);
        }
    }

    #[test]
    fn test_survival_decays_with_horizon() {
        let map = mapper().project(&point_mass_at_zero(), Particle::default(), 0.05, 0.1);
        assert!((map[&1].survival - 0.9).abs() < 1e-12);
        assert!(map[&60].survival < map[&5].survival);
    }

    #[test]
    fn test_diffusion_floor_and_cap() {
        let m = mapper();
        assert_eq!(m.diffusion(None, 100.0, Some(1.0)), 0.02);
        assert_eq!(m.diffusion(Some(0.001), 100.0, Some(0.0)), 0.02);
        assert_eq!(m.diffusion(Some(0.5), 100.0, Some(1.0)), 1.0);
        assert!((m.diffusion(Some(0.001), 100.0, Some(1.0)) - 0.1).abs() < 1e-12);
    }
}
