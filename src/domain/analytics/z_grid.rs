use crate::domain::errors::ConfigError;
use serde::{Deserialize, Serialize};

/// Fixed, ordered set of standardized-distance coordinates.
///
/// Every pool field and forward projection is evaluated on the same grid.
/// Points are computed as `min + i * step` so the last point lands exactly on `max`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZGrid {
    min: f64,
    max: f64,
    step: f64,
    points: Vec<f64>,
}

const MAX_POINTS: usize = 10_001;

impl ZGrid {
    pub const DEFAULT_MIN: f64 = -4.0;
    pub const DEFAULT_MAX: f64 = 4.0;
    pub const DEFAULT_STEP: f64 = 0.25;

    pub fn new(min: f64, max: f64, step: f64) -> Result<Self, ConfigError> {
        if !(min.is_finite() && max.is_finite() && step.is_finite()) {
            return Err(ConfigError::invalid("z_grid", "bounds and step must be finite"));
        }
        if step <= 0.0 {
            return Err(ConfigError::invalid("z_step", format!("must be > 0, got {}", step)));
        }
        if max <= min {
            return Err(ConfigError::invalid(
                "z_max",
                format!("must exceed z_min ({} <= {})", max, min),
            ));
        }

        let intervals = (max - min) / step;
        let rounded = intervals.round();
        if (intervals - rounded).abs() > 1e-9 {
            return Err(ConfigError::invalid(
                "z_step",
                format!("{} does not divide the range [{}, {}]", step, min, max),
            ));
        }
        let count = rounded as usize + 1;
        if count > MAX_POINTS {
            return Err(ConfigError::invalid(
                "z_step",
                format!("grid would have {} points (max {})", count, MAX_POINTS),
            ));
        }

        Ok(Self::build(min, max, step, count))
    }

    /// The canonical 33-point grid, -4.0 to 4.0 in steps of 0.25
    pub fn standard() -> Self {
        Self::build(Self::DEFAULT_MIN, Self::DEFAULT_MAX, Self::DEFAULT_STEP, 33)
    }

    fn build(min: f64, max: f64, step: f64, count: usize) -> Self {
        let points = (0..count).map(|i| min + i as f64 * step).collect();
        Self {
            min,
            max,
            step,
            points,
        }
    }

    pub fn points(&self) -> &[f64] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn step(&self) -> f64 {
        self.step
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    /// Index of the grid point closest to `z`, clamped to the grid edges
    pub fn nearest_index(&self, z: f64) -> usize {
        if self.points.is_empty() || !z.is_finite() {
            return self.points.len() / 2;
        }
        let raw = ((z - self.min) / self.step).round();
        raw.clamp(0.0, (self.points.len() - 1) as f64) as usize
    }
}

impl Default for ZGrid {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_grid_has_33_points() {
        let grid = ZGrid::standard();
        assert_eq!(grid.len(), 33);
        assert_eq!(grid.points()[0], -4.0);
        assert_eq!(grid.points()[16], 0.0);
        assert_eq!(grid.points()[32], 4.0);
        for pair in grid.points().windows(2) {
            assert!((pair[1] - pair[0] - 0.25).abs() < 1e-12);
        }
    }

    #[test]
    fn test_new_matches_standard() {
        let grid = ZGrid::new(-4.0, 4.0, 0.25).unwrap();
        assert_eq!(grid, ZGrid::standard());
    }

    #[test]
    fn test_nearest_index() {
        let grid = ZGrid::standard();
        assert_eq!(grid.nearest_index(0.1), 16);
        assert_eq!(grid.nearest_index(-100.0), 0);
        assert_eq!(grid.nearest_index(37.0), 32);
    }

    #[test]
    fn test_rejects_bad_grids() {
        assert!(ZGrid::new(-4.0, 4.0, 0.0).is_err());
        assert!(ZGrid::new(4.0, -4.0, 0.25).is_err());
        assert!(ZGrid::new(-4.0, 4.0, 0.3).is_err());
        assert!(ZGrid::new(f64::NAN, 4.0, 0.25).is_err());
    }
}
