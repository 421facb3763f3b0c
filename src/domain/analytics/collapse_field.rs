use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Microstructure model state for one symbol at one bar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollapseFieldSnapshot {
    pub symbol: String,
    pub timestamp: i64,
    pub pool_field: PoolField,
    pub particle: Particle,
    pub dealer: DealerSign,
    pub hazard: Hazard,
    /// Keyed by horizon in minutes
    pub forward_map: BTreeMap<u32, ForwardProjection>,
    /// Every rolling window of the collapse-field engine is filled
    pub ready: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FieldPoint {
    pub z: f64,
    pub density: f64,
}

/// Liquidity density L(z) over the z-grid, normalized to unit mass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolField {
    pub points: Vec<FieldPoint>,
    /// Kernel bandwidth used, in z units
    pub bandwidth: f64,
    /// Number of standardized returns the estimate was built from
    pub sample_count: usize,
}

impl PoolField {
    pub fn total_mass(&self) -> f64 {
        self.points.iter().map(|p| p.density).sum()
    }

    pub fn density_at(&self, z: f64) -> Option<f64> {
        self.points
            .iter()
            .find(|p| (p.z - z).abs() < 1e-9)
            .map(|p| p.density)
    }

    /// Mass-weighted mean of the grid coordinates
    pub fn mean(&self) -> f64 {
        let mass = self.total_mass();
        if mass <= 0.0 {
            return 0.0;
        }
        self.points.iter().map(|p| p.z * p.density).sum::<f64>() / mass
    }

    pub fn variance(&self) -> f64 {
        let mass = self.total_mass();
        if mass <= 0.0 {
            return 0.0;
        }
        let mean = self.mean();
        self.points
            .iter()
            .map(|p| (p.z - mean).powi(2) * p.density)
            .sum::<f64>()
            / mass
    }
}

/// Standardized price location A(t) and its rate of change
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Particle {
    pub position: f64,
    pub velocity: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImbalanceSource {
    OrderFlow,
    QuoteSkew,
    CloseLocation,
}

/// Dealer absorption probabilities.
///
/// `q` is the probability dealers are absorbing buy pressure, `p` sell
/// pressure; the remaining `neutral` mass makes the three sum to one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DealerSign {
    pub p: f64,
    pub q: f64,
    pub neutral: f64,
    /// Net customer pressure in [-1, 1] that produced `p` and `q`
    pub imbalance: f64,
    pub source: ImbalanceSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hazard {
    /// Per-bar probability of a regime change, in [0, 1]
    pub lambda: f64,
    pub z_volatility: f64,
    pub z_volume: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    pub level: f64,
    pub z_low: f64,
    pub z_high: f64,
}

impl ConfidenceInterval {
    pub fn width(&self) -> f64 {
        self.z_high - self.z_low
    }

    pub fn contains(&self, other: &ConfidenceInterval) -> bool {
        self.z_low <= other.z_low + 1e-12 && other.z_high <= self.z_high + 1e-12
    }
}

/// Projected distribution of the particle position at one horizon
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForwardProjection {
    pub horizon_minutes: u32,
    /// Expected position: position + velocity * horizon (in bars)
    pub center: f64,
    /// Standard deviation of the projected distribution
    pub spread: f64,
    /// Probability of no regime change before the horizon
    pub survival: f64,
    /// Projected density on the z-grid, normalized to unit mass
    pub density: Vec<FieldPoint>,
    /// Sorted by ascending level
    pub intervals: Vec<ConfidenceInterval>,
}

impl ForwardProjection {
    pub fn interval(&self, level: f64) -> Option<&ConfidenceInterval> {
        self.intervals
            .iter()
            .find(|ci| (ci.level - level).abs() < 1e-9)
    }
}
