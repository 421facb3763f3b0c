use statrs::statistics::Statistics;
use std::collections::VecDeque;

const DEGENERATE_EPS: f64 = 1e-12;

/// Fixed-length window over the most recent observations
#[derive(Debug, Clone)]
pub struct RollingWindow {
    capacity: usize,
    values: VecDeque<f64>,
}

impl RollingWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            values: VecDeque::with_capacity(capacity),
        }
    }

    /// Appends `x`, returning the evicted oldest value once full
    pub fn push(&mut self, x: f64) -> Option<f64> {
        let evicted = if self.values.len() == self.capacity {
            self.values.pop_front()
        } else {
            None
        };
        self.values.push_back(x);
        evicted
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_ready(&self) -> bool {
        self.values.len() >= self.capacity
    }

    pub fn last(&self) -> Option<f64> {
        self.values.back().copied()
    }

    /// Oldest-first view of the window
    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.values.iter().copied()
    }

    pub fn to_vec(&self) -> Vec<f64> {
        self.values.iter().copied().collect()
    }

    pub fn sum(&self) -> f64 {
        self.values.iter().sum()
    }

    pub fn mean(&self) -> Option<f64> {
        if self.values.is_empty() {
            return None;
        }
        Some(Statistics::mean(self.values.iter()))
    }

    /// Population standard deviation
    pub fn std_dev(&self) -> Option<f64> {
        if self.values.is_empty() {
            return None;
        }
        let sd = Statistics::population_std_dev(self.values.iter());
        Some(if sd.is_finite() { sd.max(0.0) } else { 0.0 })
    }

    pub fn min(&self) -> Option<f64> {
        if self.values.is_empty() {
            return None;
        }
        Some(Statistics::min(self.values.iter()))
    }

    pub fn max(&self) -> Option<f64> {
        if self.values.is_empty() {
            return None;
        }
        Some(Statistics::max(self.values.iter()))
    }

    /// Standardizes `x` against the current contents, clamped to `±cap`.
    ///
    /// Returns 0 for an empty window or when both the spread and the
    /// deviation from the mean are negligible; a deviation against a zero
    /// spread saturates at the cap.
    pub fn zscore(&self, x: f64, cap: f64) -> f64 {
        let (Some(mean), Some(sd)) = (self.mean(), self.std_dev()) else {
            return 0.0;
        };
        let deviation = x - mean;
        if sd <= DEGENERATE_EPS {
            if deviation.abs() <= DEGENERATE_EPS * mean.abs().max(1.0) {
                return 0.0;
            }
            return cap.copysign(deviation);
        }
        (deviation / sd).clamp(-cap, cap)
    }
}
