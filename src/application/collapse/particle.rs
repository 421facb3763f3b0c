use crate::application::statistics::RollingWindow;
use crate::domain::analytics::Particle;
use std::collections::VecDeque;

const DEGENERATE_EPS: f64 = 1e-12;

/// Tracks the standardized price location and its finite-difference velocity
#[derive(Debug, Clone)]
pub struct ParticleTracker {
    lag: usize,
    positions: VecDeque<f64>,
}

impl ParticleTracker {
    pub fn new(lag: usize) -> Self {
        let lag = lag.max(1);
        Self {
            lag,
            positions: VecDeque::with_capacity(lag + 1),
        }
    }

    /// `closes` must already contain the latest close
    pub fn update(&mut self, closes: &RollingWindow) -> Particle {
        let position = match (closes.last(), closes.mean(), closes.std_dev()) {
            (Some(close), Some(mean), Some(sd)) if sd > DEGENERATE_EPS => (close - mean) / sd,
            _ => 0.0,
        };

        self.positions.push_back(position);
        if self.positions.len() > self.lag + 1 {
            self.positions.pop_front();
        }

        // Until `lag` steps exist, difference against the oldest position held
        let steps = self.positions.len() - 1;
        let velocity = match self.positions.front() {
            Some(&oldest) if steps > 0 => (position - oldest) / steps as f64,
            _ => 0.0,
        };

        Particle { position, velocity }
    }

    pub fn is_ready(&self) -> bool {
        self.positions.len() > self.lag
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_prices_sit_at_zero() {
        let mut closes = RollingWindow::new(10);
        let mut tracker = ParticleTracker::new(3);
        let mut particle = Particle::default();
        for _ in 0..10 {
            closes.push(100.0);
            particle = tracker.update(&closes);
        }
        assert_eq!(particle.position, 0.0);
        assert_eq!(particle.velocity, 0.0);
        assert!(tracker.is_ready());
    }

    #[test]
    fn test_rising_prices_have_positive_velocity() {
        let mut closes = RollingWindow::new(60);
        let mut tracker = ParticleTracker::new(3);
        let mut particle = Particle::default();
        for i in 0..20 {
            closes.push(100.0 + i as f64);
            particle = tracker.update(&closes);
        }
        assert!(particle.position > 0.0);
        assert!(particle.velocity > 0.0);
    }

    #[test]
    fn test_first_update_has_no_velocity() {
        let mut closes = RollingWindow::new(5);
        let mut tracker = ParticleTracker::new(3);
        closes.push(100.0);
        let particle = tracker.update(&closes);
        assert_eq!(particle.velocity, 0.0);
        assert!(!tracker.is_ready());
    }
}
