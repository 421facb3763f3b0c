/// Wilder's smoothing (RMA).
///
/// Seeds with the simple average of the first `period` samples, then
/// `avg = (avg * (period - 1) + x) / period`.
#[derive(Debug, Clone)]
pub struct WilderSmoother {
    period: usize,
    count: usize,
    seed_sum: f64,
    value: Option<f64>,
}

impl WilderSmoother {
    pub fn new(period: usize) -> Self {
        Self {
            period: period.max(1),
            count: 0,
            seed_sum: 0.0,
            value: None,
        }
    }

    pub fn update(&mut self, x: f64) -> Option<f64> {
        self.count += 1;
        match self.value {
            Some(avg) => {
                let p = self.period as f64;
                self.value = Some((avg * (p - 1.0) + x) / p);
            }
            None => {
                self.seed_sum += x;
                if self.count == self.period {
                    self.value = Some(self.seed_sum / self.period as f64);
                }
            }
        }
        self.value
    }

    pub fn value(&self) -> Option<f64> {
        self.value
    }

    pub fn is_ready(&self) -> bool {
        self.value.is_some()
    }

    pub fn period(&self) -> usize {
        self.period
    }
}
