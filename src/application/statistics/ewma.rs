/// Exponentially weighted moving average.
///
/// `alpha = 2 / (span + 1)`; the first sample seeds the average. The value is
/// reported as ready once `warmup` samples have been seen.
#[derive(Debug, Clone)]
pub struct Ewma {
    alpha: f64,
    warmup: usize,
    count: usize,
    value: Option<f64>,
}

impl Ewma {
    pub fn new(span: usize) -> Self {
        Self::with_warmup(span, span)
    }

    pub fn with_warmup(span: usize, warmup: usize) -> Self {
        let span = span.max(1);
        Self {
            alpha: 2.0 / (span as f64 + 1.0),
            warmup,
            count: 0,
            value: None,
        }
    }

    /// Folds in a sample and returns the value if ready
    pub fn update(&mut self, x: f64) -> Option<f64> {
        let next = match self.value {
            Some(prev) => self.alpha * x + (1.0 - self.alpha) * prev,
            None => x,
        };
        self.value = Some(next);
        self.count += 1;
        self.value()
    }

    pub fn value(&self) -> Option<f64> {
        if self.is_ready() { self.value } else { None }
    }

    /// Current average even while warming up
    pub fn raw(&self) -> Option<f64> {
        self.value
    }

    pub fn is_ready(&self) -> bool {
        self.count >= self.warmup
    }
}
