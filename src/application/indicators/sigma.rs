use crate::application::statistics::Ewma;

/// Per-bar volatility: square root of the EWMA of squared log returns
#[derive(Debug, Clone)]
pub struct SigmaEstimator {
    ewma: Ewma,
    last_close: Option<f64>,
}

impl SigmaEstimator {
    pub fn new(span: usize) -> Self {
        Self {
            ewma: Ewma::new(span),
            last_close: None,
        }
    }

    /// Feeds a close; returns sigma once `span` returns have been seen
    pub fn update(&mut self, close: f64) -> Option<f64> {
        if let Some(prev) = self.last_close
            && prev > 0.0
            && close > 0.0
        {
            let r = (close / prev).ln();
            self.ewma.update(r * r);
        }
        self.last_close = Some(close);
        self.value()
    }

    pub fn value(&self) -> Option<f64> {
        self.ewma.value().map(|v| v.max(0.0).sqrt())
    }

    pub fn is_ready(&self) -> bool {
        self.ewma.is_ready()
    }
}
