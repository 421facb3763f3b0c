use crate::domain::errors::EngineError;
use statrs::distribution::{Continuous, ContinuousCDF, Normal};

/// Standard normal kernel used for density estimation and projection
#[derive(Debug, Clone, Copy)]
pub struct GaussianKernel {
    normal: Normal,
}

impl GaussianKernel {
    pub fn new() -> Result<Self, EngineError> {
        let normal = Normal::new(0.0, 1.0).map_err(|e| EngineError::Construction {
            what: "gaussian kernel",
            reason: format!("{:?}", e),
        })?;
        Ok(Self { normal })
    }

    pub fn pdf(&self, x: f64) -> f64 {
        self.normal.pdf(x)
    }

    pub fn cdf(&self, x: f64) -> f64 {
        self.normal.cdf(x)
    }
}

/// Numerically stable logistic function
pub fn logistic(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}
