use crate::application::statistics::RollingWindow;
use crate::domain::analytics::{DealerSign, ImbalanceSource};
use crate::domain::market::order_flow::{close_location_value, quote_skew};
use crate::domain::market::{Bar, Ohlcv, OrderFlowSignal};

#[derive(Debug, Clone)]
pub struct DealerParams {
    pub window: usize,
    /// Logit gain applied to the imbalance score
    pub sensitivity: f64,
    /// Fixed logit of the "no absorption" outcome
    pub neutral_logit: f64,
}

/// Estimates dealer absorption probabilities from customer imbalance.
///
/// Bar-derived scores (quote skew when the bar is quoted, close-location
/// value otherwise) are volume-weighted over a rolling window. An aligned
/// order-flow signal takes precedence over the bar-derived score.
#[derive(Debug, Clone)]
pub struct DealerModel {
    params: DealerParams,
    weighted_scores: RollingWindow,
    volumes: RollingWindow,
    scores: RollingWindow,
}

impl DealerModel {
    pub fn new(params: DealerParams) -> Self {
        Self {
            weighted_scores: RollingWindow::new(params.window),
            volumes: RollingWindow::new(params.window),
            scores: RollingWindow::new(params.window),
            params,
        }
    }

    pub fn update(
        &mut self,
        bar: &Bar,
        values: &Ohlcv,
        order_flow: Option<&OrderFlowSignal>,
    ) -> DealerSign {
        let (score, bar_source) = match bar.quote_sizes() {
            Some((bid_size, ask_size)) if bid_size + ask_size > 0.0 => {
                (quote_skew(bid_size, ask_size), ImbalanceSource::QuoteSkew)
            }
            _ => (close_location_value(values), ImbalanceSource::CloseLocation),
        };
        let volume = values.volume.max(0.0);
        self.weighted_scores.push(score * volume);
        self.volumes.push(volume);
        self.scores.push(score);

        let (imbalance, source) = match order_flow {
            Some(signal) => (signal.imbalance(), ImbalanceSource::OrderFlow),
            None => (self.rolling_imbalance(), bar_source),
        };

        self.sign(imbalance, source)
    }

    fn rolling_imbalance(&self) -> f64 {
        let total_volume = self.volumes.sum();
        if total_volume > 0.0 {
            self.weighted_scores.sum() / total_volume
        } else {
            self.scores.mean().unwrap_or(0.0)
        }
    }

    pub fn sign(&self, imbalance: f64, source: ImbalanceSource) -> DealerSign {
        let imbalance = if imbalance.is_finite() {
            imbalance.clamp(-1.0, 1.0)
        } else {
            0.0
        };
        let (p, q, neutral) =
            absorption_probabilities(imbalance, self.params.sensitivity, self.params.neutral_logit);
        DealerSign {
            p,
            q,
            neutral,
            imbalance,
            source,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.volumes.is_ready()
    }
}

/// Three-way softmax over {buy absorption, sell absorption, neutral}.
///
/// Returns `(p, q, neutral)`: `q` grows with net customer buying, `p` with
/// net selling. The three always sum to one, so `p + q <= 1`.
pub fn absorption_probabilities(imbalance: f64, sensitivity: f64, neutral_logit: f64) -> (f64, f64, f64) {
    let logits = [sensitivity * imbalance, -sensitivity * imbalance, neutral_logit];
    let max = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let weights = logits.map(|l| (l - max).exp());
    let total: f64 = weights.iter().sum();
    let q = weights[0] / total;
    let p = weights[1] / total;
    let neutral = weights[2] / total;
    (p.clamp(0.0, 1.0), q.clamp(0.0, 1.0), neutral.clamp(0.0, 1.0))
}
