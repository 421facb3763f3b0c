use crate::application::collapse::dealer::{DealerModel, DealerParams};
use crate::application::collapse::forward_map::{ForwardMapParams, ForwardMapper};
use crate::application::collapse::hazard::{HazardModel, HazardParams};
use crate::application::collapse::kernel::GaussianKernel;
use crate::application::collapse::particle::ParticleTracker;
use crate::application::collapse::pool_field::PoolFieldEstimator;
use crate::application::statistics::RollingWindow;
use crate::config::EngineConfig;
use crate::domain::analytics::CollapseFieldSnapshot;
use crate::domain::errors::EngineError;
use crate::domain::market::{Bar, OrderFlowSignal};
use tracing::debug;

/// Collapse-field model for one symbol.
///
/// Each update consumes one validated bar plus the indicator engine's sigma
/// for that same bar, and produces the pool field, particle, dealer sign,
/// hazard and forward map. Every component is always populated; `ready`
/// reports whether all rolling windows have filled.
#[derive(Debug, Clone)]
pub struct CollapseFieldEngine {
    symbol: String,
    closes: RollingWindow,
    returns: RollingWindow,
    last_close: Option<f64>,
    pool: PoolFieldEstimator,
    particle: ParticleTracker,
    dealer: DealerModel,
    hazard: HazardModel,
    forward: ForwardMapper,
    ready: bool,
}

impl CollapseFieldEngine {
    pub fn new(symbol: impl Into<String>, config: &EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let grid = config.z_grid()?;
        let kernel = GaussianKernel::new()?;

        Ok(Self {
            symbol: symbol.into(),
            closes: RollingWindow::new(config.standardization_window),
            returns: RollingWindow::new(config.standardization_window),
            last_close: None,
            pool: PoolFieldEstimator::new(
                grid.clone(),
                config.kde_bandwidth_rule,
                config.kde_min_bandwidth,
                kernel,
            ),
            particle: ParticleTracker::new(config.velocity_lag),
            dealer: DealerModel::new(DealerParams {
                window: config.dealer_window,
                sensitivity: config.dealer_sensitivity,
                neutral_logit: config.dealer_neutral_logit,
            }),
            hazard: HazardModel::new(HazardParams {
                window: config.hazard_window,
                weight_volatility: config.hazard_weight_volatility,
                weight_volume: config.hazard_weight_volume,
                bias: config.hazard_bias,
                z_cap: config.hazard_z_cap,
            }),
            forward: ForwardMapper::new(
                ForwardMapParams {
                    horizons_minutes: config.sorted_horizons(),
                    confidence_levels: config.sorted_confidence_levels(),
                    cadence_seconds: config.data_cadence_seconds,
                    diffusion_floor: config.diffusion_floor,
                    diffusion_cap: config.diffusion_cap,
                },
                grid,
                kernel,
            ),
            ready: false,
        })
    }

    pub fn update(
        &mut self,
        bar: &Bar,
        sigma: Option<f64>,
        order_flow: Option<&OrderFlowSignal>,
    ) -> CollapseFieldSnapshot {
        let v = bar.ohlcv();

        if let Some(prev) = self.last_close
            && prev > 0.0
            && v.close > 0.0
        {
            self.returns.push((v.close / prev).ln());
        }
        self.last_close = Some(v.close);
        self.closes.push(v.close);

        let pool_field = self.pool.estimate(&self.returns);
        let particle = self.particle.update(&self.closes);
        let dealer = self.dealer.update(bar, &v, order_flow);
        let hazard = self.hazard.update(sigma, v.volume);

        let diffusion = self.forward.diffusion(sigma, v.close, self.closes.std_dev());
        let forward_map = self
            .forward
            .project(&pool_field, particle, diffusion, hazard.lambda);

        if !self.ready && self.windows_filled() {
            self.ready = true;
            debug!(
                "CollapseFieldEngine [{}]: all windows filled at {}",
                self.symbol, bar.timestamp
            );
        }

        CollapseFieldSnapshot {
            symbol: self.symbol.clone(),
            timestamp: bar.timestamp,
            pool_field,
            particle,
            dealer,
            hazard,
            forward_map,
            ready: self.ready,
        }
    }

    fn windows_filled(&self) -> bool {
        self.closes.is_ready()
            && self.returns.is_ready()
            && self.particle.is_ready()
            && self.dealer.is_ready()
            && self.hazard.is_ready()
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Hazard with no volatility or volume anomaly
    pub fn hazard_floor(&self) -> f64 {
        self.hazard.floor()
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }
}
