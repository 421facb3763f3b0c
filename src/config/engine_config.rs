//! Analytics engine parameters.
//!
//! Loaded once (from environment variables or a TOML file), validated, and
//! shared read-only as `Arc<EngineConfig>` by every symbol session.

use crate::domain::analytics::ZGrid;
use crate::domain::errors::ConfigError;
use crate::domain::market::Timeframe;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Window over which VWAP accumulates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum VwapWindow {
    /// Accumulates from the first bar of the session, never resets
    #[default]
    Session,
    /// Resets when the UTC calendar date changes
    Daily,
    /// Last N bars
    Rolling(usize),
}

impl FromStr for VwapWindow {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let lowered = s.trim().to_lowercase();
        match lowered.as_str() {
            "session" => Ok(VwapWindow::Session),
            "daily" => Ok(VwapWindow::Daily),
            other => {
                let bars = other
                    .strip_prefix("rolling:")
                    .context(format!(
                        "Invalid VWAP_WINDOW: '{}'. Must be 'session', 'daily' or 'rolling:<bars>'",
                        s
                    ))?
                    .parse::<usize>()
                    .context(format!("Invalid rolling VWAP length in '{}'", s))?;
                if bars == 0 {
                    anyhow::bail!("Rolling VWAP length must be > 0");
                }
                Ok(VwapWindow::Rolling(bars))
            }
        }
    }
}

impl fmt::Display for VwapWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VwapWindow::Session => write!(f, "session"),
            VwapWindow::Daily => write!(f, "daily"),
            VwapWindow::Rolling(bars) => write!(f, "rolling:{}", bars),
        }
    }
}

impl TryFrom<String> for VwapWindow {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<VwapWindow> for String {
    fn from(value: VwapWindow) -> Self {
        value.to_string()
    }
}

/// Rule-of-thumb for the pool-field kernel bandwidth
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BandwidthRule {
    /// 0.9 * n^(-1/5) on unit-variance data
    #[default]
    Silverman,
    /// 1.06 * n^(-1/5) on unit-variance data
    Scott,
}

impl BandwidthRule {
    /// Bandwidth for `n` standardized samples, before the minimum is applied
    pub fn bandwidth(&self, n: usize) -> f64 {
        let n = n.max(1) as f64;
        let factor = match self {
            BandwidthRule::Silverman => 0.9,
            BandwidthRule::Scott => 1.06,
        };
        factor * n.powf(-0.2)
    }
}

impl FromStr for BandwidthRule {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "silverman" => Ok(BandwidthRule::Silverman),
            "scott" => Ok(BandwidthRule::Scott),
            _ => anyhow::bail!(
                "Invalid KDE_BANDWIDTH_RULE: {}. Must be 'silverman' or 'scott'",
                s
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    // Input cadence
    pub data_cadence_seconds: u32,

    // Sigma
    pub ewma_span: usize,

    // RSI
    pub rsi_period: usize,

    // Bollinger
    pub bollinger_period: usize,
    pub bollinger_std: f64,
    pub bollinger_squeeze_lookback: usize,
    pub bollinger_squeeze_percentile: usize,
    pub bollinger_squeeze_min_history: usize,

    // VWAP
    pub vwap_window: VwapWindow,

    // Ichimoku
    pub ichimoku_timeframe_minutes: usize,
    pub ichimoku_tenkan: usize,
    pub ichimoku_kijun: usize,
    pub ichimoku_senkou_b: usize,
    pub ichimoku_displacement: usize,

    // Z-grid
    pub z_min: f64,
    pub z_max: f64,
    pub z_step: f64,

    // Forward map
    pub confidence_levels: Vec<f64>,
    pub forward_horizons_minutes: Vec<u32>,
    pub diffusion_floor: f64,
    pub diffusion_cap: f64,

    // Pool field and particle
    pub standardization_window: usize,
    pub velocity_lag: usize,
    pub kde_bandwidth_rule: BandwidthRule,
    pub kde_min_bandwidth: f64,

    // Dealer sign
    pub dealer_window: usize,
    pub dealer_sensitivity: f64,
    pub dealer_neutral_logit: f64,

    // Hazard
    pub hazard_window: usize,
    pub hazard_weight_volatility: f64,
    pub hazard_weight_volume: f64,
    pub hazard_bias: f64,
    pub hazard_z_cap: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            data_cadence_seconds: 60,
            ewma_span: 20,
            rsi_period: 14,
            bollinger_period: 20,
            bollinger_std: 2.0,
            bollinger_squeeze_lookback: 780,
            bollinger_squeeze_percentile: 15,
            bollinger_squeeze_min_history: 50,
            vwap_window: VwapWindow::Session,
            ichimoku_timeframe_minutes: 15,
            ichimoku_tenkan: 9,
            ichimoku_kijun: 26,
            ichimoku_senkou_b: 52,
            ichimoku_displacement: 26,
            z_min: ZGrid::DEFAULT_MIN,
            z_max: ZGrid::DEFAULT_MAX,
            z_step: ZGrid::DEFAULT_STEP,
            confidence_levels: vec![0.68, 0.95, 0.997],
            forward_horizons_minutes: vec![1, 5, 15, 30, 60],
            diffusion_floor: 0.02,
            diffusion_cap: 1.0,
            standardization_window: 120,
            velocity_lag: 3,
            kde_bandwidth_rule: BandwidthRule::Silverman,
            kde_min_bandwidth: 0.25,
            dealer_window: 20,
            dealer_sensitivity: 3.0,
            dealer_neutral_logit: 0.0,
            hazard_window: 60,
            hazard_weight_volatility: 1.0,
            hazard_weight_volume: 0.5,
            hazard_bias: 3.0,
            hazard_z_cap: 6.0,
        }
    }
}

impl EngineConfig {
    /// Reads every parameter from the environment, falling back to defaults
    pub fn from_env() -> Result<Self> {
        let d = Self::default();

        let vwap_window = match env::var("VWAP_WINDOW") {
            Ok(raw) => VwapWindow::from_str(&raw)?,
            Err(_) => d.vwap_window,
        };
        let kde_bandwidth_rule = match env::var("KDE_BANDWIDTH_RULE") {
            Ok(raw) => BandwidthRule::from_str(&raw)?,
            Err(_) => d.kde_bandwidth_rule,
        };

        let config = Self {
            data_cadence_seconds: Self::parse_u32(
                "DATA_CADENCE_SECONDS",
                d.data_cadence_seconds,
            )?,
            ewma_span: Self::parse_usize("EWMA_SPAN", d.ewma_span)?,
            rsi_period: Self::parse_usize("RSI_PERIOD", d.rsi_period)?,
            bollinger_period: Self::parse_usize("BOLLINGER_PERIOD", d.bollinger_period)?,
            bollinger_std: Self::parse_f64("BOLLINGER_STD", d.bollinger_std)?,
            bollinger_squeeze_lookback: Self::parse_usize(
                "BOLLINGER_SQUEEZE_LOOKBACK",
                d.bollinger_squeeze_lookback,
            )?,
            bollinger_squeeze_percentile: Self::parse_usize(
                "BOLLINGER_SQUEEZE_PERCENTILE",
                d.bollinger_squeeze_percentile,
            )?,
            bollinger_squeeze_min_history: Self::parse_usize(
                "BOLLINGER_SQUEEZE_MIN_HISTORY",
                d.bollinger_squeeze_min_history,
            )?,
            vwap_window,
            ichimoku_timeframe_minutes: Self::parse_usize(
                "ICHIMOKU_TIMEFRAME_MINUTES",
                d.ichimoku_timeframe_minutes,
            )?,
            ichimoku_tenkan: Self::parse_usize("ICHIMOKU_TENKAN", d.ichimoku_tenkan)?,
            ichimoku_kijun: Self::parse_usize("ICHIMOKU_KIJUN", d.ichimoku_kijun)?,
            ichimoku_senkou_b: Self::parse_usize("ICHIMOKU_SENKOU_B", d.ichimoku_senkou_b)?,
            ichimoku_displacement: Self::parse_usize(
                "ICHIMOKU_DISPLACEMENT",
                d.ichimoku_displacement,
            )?,
            z_min: Self::parse_f64("Z_MIN", d.z_min)?,
            z_max: Self::parse_f64("Z_MAX", d.z_max)?,
            z_step: Self::parse_f64("Z_STEP", d.z_step)?,
            confidence_levels: Self::parse_list("CONFIDENCE_LEVELS", d.confidence_levels)?,
            forward_horizons_minutes: Self::parse_list(
                "FORWARD_HORIZONS_MINUTES",
                d.forward_horizons_minutes,
            )?,
            diffusion_floor: Self::parse_f64("DIFFUSION_FLOOR", d.diffusion_floor)?,
            diffusion_cap: Self::parse_f64("DIFFUSION_CAP", d.diffusion_cap)?,
            standardization_window: Self::parse_usize(
                "STANDARDIZATION_WINDOW",
                d.standardization_window,
            )?,
            velocity_lag: Self::parse_usize("VELOCITY_LAG", d.velocity_lag)?,
            kde_bandwidth_rule,
            kde_min_bandwidth: Self::parse_f64("KDE_MIN_BANDWIDTH", d.kde_min_bandwidth)?,
            dealer_window: Self::parse_usize("DEALER_WINDOW", d.dealer_window)?,
            dealer_sensitivity: Self::parse_f64("DEALER_SENSITIVITY", d.dealer_sensitivity)?,
            dealer_neutral_logit: Self::parse_f64(
                "DEALER_NEUTRAL_LOGIT",
                d.dealer_neutral_logit,
            )?,
            hazard_window: Self::parse_usize("HAZARD_WINDOW", d.hazard_window)?,
            hazard_weight_volatility: Self::parse_f64(
                "HAZARD_WEIGHT_VOLATILITY",
                d.hazard_weight_volatility,
            )?,
            hazard_weight_volume: Self::parse_f64(
                "HAZARD_WEIGHT_VOLUME",
                d.hazard_weight_volume,
            )?,
            hazard_bias: Self::parse_f64("HAZARD_BIAS", d.hazard_bias)?,
            hazard_z_cap: Self::parse_f64("HAZARD_Z_CAP", d.hazard_z_cap)?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Parses a TOML document; missing keys take their defaults
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw).context("Failed to parse engine config TOML")?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .context(format!("Failed to read engine config {}", path.display()))?;
        Self::from_toml_str(&raw)
    }

    pub fn z_grid(&self) -> Result<ZGrid, ConfigError> {
        ZGrid::new(self.z_min, self.z_max, self.z_step)
    }

    pub fn ichimoku_timeframe(&self) -> Result<Timeframe, ConfigError> {
        Timeframe::from_minutes(self.ichimoku_timeframe_minutes)
            .map_err(|e| ConfigError::invalid("ichimoku_timeframe_minutes", e.to_string()))
    }

    /// Confidence levels sorted ascending
    pub fn sorted_confidence_levels(&self) -> Vec<f64> {
        let mut levels = self.confidence_levels.clone();
        levels.sort_by(f64::total_cmp);
        levels.dedup();
        levels
    }

    /// Forward horizons sorted ascending, duplicates removed
    pub fn sorted_horizons(&self) -> Vec<u32> {
        let mut horizons = self.forward_horizons_minutes.clone();
        horizons.sort_unstable();
        horizons.dedup();
        horizons
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("data_cadence_seconds", self.data_cadence_seconds as usize),
            ("ewma_span", self.ewma_span),
            ("rsi_period", self.rsi_period),
            ("bollinger_period", self.bollinger_period),
            ("bollinger_squeeze_lookback", self.bollinger_squeeze_lookback),
            ("ichimoku_tenkan", self.ichimoku_tenkan),
            ("ichimoku_kijun", self.ichimoku_kijun),
            ("ichimoku_senkou_b", self.ichimoku_senkou_b),
            ("ichimoku_displacement", self.ichimoku_displacement),
            ("velocity_lag", self.velocity_lag),
            ("dealer_window", self.dealer_window),
            ("hazard_window", self.hazard_window),
        ];
        for (field, value) in positive {
            if value == 0 {
                return Err(ConfigError::invalid(field, "must be > 0"));
            }
        }

        if self.standardization_window < 2 {
            return Err(ConfigError::invalid("standardization_window", "must be >= 2"));
        }
        if self.bollinger_squeeze_percentile > 100 {
            return Err(ConfigError::invalid(
                "bollinger_squeeze_percentile",
                "must be within 0..=100",
            ));
        }
        if !(self.bollinger_std.is_finite() && self.bollinger_std >= 0.0) {
            return Err(ConfigError::invalid("bollinger_std", "must be finite and >= 0"));
        }

        self.ichimoku_timeframe()?;
        self.z_grid()?;

        if self.confidence_levels.is_empty() {
            return Err(ConfigError::invalid("confidence_levels", "must not be empty"));
        }
        if let Some(level) = self
            .confidence_levels
            .iter()
            .find(|c| !(**c > 0.0 && **c < 1.0))
        {
            return Err(ConfigError::invalid(
                "confidence_levels",
                format!("{} is outside (0, 1)", level),
            ));
        }
        if self.forward_horizons_minutes.is_empty() || self.forward_horizons_minutes.contains(&0) {
            return Err(ConfigError::invalid(
                "forward_horizons_minutes",
                "must be non-empty and strictly positive",
            ));
        }

        if !(self.kde_min_bandwidth.is_finite() && self.kde_min_bandwidth > 0.0) {
            return Err(ConfigError::invalid("kde_min_bandwidth", "must be > 0"));
        }
        if !(self.diffusion_floor.is_finite() && self.diffusion_floor > 0.0) {
            return Err(ConfigError::invalid("diffusion_floor", "must be > 0"));
        }
        if !(self.diffusion_cap.is_finite() && self.diffusion_cap >= self.diffusion_floor) {
            return Err(ConfigError::invalid(
                "diffusion_cap",
                "must be finite and >= diffusion_floor",
            ));
        }

        for (field, value) in [
            ("dealer_sensitivity", self.dealer_sensitivity),
            ("hazard_weight_volatility", self.hazard_weight_volatility),
            ("hazard_weight_volume", self.hazard_weight_volume),
            ("hazard_z_cap", self.hazard_z_cap),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ConfigError::invalid(field, "must be finite and >= 0"));
            }
        }
        for (field, value) in [
            ("dealer_neutral_logit", self.dealer_neutral_logit),
            ("hazard_bias", self.hazard_bias),
        ] {
            if !value.is_finite() {
                return Err(ConfigError::invalid(field, "must be finite"));
            }
        }

        Ok(())
    }

    fn parse_usize(key: &str, default: usize) -> Result<usize> {
        env::var(key)
            .unwrap_or_else(|_| default.to_string())
            .parse::<usize>()
            .context(format!("Failed to parse {}", key))
    }

    fn parse_u32(key: &str, default: u32) -> Result<u32> {
        match env::var(key) {
            Ok(raw) => Self::parse_u32_value(key, &raw),
            Err(_) => Ok(default),
        }
    }

    fn parse_u32_value(key: &str, raw: &str) -> Result<u32> {
        raw.trim()
            .parse::<u32>()
            .context(format!("Failed to parse {}", key))
    }

    fn parse_f64(key: &str, default: f64) -> Result<f64> {
        env::var(key)
            .unwrap_or_else(|_| default.to_string())
            .parse::<f64>()
            .context(format!("Failed to parse {}", key))
    }

    fn parse_list<T>(key: &str, default: Vec<T>) -> Result<Vec<T>>
    where
        T: FromStr,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        match env::var(key) {
            Ok(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| s.parse::<T>().context(format!("Failed to parse {} entry '{}'", key, s)))
                .collect(),
            Err(_) => Ok(default),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.z_grid().unwrap().len(), 33);
        assert_eq!(config.ichimoku_timeframe().unwrap(), Timeframe::FifteenMin);
    }

    #[test]
    fn test_cadence_rejects_out_of_range_values() {
        assert_eq!(
            EngineConfig::parse_u32_value("DATA_CADENCE_SECONDS", "30").unwrap(),
            30
        );
        assert!(EngineConfig::parse_u32_value("DATA_CADENCE_SECONDS", "4294967356").is_err());
        assert!(EngineConfig::parse_u32_value("DATA_CADENCE_SECONDS", "-60").is_err());
    }

    #[test]
    fn test_toml_overrides_and_defaults() {
        let config = EngineConfig::from_toml_str(
            r#"
            ewma_span = 30
            vwap_window = "rolling:390"
            kde_bandwidth_rule = "scott"
            forward_horizons_minutes = [5, 1]
            "#,
        )
        .unwrap();

        assert_eq!(config.ewma_span, 30);
        assert_eq!(config.vwap_window, VwapWindow::Rolling(390));
        assert_eq!(config.kde_bandwidth_rule, BandwidthRule::Scott);
        assert_eq!(config.sorted_horizons(), vec![1, 5]);
        assert_eq!(config.rsi_period, 14);
    }

    #[test]
    fn test_shipped_sample_matches_defaults() {
        let config = EngineConfig::from_toml_str(include_str!("../../config/engine.toml")).unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_rejects_negative_hazard_weight() {
        let config = EngineConfig {
            hazard_weight_volatility: -1.0,
            ..EngineConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid {
                field: "hazard_weight_volatility",
                ..
            })
        ));
    }

    #[test]
    fn test_rejects_bad_confidence_level() {
        let config = EngineConfig {
            confidence_levels: vec![0.68, 1.0],
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_unsupported_ichimoku_timeframe() {
        let config = EngineConfig {
            ichimoku_timeframe_minutes: 7,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_vwap_window_parsing() {
        assert_eq!(VwapWindow::from_str("Session").unwrap(), VwapWindow::Session);
        assert_eq!(VwapWindow::from_str("daily").unwrap(), VwapWindow::Daily);
        assert_eq!(VwapWindow::from_str("rolling:30").unwrap(), VwapWindow::Rolling(30));
        assert!(VwapWindow::from_str("rolling:0").is_err());
        assert!(VwapWindow::from_str("weekly").is_err());
        assert_eq!(VwapWindow::Rolling(30).to_string(), "rolling:30");
    }

    #[test]
    fn test_bandwidth_rules() {
        let silverman = BandwidthRule::Silverman.bandwidth(100);
        let scott = BandwidthRule::Scott.bandwidth(100);
        assert!((silverman - 0.9 * 100f64.powf(-0.2)).abs() < 1e-12);
        assert!(scott > silverman);
        assert!(BandwidthRule::Silverman.bandwidth(0).is_finite());
    }
}
