use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Aggregation interval for higher-timeframe indicators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    OneMin,
    FiveMin,
    FifteenMin,
    ThirtyMin,
    OneHour,
    FourHour,
    OneDay,
}

impl Timeframe {
    /// Returns the duration of this timeframe in minutes
    pub fn to_minutes(&self) -> usize {
        match self {
            Timeframe::OneMin => 1,
            Timeframe::FiveMin => 5,
            Timeframe::FifteenMin => 15,
            Timeframe::ThirtyMin => 30,
            Timeframe::OneHour => 60,
            Timeframe::FourHour => 240,
            Timeframe::OneDay => 1440,
        }
    }

    /// Returns the duration in seconds
    pub fn to_seconds(&self) -> i64 {
        (self.to_minutes() * 60) as i64
    }

    /// Maps a minute count back to a supported timeframe
    pub fn from_minutes(minutes: usize) -> Result<Self> {
        Self::all()
            .into_iter()
            .find(|tf| tf.to_minutes() == minutes)
            .ok_or_else(|| anyhow!("Unsupported timeframe: {} minutes", minutes))
    }

    /// Returns all available timeframes in ascending order
    pub fn all() -> Vec<Timeframe> {
        vec![
            Timeframe::OneMin,
            Timeframe::FiveMin,
            Timeframe::FifteenMin,
            Timeframe::ThirtyMin,
            Timeframe::OneHour,
            Timeframe::FourHour,
            Timeframe::OneDay,
        ]
    }

    /// Checks if a timestamp (ms) is the first instant of a period
    pub fn is_period_start(&self, timestamp_ms: i64) -> bool {
        self.period_start(timestamp_ms) == timestamp_ms
    }

    /// Returns the start timestamp (ms) of the period containing `timestamp_ms`.
    ///
    /// Periods are aligned to the Unix epoch, so daily periods start at midnight UTC.
    pub fn period_start(&self, timestamp_ms: i64) -> i64 {
        let period_ms = self.to_seconds() * 1000;
        timestamp_ms - timestamp_ms.rem_euclid(period_ms)
    }

    /// Number of one-minute bars that fill `periods` aligned periods of this timeframe
    pub fn base_bars_for(&self, periods: usize) -> usize {
        periods * self.to_minutes()
    }
}

impl FromStr for Timeframe {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "1m" | "1min" | "onemin" => Ok(Timeframe::OneMin),
            "5m" | "5min" | "fivemin" => Ok(Timeframe::FiveMin),
            "15m" | "15min" | "fifteenmin" => Ok(Timeframe::FifteenMin),
            "30m" | "30min" | "thirtymin" => Ok(Timeframe::ThirtyMin),
            "1h" | "1hour" | "onehour" => Ok(Timeframe::OneHour),
            "4h" | "4hour" | "fourhour" => Ok(Timeframe::FourHour),
            "1d" | "1day" | "oneday" => Ok(Timeframe::OneDay),
            other => match other.parse::<usize>() {
                Ok(minutes) => Self::from_minutes(minutes),
                Err(_) => Err(anyhow!(
                    "Invalid timeframe: '{}'. Valid options: 1Min, 5Min, 15Min, 30Min, 1Hour, 4Hour, 1Day",
                    s
                )),
            },
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Timeframe::OneMin => "1Min",
            Timeframe::FiveMin => "5Min",
            Timeframe::FifteenMin => "15Min",
            Timeframe::ThirtyMin => "30Min",
            Timeframe::OneHour => "1Hour",
            Timeframe::FourHour => "4Hour",
            Timeframe::OneDay => "1Day",
        };
        write!(f, "{}", label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_minutes() {
        assert_eq!(Timeframe::OneMin.to_minutes(), 1);
        assert_eq!(Timeframe::FifteenMin.to_minutes(), 15);
        assert_eq!(Timeframe::OneDay.to_minutes(), 1440);
    }

    #[test]
    fn test_from_str() {
        assert_eq!(Timeframe::from_str("15m").unwrap(), Timeframe::FifteenMin);
        assert_eq!(Timeframe::from_str("15Min").unwrap(), Timeframe::FifteenMin);
        assert_eq!(Timeframe::from_str("15").unwrap(), Timeframe::FifteenMin);
        assert_eq!(Timeframe::from_str("1h").unwrap(), Timeframe::OneHour);
        assert!(Timeframe::from_str("7").is_err());
        assert!(Timeframe::from_str("invalid").is_err());
    }

    #[test]
    fn test_period_start() {
        let tf = Timeframe::FifteenMin;
        // 2024-01-01 00:00:00 UTC
        let base = 1704067200000i64;

        assert_eq!(tf.period_start(base), base);
        assert_eq!(tf.period_start(base + 14 * 60 * 1000), base);
        assert_eq!(tf.period_start(base + 15 * 60 * 1000), base + 15 * 60 * 1000);
        assert_eq!(tf.period_start(base + 29 * 60 * 1000 + 59_999), base + 15 * 60 * 1000);
    }

    #[test]
    fn test_is_period_start() {
        let tf = Timeframe::FiveMin;
        let base = 1704067200000i64;

        assert!(tf.is_period_start(base));
        assert!(tf.is_period_start(base + 5 * 60 * 1000));
        assert!(!tf.is_period_start(base + 3 * 60 * 1000));
    }

    #[test]
    fn test_base_bars_for() {
        assert_eq!(Timeframe::FifteenMin.base_bars_for(52), 780);
    }
}
