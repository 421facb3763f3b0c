use rust_decimal::Decimal;
use thiserror::Error;

/// Reasons a bar is rejected before it reaches the engines
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Symbol mismatch: session {expected} received bar for {actual}")]
    SymbolMismatch { expected: String, actual: String },

    #[error("Non-positive price component for {symbol} at {timestamp}")]
    NonPositivePrice { symbol: String, timestamp: i64 },

    #[error("OHLC ordering violated for {symbol} at {timestamp}: low {low}, open {open}, close {close}, high {high}")]
    OhlcOrdering {
        symbol: String,
        timestamp: i64,
        open: Decimal,
        high: Decimal,
        low: Decimal,
        close: Decimal,
    },

    #[error("Negative volume for {symbol} at {timestamp}: {volume}")]
    NegativeVolume {
        symbol: String,
        timestamp: i64,
        volume: Decimal,
    },

    #[error("Invalid quote for {symbol} at {timestamp}: {reason}")]
    InvalidQuote {
        symbol: String,
        timestamp: i64,
        reason: String,
    },

    #[error("Out-of-order bar for {symbol}: {timestamp} <= last accepted {previous}")]
    NonMonotonicTimestamp {
        symbol: String,
        previous: i64,
        timestamp: i64,
    },
}

impl ValidationError {
    /// Short, stable label used for metrics
    pub fn reason(&self) -> &'static str {
        match self {
            ValidationError::SymbolMismatch { .. } => "symbol_mismatch",
            ValidationError::NonPositivePrice { .. } => "non_positive_price",
            ValidationError::OhlcOrdering { .. } => "ohlc_ordering",
            ValidationError::NegativeVolume { .. } => "negative_volume",
            ValidationError::InvalidQuote { .. } => "invalid_quote",
            ValidationError::NonMonotonicTimestamp { .. } => "non_monotonic_timestamp",
        }
    }
}

/// Errors raised while validating engine parameters
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ConfigError {
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// Errors raised while constructing an engine
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to build {what}: {reason}")]
    Construction { what: &'static str, reason: String },
}

/// Errors raised by the per-symbol worker pool
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Session worker for {symbol} is no longer running")]
    WorkerClosed { symbol: String },

    #[error(transparent)]
    Engine(#[from] EngineError),
}
