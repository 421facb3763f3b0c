// Rolling statistics primitives
pub mod statistics;

// Bar aggregation for higher timeframes
pub mod market_data;

// Classical indicators
pub mod indicators;

// Collapse field model
pub mod collapse;

// Per-symbol sessions and the worker pool
pub mod session;
