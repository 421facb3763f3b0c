//! Indicator engine: Sigma, VWAP, RSI, Bollinger and higher-timeframe Ichimoku.

pub mod bollinger;
pub mod engine;
pub mod ichimoku;
pub mod rsi;
pub mod sigma;
pub mod vwap;

pub use engine::IndicatorEngine;
