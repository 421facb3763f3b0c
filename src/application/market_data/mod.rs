// Market data processing modules
pub mod timeframe_aggregator;

pub use timeframe_aggregator::TimeframeAggregator;
