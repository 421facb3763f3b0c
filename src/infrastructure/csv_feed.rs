use crate::domain::market::{Bar, BarEnvelope, OrderFlowSignal};
use crate::domain::ports::BarFeed;
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::DateTime;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tokio::sync::mpsc::{self, Receiver};
use tracing::{info, warn};

/// One row of a bar file.
///
/// Quote and order-flow columns are optional; an empty cell or a missing
/// column reads as absent.
#[derive(Debug, Deserialize)]
struct BarRecord {
    symbol: String,
    timestamp: String,
    open: String,
    high: String,
    low: String,
    close: String,
    volume: String,
    #[serde(default)]
    bid: Option<String>,
    #[serde(default)]
    ask: Option<String>,
    #[serde(default)]
    bid_size: Option<String>,
    #[serde(default)]
    ask_size: Option<String>,
    #[serde(default)]
    call_premium: Option<String>,
    #[serde(default)]
    put_premium: Option<String>,
    #[serde(default)]
    bullish_sweeps: Option<u32>,
    #[serde(default)]
    bearish_sweeps: Option<u32>,
}

fn parse_decimal(field: &str, value: &str) -> Result<Decimal> {
    Decimal::from_str(value.trim()).with_context(|| format!("Failed to parse {} '{}'", field, value))
}

fn parse_optional(field: &str, value: &Option<String>) -> Result<Option<Decimal>> {
    match value.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => parse_decimal(field, v).map(Some),
    }
}

/// Unix milliseconds, or an RFC 3339 date-time
fn parse_timestamp(value: &str) -> Result<i64> {
    let value = value.trim();
    if let Ok(ms) = value.parse::<i64>() {
        return Ok(ms);
    }
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.timestamp_millis())
        .with_context(|| format!("Failed to parse timestamp '{}'", value))
}

impl BarRecord {
    fn into_envelope(self) -> Result<BarEnvelope> {
        let symbol = self.symbol.trim().to_uppercase();
        let timestamp = parse_timestamp(&self.timestamp)?;

        let mut bar = Bar::new(
            symbol.clone(),
            timestamp,
            parse_decimal("open", &self.open)?,
            parse_decimal("high", &self.high)?,
            parse_decimal("low", &self.low)?,
            parse_decimal("close", &self.close)?,
            parse_decimal("volume", &self.volume)?,
        );
        bar.bid = parse_optional("bid", &self.bid)?;
        bar.ask = parse_optional("ask", &self.ask)?;
        bar.bid_size = parse_optional("bid_size", &self.bid_size)?;
        bar.ask_size = parse_optional("ask_size", &self.ask_size)?;

        let call = parse_optional("call_premium", &self.call_premium)?;
        let put = parse_optional("put_premium", &self.put_premium)?;
        let has_flow = call.is_some()
            || put.is_some()
            || self.bullish_sweeps.is_some()
            || self.bearish_sweeps.is_some();

        let mut envelope = BarEnvelope::new(bar);
        if has_flow {
            envelope = envelope.with_order_flow(OrderFlowSignal {
                symbol,
                timestamp,
                call_premium: call.unwrap_or(Decimal::ZERO),
                put_premium: put.unwrap_or(Decimal::ZERO),
                bullish_sweeps: self.bullish_sweeps.unwrap_or(0),
                bearish_sweeps: self.bearish_sweeps.unwrap_or(0),
            });
        }
        Ok(envelope)
    }
}

/// Bar feed backed by a CSV file, used for replay and offline runs
#[derive(Debug, Clone)]
pub struct CsvBarFeed {
    path: PathBuf,
}

impl CsvBarFeed {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Reads every row of the file, ordered by timestamp (stable within a minute)
    pub fn load(path: &Path) -> Result<Vec<BarEnvelope>> {
        let file = File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
        Self::parse(BufReader::new(file)).with_context(|| format!("Failed to read {:?}", path))
    }

    pub fn parse<R: Read>(reader: R) -> Result<Vec<BarEnvelope>> {
        let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let mut envelopes = Vec::new();

        for (row, result) in rdr.deserialize().enumerate() {
            let record: BarRecord = result.with_context(|| format!("Malformed row {}", row + 1))?;
            let envelope = record
                .into_envelope()
                .map_err(|e| anyhow!("Row {}: {:#}", row + 1, e))?;
            envelopes.push(envelope);
        }

        envelopes.sort_by_key(|e| e.bar.timestamp);
        Ok(envelopes)
    }
}

#[async_trait]
impl BarFeed for CsvBarFeed {
    async fn subscribe(&self, symbols: Vec<String>) -> Result<Receiver<BarEnvelope>> {
        let envelopes = Self::load(&self.path)?;
        let (tx, rx) = mpsc::channel(256);

        let total = envelopes.len();
        let selected: Vec<BarEnvelope> = envelopes
            .into_iter()
            .filter(|e| symbols.is_empty() || symbols.iter().any(|s| s == e.symbol()))
            .collect();
        info!(
            "CsvBarFeed: Streaming {} of {} bars from {:?}",
            selected.len(),
            total,
            self.path
        );

        tokio::spawn(async move {
            for envelope in selected {
                if tx.send(envelope).await.is_err() {
                    warn!("CsvBarFeed: Receiver dropped before end of file");
                    return;
                }
            }
        });

        Ok(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const SAMPLE: &str = "\
symbol,timestamp,open,high,low,close,volume,bid,ask,bid_size,ask_size,call_premium,put_premium,bullish_sweeps,bearish_sweeps
spy,1704067260000,470.10,470.50,470.00,470.40,1200,470.39,470.41,300,100,,,,
SPY,2024-01-01T00:00:00Z,470.00,470.20,469.90,470.10,1000,,,,,250000,50000,2,0
";

    #[test]
    fn test_parse_sorts_and_reads_optional_columns() {
        let envelopes = CsvBarFeed::parse(SAMPLE.as_bytes()).unwrap();
        assert_eq!(envelopes.len(), 2);

        let first = &envelopes[0];
        assert_eq!(first.bar.timestamp, 1704067200000);
        assert_eq!(first.bar.close, dec!(470.10));
        assert!(first.bar.bid.is_none());
        let flow = first.order_flow.as_ref().unwrap();
        assert_eq!(flow.call_premium, dec!(250000));
        assert_eq!(flow.bullish_sweeps, 2);

        let second = &envelopes[1];
        assert_eq!(second.symbol(), "SPY");
        assert_eq!(second.bar.bid_size, Some(dec!(300)));
        assert!(second.order_flow.is_none());
    }

    #[test]
    fn test_minimal_columns() {
        let data = "symbol,timestamp,open,high,low,close,volume\nQQQ,60000,1,2,0.5,1.5,10\n";
        let envelopes = CsvBarFeed::parse(data.as_bytes()).unwrap();
        assert_eq!(envelopes[0].bar.volume, dec!(10));
        assert!(envelopes[0].bar.quote_sizes().is_none());
    }

    #[test]
    fn test_bad_number_reports_row() {
        let data = "symbol,timestamp,open,high,low,close,volume\nQQQ,60000,abc,2,0.5,1.5,10\n";
        let err = CsvBarFeed::parse(data.as_bytes()).unwrap_err();
        assert!(format!("{:#}", err).contains("Row 1"));
    }
}
