//! Offline replay of a bar file through the analytics sessions
//!
//! Every symbol in the input is replayed from cold by its own session, in
//! parallel, and the resulting stream messages are written as JSON lines.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use gnosis::application::session::SymbolSession;
use gnosis::config::EngineConfig;
use gnosis::domain::analytics::{MessageKind, SessionSummary, StreamMessage};
use gnosis::domain::market::BarEnvelope;
use gnosis::infrastructure::CsvBarFeed;
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use tracing::{Level, info};
use tracing_subscriber::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputKind {
    All,
    Bar,
    Indicator,
    CollapseField,
}

impl OutputKind {
    fn accepts(self, kind: MessageKind) -> bool {
        match self {
            OutputKind::All => true,
            OutputKind::Bar => kind == MessageKind::Bar,
            OutputKind::Indicator => kind == MessageKind::Indicator,
            OutputKind::CollapseField => kind == MessageKind::CollapseField,
        }
    }
}

#[derive(Parser)]
#[command(author, version, about = "Replay bars through the analytics engine", long_about = None)]
struct Cli {
    /// CSV file with one bar per row
    #[arg(short, long)]
    input: PathBuf,

    /// TOML file with engine parameters (defaults when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// JSON lines output file (stdout when omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Which messages to write
    #[arg(short, long, value_enum, default_value = "all")]
    kind: OutputKind,

    /// Comma-separated symbols to replay (all when omitted)
    #[arg(short, long)]
    symbols: Option<String>,
}

struct SymbolReplay {
    messages: Vec<StreamMessage>,
    summary: SessionSummary,
}

fn replay_symbol(
    symbol: &str,
    envelopes: &[BarEnvelope],
    config: &EngineConfig,
    kind: OutputKind,
) -> Result<SymbolReplay> {
    let mut session = SymbolSession::new(symbol, config)
        .with_context(|| format!("Failed to start session for {}", symbol))?;
    let mut messages = Vec::new();

    for envelope in envelopes {
        // rejections are logged and counted by the session
        if let Ok(snapshot) = session.apply(envelope) {
            messages.extend(
                snapshot
                    .into_messages()
                    .into_iter()
                    .filter(|m| kind.accepts(m.kind())),
            );
        }
    }

    Ok(SymbolReplay {
        messages,
        summary: session.summary(),
    })
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // stdout carries the JSON lines
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(stderr_layer)
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => EngineConfig::from_toml_file(path)?,
        None => EngineConfig::default(),
    };
    config.validate()?;

    let wanted: Option<Vec<String>> = cli.symbols.as_ref().map(|s| {
        s.split(',')
            .map(|s| s.trim().to_uppercase())
            .filter(|s| !s.is_empty())
            .collect()
    });

    let envelopes = CsvBarFeed::load(&cli.input)?;
    info!("Loaded {} bars from {:?}", envelopes.len(), cli.input);

    let mut by_symbol: BTreeMap<String, Vec<BarEnvelope>> = BTreeMap::new();
    for envelope in envelopes {
        if let Some(wanted) = &wanted
            && !wanted.iter().any(|s| s == envelope.symbol())
        {
            continue;
        }
        by_symbol
            .entry(envelope.symbol().to_string())
            .or_default()
            .push(envelope);
    }

    let replays: Vec<SymbolReplay> = by_symbol
        .par_iter()
        .map(|(symbol, envelopes)| replay_symbol(symbol, envelopes, &config, cli.kind))
        .collect::<Result<Vec<_>>>()?;

    let mut writer: Box<dyn Write> = match &cli.output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("Failed to create {:?}", path))?,
        )),
        None => Box::new(BufWriter::new(std::io::stdout().lock())),
    };

    let mut written = 0usize;
    for replay in &replays {
        for message in &replay.messages {
            serde_json::to_writer(&mut writer, message)?;
            writeln!(writer)?;
            written += 1;
        }
    }
    writer.flush()?;

    for replay in &replays {
        let s = &replay.summary;
        info!(
            "{}: accepted={} rejected={} state={:?} last={:?}",
            s.symbol, s.accepted, s.rejected, s.state, s.last_timestamp
        );
    }
    info!("Wrote {} messages", written);

    Ok(())
}
