//! watchdog-replay - drive a watchdog rule from recorded snapshots
//!
//! Reads one snapshot JSON document per line (from a file or stdin), feeds
//! each to a configured engine and prints one result line per snapshot:
//!
//! ```text
//! {"line":2,"triggered":true,"reason":{"reason":"triggered","asset":["pump"],"timestamp":"..."}}
//! ```
//!
//! Log verbosity follows `WATCHDOG_LOG` (an `EnvFilter` directive, default `info`).

use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use watchdog_rule::{
    DataSource, EngineOptions, ReasonDocument, RuleConfig, StalenessEngine, TriggersDocument,
};

#[derive(Parser)]
#[command(name = "watchdog-replay")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Replay recorded snapshots through a watchdog rule", long_about = None)]
struct Cli {
    /// Asset, statistic or audit code to monitor (comma separated for several)
    #[arg(short, long, env = "WATCHDOG_ASSET", default_value = "")]
    asset: String,

    /// Watchdog interval in milliseconds
    #[arg(short, long, env = "WATCHDOG_INTERVAL", default_value = "5000")]
    interval: String,

    /// Data source: Readings, Statistics, "Statistics Rate" or Audit
    #[arg(short, long, default_value = "Readings")]
    source: String,

    /// Datapoint that must be present in a reading
    #[arg(short, long, default_value = "")]
    datapoint: String,

    /// Configuration category JSON file; overrides the flags above
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Re-enter warm-up whenever the configuration changes
    #[arg(long)]
    rearm: bool,

    /// Print the trigger document before replaying
    #[arg(long)]
    show_triggers: bool,

    /// Snapshot file, one JSON document per line (default: stdin)
    input: Option<PathBuf>,
}

#[derive(Serialize)]
struct ReplayLine {
    line: usize,
    triggered: bool,
    reason: ReasonDocument,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_env("WATCHDOG_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    let rule_config = load_config(&cli)?;
    let engine = StalenessEngine::with_options(EngineOptions {
        rearm_on_reconfigure: cli.rearm,
    });
    engine
        .try_configure(&rule_config)
        .context("invalid watchdog configuration")?;

    let stdout = io::stdout();
    let mut out = stdout.lock();

    if cli.show_triggers {
        let doc: TriggersDocument = engine.describe_triggers();
        writeln!(out, "{}", doc.to_json()?)?;
    }

    let reader: Box<dyn BufRead> = match &cli.input {
        Some(path) => Box::new(BufReader::new(
            File::open(path).with_context(|| format!("failed to open {}", path.display()))?,
        )),
        None => Box::new(BufReader::new(io::stdin())),
    };

    let mut fired = 0usize;
    for (idx, line) in reader.lines().enumerate() {
        let line = line.context("failed to read snapshot line")?;
        if line.trim().is_empty() {
            continue;
        }

        let triggered = engine.evaluate(&line);
        if triggered {
            fired += 1;
        }

        let record = ReplayLine {
            line: idx + 1,
            triggered,
            reason: engine.describe_reason(),
        };
        serde_json::to_writer(&mut out, &record)?;
        writeln!(out)?;
    }

    info!(fired, "replay finished");
    Ok(())
}

fn load_config(cli: &Cli) -> Result<RuleConfig> {
    if let Some(path) = &cli.config {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        return RuleConfig::from_category_json(&text).context("invalid configuration category");
    }

    if cli.source.parse::<DataSource>().is_err() {
        bail!("unknown data source '{}'", cli.source);
    }

    Ok(RuleConfig::new(cli.asset.clone())
        .with_interval(cli.interval.clone())
        .with_source_name(cli.source.clone())
        .with_datapoint(cli.datapoint.clone()))
}
