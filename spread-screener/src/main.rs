//! Vertical credit spread screener.
//!
//! # Usage
//!
//! ```bash
//! # Screen both strategies for the configured ticker
//! spread-screener scan --ticker NVDA
//!
//! # Bear calls only, with a config file and a tighter lookahead
//! spread-screener scan --strategy bear-call --config screener.toml --max-dte 30
//!
//! # Capture a chain and rerun the screen against it offline
//! spread-screener snapshot --ticker NVDA --out snapshots/nvda.json
//! spread-screener scan --snapshot snapshots/nvda.json
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use spread_screener::data::{ChainProvider, SnapshotFile, SnapshotProvider, YahooClient};
use spread_screener::pipeline::{fetch_snapshot, screen_snapshot};
use spread_screener::{DataIntegrityValidator, MarketSession, MarketSnapshot, ScreenerConfig, Strategy};

const SEPARATOR: &str = "============================================================";

/// Spread screener CLI.
#[derive(Parser)]
#[command(name = "spread-screener")]
#[command(about = "Screen bear call and bull put credit spreads")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Screen option chains and write ranked CSV reports
    Scan {
        /// Underlying symbol
        #[arg(long)]
        ticker: Option<String>,

        /// Which spreads to screen
        #[arg(long, value_enum, default_value = "both")]
        strategy: StrategyArg,

        /// Path to TOML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Replay a saved snapshot instead of fetching live data
        #[arg(long)]
        snapshot: Option<PathBuf>,

        /// Directory the CSV reports are written to
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Skip expirations further out than this many days
        #[arg(long)]
        max_dte: Option<i64>,

        /// Minimum return on margin (%)
        #[arg(long)]
        min_return: Option<f64>,

        /// Minimum distance from underlying to short strike (%)
        #[arg(long)]
        min_distance: Option<f64>,

        /// Minimum distance per day to expiration (%)
        #[arg(long)]
        min_daily_distance: Option<f64>,

        /// Maximum minutes between the two legs' last trades
        #[arg(long)]
        tolerance_minutes: Option<i64>,
    },

    /// Fetch a live chain and save it for offline replay
    Snapshot {
        /// Underlying symbol
        #[arg(long)]
        ticker: String,

        /// Output JSON file
        #[arg(long)]
        out: PathBuf,

        /// Skip expirations further out than this many days
        #[arg(long, default_value_t = 50)]
        max_dte: i64,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum StrategyArg {
    BearCall,
    BullPut,
    Both,
}

impl StrategyArg {
    fn strategies(self) -> Vec<Strategy> {
        match self {
            Self::BearCall => vec![Strategy::BearCall],
            Self::BullPut => vec![Strategy::BullPut],
            Self::Both => Strategy::ALL.to_vec(),
        }
    }
}

/// Threshold overrides taken from the command line.
struct Overrides {
    ticker: Option<String>,
    output_dir: Option<PathBuf>,
    max_dte: Option<i64>,
    min_return: Option<f64>,
    min_distance: Option<f64>,
    min_daily_distance: Option<f64>,
    tolerance_minutes: Option<i64>,
}

/// Defaults, then the TOML file, then command-line flags.
fn load_config(path: Option<&Path>, overrides: Overrides) -> Result<ScreenerConfig> {
    let mut config = match path {
        Some(path) => ScreenerConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => ScreenerConfig::default(),
    };

    if let Some(ticker) = overrides.ticker {
        config.ticker = ticker;
    }
    if let Some(dir) = overrides.output_dir {
        config.output_dir = dir;
    }
    if let Some(v) = overrides.max_dte {
        config.max_days_to_expiration = v;
    }
    if let Some(v) = overrides.min_return {
        config.min_return = v;
    }
    if let Some(v) = overrides.min_distance {
        config.min_distance = v;
    }
    if let Some(v) = overrides.min_daily_distance {
        config.min_daily_distance = v;
    }
    if let Some(v) = overrides.tolerance_minutes {
        config.tolerance_minutes = v;
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn spinner(message: String) -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?);
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(120));
    Ok(pb)
}

async fn fetch_with_progress<P: ChainProvider>(
    provider: &P,
    ticker: &str,
    max_dte: i64,
    session: &MarketSession,
    now: DateTime<Utc>,
) -> Result<MarketSnapshot> {
    let pb = spinner(format!("Fetching {} option chains...", ticker))?;
    let result = fetch_snapshot(provider, ticker, max_dte, session, now).await;
    pb.finish_and_clear();
    result.with_context(|| format!("Failed to fetch option chains for {}", ticker))
}

/// Ticker to screen: the `--ticker` flag, else the replayed snapshot's own
/// ticker, else whatever the config file or defaults say.
fn scan_ticker(flag: Option<String>, replay: Option<&SnapshotProvider>) -> Option<String> {
    flag.or_else(|| replay.map(|provider| provider.ticker().to_string()))
}

async fn cmd_scan(config: ScreenerConfig, strategies: Vec<Strategy>, replay: Option<SnapshotProvider>) -> Result<()> {
    let session = MarketSession::default();

    let snapshot = match replay {
        Some(provider) => {
            info!("Replaying {} captured at {}", provider.ticker(), provider.captured_at());
            let now = provider.captured_at();
            fetch_with_progress(&provider, &config.ticker, config.max_days_to_expiration, &session, now).await?
        }
        None => {
            let provider = YahooClient::new()?;
            let snapshot = fetch_with_progress(
                &provider,
                &config.ticker,
                config.max_days_to_expiration,
                &session,
                Utc::now(),
            )
            .await?;
            info!("{} provider requests", provider.request_count());
            snapshot
        }
    };

    let integrity = DataIntegrityValidator::new().validate(&snapshot);
    info!("{}", integrity.summary());
    for check in integrity.failed_checks() {
        warn!("{}: {} {}", check.name, check.message, check.details.as_deref().unwrap_or(""));
    }

    println!("{}", SEPARATOR);
    println!(
        "{} @ {} ({} expirations within {} days)",
        snapshot.ticker,
        snapshot.underlying_price,
        snapshot.chains.len(),
        config.max_days_to_expiration
    );
    println!("{}", SEPARATOR);

    for strategy in strategies {
        let results = screen_snapshot(&snapshot, strategy, &config, session);
        let outcome = results
            .export(&config.output_dir)
            .with_context(|| format!("Failed to write {} report", strategy))?;
        println!("{}", outcome.message(strategy));
    }

    Ok(())
}

async fn cmd_snapshot(ticker: String, out: PathBuf, max_dte: i64) -> Result<()> {
    let session = MarketSession::default();
    let provider = YahooClient::new()?;

    let snapshot = fetch_with_progress(&provider, &ticker, max_dte, &session, Utc::now()).await?;

    SnapshotFile::from(&snapshot)
        .save(&out)
        .with_context(|| format!("Failed to save snapshot to {}", out.display()))?;

    println!(
        "Saved {} expirations ({} contracts) to '{}'.",
        snapshot.chains.len(),
        snapshot.total_contracts(),
        out.display()
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("spread_screener=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Scan {
            ticker,
            strategy,
            config,
            snapshot,
            output_dir,
            max_dte,
            min_return,
            min_distance,
            min_daily_distance,
            tolerance_minutes,
        } => {
            let replay = snapshot
                .as_deref()
                .map(|path| {
                    SnapshotProvider::from_path(path)
                        .with_context(|| format!("Failed to load snapshot {}", path.display()))
                })
                .transpose()?;

            let config = load_config(
                config.as_deref(),
                Overrides {
                    ticker: scan_ticker(ticker, replay.as_ref()),
                    output_dir,
                    max_dte,
                    min_return,
                    min_distance,
                    min_daily_distance,
                    tolerance_minutes,
                },
            )?;
            cmd_scan(config, strategy.strategies(), replay).await?;
        }
        Commands::Snapshot { ticker, out, max_dte } => {
            cmd_snapshot(ticker, out, max_dte).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn replay(ticker: &str) -> SnapshotProvider {
        let captured_at = Utc.with_ymd_and_hms(2024, 1, 26, 21, 0, 0).unwrap();
        SnapshotProvider::from_market_snapshot(&MarketSnapshot::new(ticker, captured_at, dec!(180)))
    }

    #[test]
    fn test_replay_defaults_to_snapshot_ticker() {
        let amd = replay("AMD");
        assert_eq!(scan_ticker(None, Some(&amd)), Some("AMD".to_string()));

        let config = load_config(
            None,
            Overrides {
                ticker: scan_ticker(None, Some(&amd)),
                output_dir: None,
                max_dte: None,
                min_return: None,
                min_distance: None,
                min_daily_distance: None,
                tolerance_minutes: None,
            },
        )
        .unwrap();
        assert_eq!(config.ticker, "AMD");
    }

    #[test]
    fn test_ticker_flag_wins_over_snapshot() {
        let amd = replay("AMD");
        assert_eq!(
            scan_ticker(Some("NVDA".to_string()), Some(&amd)),
            Some("NVDA".to_string())
        );
        assert_eq!(scan_ticker(None, None), None);
    }
}
