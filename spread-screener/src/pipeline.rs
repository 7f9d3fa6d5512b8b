//! End-to-end screening run.
//!
//! 1. Fetch the underlying price and expiration list (failure aborts the run)
//! 2. Fetch each expiration inside the lookahead window (failure skips it)
//! 3. Screen the snapshot once per strategy
//! 4. Rank and dedupe each strategy's accepted spreads

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::analytics::{ScreenContext, SpreadScreener, Strategy};
use crate::config::{ConfigError, ScreenerConfig};
use crate::data::{ChainProvider, MarketSnapshot, ProviderError};
use crate::report::{ReportError, ResultSet};
use crate::session::MarketSession;

#[derive(Error, Debug)]
pub enum ScreenerError {
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Report error: {0}")]
    Report(#[from] ReportError),
}

/// Fetch everything one screen needs from the provider.
///
/// Expirations that are already expired or beyond `max_dte` are never
/// requested. A chain that fails to load is logged and left out.
pub async fn fetch_snapshot<P: ChainProvider>(
    provider: &P,
    ticker: &str,
    max_dte: i64,
    session: &MarketSession,
    now: DateTime<Utc>,
) -> Result<MarketSnapshot, ScreenerError> {
    let underlying_price = provider.current_price(ticker).await?;
    let expirations = provider.expirations(ticker).await?;
    if expirations.is_empty() {
        return Err(ProviderError::NoExpirations(ticker.to_string()).into());
    }

    let today = session.local_date(now);
    let mut snapshot = MarketSnapshot::new(ticker, now, underlying_price);
    let mut skipped = 0usize;

    for expiration in expirations {
        let dte = (expiration - today).num_days();
        if dte <= 0 || dte > max_dte {
            debug!("{} {}: {} DTE outside 1..={}", ticker, expiration, dte, max_dte);
            continue;
        }

        match provider.chain(ticker, expiration).await {
            Ok(chain) => snapshot.chains.push(chain),
            Err(e) => {
                warn!("Skipping {} {}: {}", ticker, expiration, e);
                skipped += 1;
            }
        }
    }

    snapshot.chains.sort_by_key(|c| c.expiration);

    info!(
        "{} @ {}: {} expirations loaded ({} skipped), {} contracts",
        ticker,
        underlying_price,
        snapshot.chains.len(),
        skipped,
        snapshot.total_contracts()
    );

    Ok(snapshot)
}

/// Screen one strategy against an already-fetched snapshot.
pub fn screen_snapshot(
    snapshot: &MarketSnapshot,
    strategy: Strategy,
    config: &ScreenerConfig,
    session: MarketSession,
) -> ResultSet {
    let ctx = ScreenContext::for_snapshot(snapshot, session);
    debug!(
        "Screening {} as of {} (session {})",
        strategy, ctx.today, ctx.session_date
    );

    let screener = SpreadScreener::new(config.clone());
    let accepted = screener.screen(strategy, snapshot, &ctx);
    ResultSet::from_candidates(strategy, &accepted)
}

/// Fetch once and screen every requested strategy.
pub async fn run<P: ChainProvider>(
    provider: &P,
    config: &ScreenerConfig,
    strategies: &[Strategy],
    session: MarketSession,
    now: DateTime<Utc>,
) -> Result<Vec<ResultSet>, ScreenerError> {
    config.validate()?;

    let snapshot = fetch_snapshot(
        provider,
        &config.ticker,
        config.max_days_to_expiration,
        &session,
        now,
    )
    .await?;

    Ok(strategies
        .iter()
        .map(|&strategy| screen_snapshot(&snapshot, strategy, config, session))
        .collect())
}
