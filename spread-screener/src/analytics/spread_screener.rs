//! Vertical credit spread screening.
//!
//! For each expiration inside the lookahead window:
//! - keep out-of-the-money contracts that last traded in the latest session
//! - pair every short strike with every strike further from the money
//! - compute margin, net premium, return, distance and daily distance
//! - keep pairs whose legs traded close together and that clear all thresholds
//!
//! Every metric is rounded to cents / basis points where it is computed and
//! the rounded value is what later metrics and the filters see.

use std::collections::HashSet;

use chrono::{Duration, NaiveDate};
use rayon::prelude::*;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::config::ScreenerConfig;
use crate::data::{Contract, ContractChain, MarketSnapshot};
use crate::session::{business_days_between, MarketSession};
use crate::validation::DataIntegrityValidator;

use super::strategy::Strategy;

/// Decimal places kept on every computed metric.
const PRECISION: u32 = 2;

/// Market state shared by every pair in one screen.
#[derive(Debug, Clone, Copy)]
pub struct ScreenContext {
    /// Underlying price the distances are measured from.
    pub underlying_price: Decimal,
    /// Exchange-local date days-to-expiration is counted from.
    pub today: NaiveDate,
    /// Only legs last traded on this exchange-local date are eligible.
    pub session_date: NaiveDate,
    /// Exchange calendar used to date last trades.
    pub session: MarketSession,
}

impl ScreenContext {
    /// Resolve dates against the instant the snapshot was captured.
    pub fn for_snapshot(snapshot: &MarketSnapshot, session: MarketSession) -> Self {
        Self {
            underlying_price: snapshot.underlying_price,
            today: session.local_date(snapshot.captured_at),
            session_date: session.latest_session_date(snapshot.captured_at),
            session,
        }
    }
}

/// A priced short/long pairing.
#[derive(Debug, Clone, PartialEq)]
pub struct SpreadCandidate {
    pub strategy: Strategy,
    /// Sold contract.
    pub short: Contract,
    /// Bought contract.
    pub long: Contract,
    pub expiration: NaiveDate,
    /// Calendar days to expiration.
    pub dte: i64,
    /// Weekdays from today through expiration, inclusive.
    pub business_days: i64,
    pub underlying_price: Decimal,
    /// Strike width.
    pub margin_requirement: Decimal,
    /// Short premium less long premium.
    pub net_premium: Decimal,
    /// Net premium as a percentage of margin.
    pub return_pct: Decimal,
    /// Gap between underlying and short strike as a percentage of the underlying.
    pub distance_pct: Decimal,
    /// Distance per calendar day to expiration.
    pub daily_distance_pct: Decimal,
}

impl SpreadCandidate {
    /// Absolute gap between the two legs' last trades.
    pub fn trade_gap(&self) -> Duration {
        (self.short.last_trade - self.long.last_trade).abs()
    }

    /// Whether both legs' prices are from roughly the same moment.
    pub fn legs_traded_together(&self, tolerance: Duration) -> bool {
        self.trade_gap() <= tolerance
    }

    /// Return, daily distance and distance all at or above their minimums.
    pub fn passes_thresholds(&self, config: &ScreenerConfig) -> bool {
        let value = |d: Decimal| d.to_f64().unwrap_or(f64::NEG_INFINITY);

        value(self.return_pct) >= config.min_return
            && value(self.daily_distance_pct) >= config.min_daily_distance
            && value(self.distance_pct) >= config.min_distance
    }

    pub fn is_accepted(&self, config: &ScreenerConfig) -> bool {
        self.legs_traded_together(config.tolerance()) && self.passes_thresholds(config)
    }
}

/// Price one pairing. `None` when the legs are ordered the wrong way or a
/// metric is undefined (zero margin, non-positive price, expired chain).
pub fn evaluate_pair(
    strategy: Strategy,
    short: &Contract,
    long: &Contract,
    expiration: NaiveDate,
    ctx: &ScreenContext,
) -> Option<SpreadCandidate> {
    if !strategy.is_valid_pair(short.strike, long.strike) {
        return None;
    }

    let price = ctx.underlying_price;
    let dte = (expiration - ctx.today).num_days();
    if price <= Decimal::ZERO || dte <= 0 {
        return None;
    }

    let margin_requirement = strategy
        .margin_requirement(short.strike, long.strike)
        .round_dp(PRECISION);
    if margin_requirement <= Decimal::ZERO {
        return None;
    }

    let net_premium = (short.last_price - long.last_price).round_dp(PRECISION);
    let return_pct = percent_of(net_premium, margin_requirement)?;
    let distance_pct = percent_of(strategy.distance_to_short(short.strike, price), price)?;
    let daily_distance_pct = distance_pct
        .checked_div(Decimal::from(dte))?
        .round_dp(PRECISION);

    Some(SpreadCandidate {
        strategy,
        short: short.clone(),
        long: long.clone(),
        expiration,
        dte,
        business_days: business_days_between(ctx.today, expiration),
        underlying_price: price,
        margin_requirement,
        net_premium,
        return_pct,
        distance_pct,
        daily_distance_pct,
    })
}

fn percent_of(part: Decimal, whole: Decimal) -> Option<Decimal> {
    part.checked_div(whole)?
        .checked_mul(Decimal::ONE_HUNDRED)
        .map(|v| v.round_dp(PRECISION))
}

/// Every (short, long) pairing of a sorted candidate chain where the short
/// precedes the long and the strikes point the right way.
pub fn enumerate_pairs<'a>(
    strategy: Strategy,
    chain: &[&'a Contract],
) -> Vec<(&'a Contract, &'a Contract)> {
    let mut pairs = Vec::new();
    for (i, &short) in chain.iter().enumerate() {
        for &long in &chain[i + 1..] {
            if !strategy.is_valid_pair(short.strike, long.strike) {
                continue;
            }
            pairs.push((short, long));
        }
    }
    pairs
}

/// Spread screener for bear call and bull put candidates.
pub struct SpreadScreener {
    config: ScreenerConfig,
    validator: DataIntegrityValidator,
}

impl SpreadScreener {
    pub fn new(config: ScreenerConfig) -> Self {
        Self {
            config,
            validator: DataIntegrityValidator::new(),
        }
    }

    pub fn config(&self) -> &ScreenerConfig {
        &self.config
    }

    /// Screen every chain inside the lookahead window. Returns accepted
    /// candidates only, in chain order.
    pub fn screen(
        &self,
        strategy: Strategy,
        snapshot: &MarketSnapshot,
        ctx: &ScreenContext,
    ) -> Vec<SpreadCandidate> {
        if ctx.underlying_price <= Decimal::ZERO {
            warn!(
                "Underlying price for {} is {}, nothing to screen",
                snapshot.ticker, ctx.underlying_price
            );
            return Vec::new();
        }

        let chains = snapshot.chains_within(ctx.today, self.config.max_days_to_expiration);

        let accepted: Vec<SpreadCandidate> = chains
            .par_iter()
            .flat_map_iter(|chain| self.screen_chain(strategy, chain, ctx))
            .collect();

        info!(
            "{} {}: {} expirations screened, {} spreads accepted",
            snapshot.ticker,
            strategy,
            chains.len(),
            accepted.len()
        );

        accepted
    }

    /// Screen a single expiration.
    pub fn screen_chain(
        &self,
        strategy: Strategy,
        chain: &ContractChain,
        ctx: &ScreenContext,
    ) -> Vec<SpreadCandidate> {
        let candidates = self.candidate_chain(strategy, chain, ctx);
        let pairs = enumerate_pairs(strategy, &candidates);
        let tolerance = self.config.tolerance();

        let mut accepted = Vec::new();
        for (short, long) in &pairs {
            let Some(candidate) = evaluate_pair(strategy, short, long, chain.expiration, ctx) else {
                continue;
            };

            if !candidate.legs_traded_together(tolerance) {
                debug!(
                    "{}/{}: legs traded {}m apart",
                    short.symbol,
                    long.symbol,
                    candidate.trade_gap().num_minutes()
                );
                continue;
            }

            if !candidate.passes_thresholds(&self.config) {
                continue;
            }

            accepted.push(candidate);
        }

        debug!(
            "{} {}: {} eligible contracts, {} pairs, {} accepted",
            chain.expiration,
            strategy,
            candidates.len(),
            pairs.len(),
            accepted.len()
        );

        accepted
    }

    /// Eligible contracts for one side of a chain, nearest the money first.
    ///
    /// Drops contracts failing integrity checks, in-the-money and at-the-money
    /// strikes, quotes not traded in the latest session, and repeated strikes
    /// (first occurrence wins).
    pub fn candidate_chain<'a>(
        &self,
        strategy: Strategy,
        chain: &'a ContractChain,
        ctx: &ScreenContext,
    ) -> Vec<&'a Contract> {
        let mut seen_strikes = HashSet::new();

        let mut contracts: Vec<&Contract> = chain
            .side(strategy.option_type())
            .iter()
            .filter(|c| match self.validator.check_contract(c, chain.expiration) {
                Ok(()) => true,
                Err(e) => {
                    warn!("Skipping contract: {}", e);
                    false
                }
            })
            .filter(|c| strategy.is_out_of_the_money(c.strike, ctx.underlying_price))
            .filter(|c| ctx.session.local_date(c.last_trade) == ctx.session_date)
            .filter(|c| {
                let first = seen_strikes.insert(c.strike);
                if !first {
                    debug!("Duplicate strike {} in {}", c.strike, c.symbol);
                }
                first
            })
            .collect();

        contracts.sort_by(|a, b| strategy.cmp_strikes(a, b));
        contracts
    }
}
