//! Core data types for option chain screening.
//!
//! These types represent one snapshot of an underlying's listed options as
//! returned by a chain provider: the contracts for each expiration, split
//! into calls and puts.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Malformed or inconsistent contract data.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DataError {
    #[error("Missing field `{field}` for contract {symbol}")]
    MissingField { symbol: String, field: &'static str },

    #[error("Time-only trade timestamp `{0}` has no date")]
    TimeOnlyTimestamp(String),

    #[error("Malformed trade timestamp `{0}`")]
    MalformedTimestamp(String),

    #[error("Invalid contract symbol `{0}`")]
    InvalidSymbol(String),

    #[error("Invalid value for {field} on {symbol}: {value}")]
    InvalidValue {
        symbol: String,
        field: &'static str,
        value: String,
    },

    #[error("Contract {symbol} expires {found}, chain expires {expected}")]
    ExpirationMismatch {
        symbol: String,
        expected: NaiveDate,
        found: NaiveDate,
    },
}

/// Option type (call or put).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionType {
    Call,
    Put,
}

impl OptionType {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "C" | "CALL" => Some(Self::Call),
            "P" | "PUT" => Some(Self::Put),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Call => "C",
            Self::Put => "P",
        }
    }
}

/// A single listed option contract, one leg of a potential spread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contract {
    /// OCC-style contract symbol (e.g., "NVDA240216C00800000")
    pub symbol: String,

    /// Option type (call or put)
    pub option_type: OptionType,

    /// Option expiration date
    pub expiration: NaiveDate,

    /// Strike price
    pub strike: Decimal,

    /// Last traded price
    pub last_price: Decimal,

    /// Time of the last trade
    pub last_trade: DateTime<Utc>,

    /// Trading volume for the session
    pub volume: i64,

    /// Open interest
    pub open_interest: i64,

    /// Implied volatility as a fraction (0.45 = 45%)
    pub implied_volatility: f64,
}

/// All contracts for a single expiration date.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContractChain {
    /// Expiration date for this chain
    pub expiration: NaiveDate,

    /// Call contracts, in provider order
    pub calls: Vec<Contract>,

    /// Put contracts, in provider order
    pub puts: Vec<Contract>,
}

impl ContractChain {
    /// Create a new empty chain.
    pub fn new(expiration: NaiveDate) -> Self {
        Self {
            expiration,
            calls: Vec::new(),
            puts: Vec::new(),
        }
    }

    /// Add a contract to the appropriate side.
    pub fn add_contract(&mut self, contract: Contract) {
        match contract.option_type {
            OptionType::Call => self.calls.push(contract),
            OptionType::Put => self.puts.push(contract),
        }
    }

    /// Contracts on one side of the chain.
    pub fn side(&self, option_type: OptionType) -> &[Contract] {
        match option_type {
            OptionType::Call => &self.calls,
            OptionType::Put => &self.puts,
        }
    }

    /// Whole calendar days from `today` until expiration. Negative once expired.
    pub fn days_to_expiration(&self, today: NaiveDate) -> i64 {
        (self.expiration - today).num_days()
    }
}

/// Complete option chain snapshot for one underlying at one instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    /// Underlying symbol
    pub ticker: String,

    /// When the snapshot was taken
    pub captured_at: DateTime<Utc>,

    /// Underlying price
    pub underlying_price: Decimal,

    /// Option chains sorted by expiration
    pub chains: Vec<ContractChain>,
}

impl MarketSnapshot {
    /// Create a new empty snapshot.
    pub fn new(ticker: &str, captured_at: DateTime<Utc>, underlying_price: Decimal) -> Self {
        Self {
            ticker: ticker.to_string(),
            captured_at,
            underlying_price,
            chains: Vec::new(),
        }
    }

    /// Chains whose days-to-expiration fall within `1..=max_dte`.
    pub fn chains_within(&self, today: NaiveDate, max_dte: i64) -> Vec<&ContractChain> {
        self.chains
            .iter()
            .filter(|c| {
                let dte = c.days_to_expiration(today);
                dte > 0 && dte <= max_dte
            })
            .collect()
    }

    /// Total number of contracts in this snapshot.
    pub fn total_contracts(&self) -> usize {
        self.chains
            .iter()
            .map(|c| c.calls.len() + c.puts.len())
            .sum()
    }
}

/// Parse a last-trade timestamp into a full date-time.
///
/// Accepts RFC 3339 (with offset) and naive `YYYY-MM-DD HH:MM:SS`, which is
/// read as UTC. A bare time of day is rejected: without a date it cannot be
/// matched against the trading session.
pub fn parse_last_trade(raw: &str) -> Result<DateTime<Utc>, DataError> {
    let s = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    for fmt in ["%Y-%m-%d %H:%M:%S%:z", "%Y-%m-%d %H:%M:%S%z"] {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Ok(dt.with_timezone(&Utc));
        }
    }

    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(naive.and_utc());
        }
    }

    for fmt in ["%H:%M", "%H:%M:%S"] {
        if NaiveTime::parse_from_str(s, fmt).is_ok() {
            return Err(DataError::TimeOnlyTimestamp(raw.to_string()));
        }
    }

    Err(DataError::MalformedTimestamp(raw.to_string()))
}
