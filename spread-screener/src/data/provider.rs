//! Chain provider interface.
//!
//! The screener consumes market data through three calls: the underlying's
//! current price, its listed expirations, and the contract chain for one
//! expiration. Implementations live alongside this trait.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;

use super::types::{ContractChain, DataError};

/// Errors raised while fetching market data.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),

    #[error("No data available for {0}")]
    UnknownTicker(String),

    #[error("No expirations listed for {0}")]
    NoExpirations(String),

    #[error("No chain for {ticker} expiring {expiration}")]
    MissingChain {
        ticker: String,
        expiration: NaiveDate,
    },

    #[error("Malformed contract data: {0}")]
    Data(#[from] DataError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Snapshot format error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Source of option chain data for one underlying.
#[allow(async_fn_in_trait)]
pub trait ChainProvider {
    /// Current price of the underlying.
    async fn current_price(&self, ticker: &str) -> Result<Decimal, ProviderError>;

    /// Listed expiration dates, in provider order.
    async fn expirations(&self, ticker: &str) -> Result<Vec<NaiveDate>, ProviderError>;

    /// Calls and puts for one expiration.
    async fn chain(&self, ticker: &str, expiration: NaiveDate)
        -> Result<ContractChain, ProviderError>;
}
