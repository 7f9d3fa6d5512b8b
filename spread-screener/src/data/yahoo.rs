//! Yahoo Finance option chain client.
//!
//! Uses the unofficial v7 options endpoint. One request returns the
//! underlying quote, every listed expiration, and the chain for either the
//! nearest or a requested expiration.
//!
//! Data is delayed ~15 minutes and intended for personal use.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use chrono::{DateTime, NaiveDate, NaiveTime};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::debug;

use super::provider::{ChainProvider, ProviderError};
use super::types::{Contract, ContractChain, DataError, OptionType};

/// Yahoo Finance options endpoint.
const BASE_URL: &str = "https://query2.finance.yahoo.com/v7/finance/options";

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// Minimum interval between requests.
const MIN_REQUEST_INTERVAL: Duration = Duration::from_millis(250);

/// Yahoo Finance API client.
pub struct YahooClient {
    client: Client,
    base_url: String,
    last_request: Mutex<Instant>,
    request_count: AtomicU64,
}

impl YahooClient {
    /// Create a client against the public endpoint.
    pub fn new() -> Result<Self, ProviderError> {
        Self::with_base_url(BASE_URL)
    }

    /// Create a client against another host (mirrors, proxies).
    pub fn with_base_url(base_url: &str) -> Result<Self, ProviderError> {
        let client = Client::builder().user_agent(USER_AGENT).build()?;
        let last_request = Instant::now()
            .checked_sub(MIN_REQUEST_INTERVAL)
            .unwrap_or_else(Instant::now);

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            last_request: Mutex::new(last_request),
            request_count: AtomicU64::new(0),
        })
    }

    /// Get request count for monitoring.
    pub fn request_count(&self) -> u64 {
        self.request_count.load(Ordering::Relaxed)
    }

    /// Rate-limited request helper.
    async fn request(
        &self,
        ticker: &str,
        params: &[(&str, String)],
    ) -> Result<YahooOptionChainData, ProviderError> {
        {
            let mut last = self.last_request.lock().await;
            let elapsed = last.elapsed();
            if elapsed < MIN_REQUEST_INTERVAL {
                tokio::time::sleep(MIN_REQUEST_INTERVAL - elapsed).await;
            }
            *last = Instant::now();
        }

        let url = format!("{}/{}", self.base_url, ticker);
        debug!("GET {} {:?}", url, params);

        let response = self.client.get(&url).query(params).send().await?;
        self.request_count.fetch_add(1, Ordering::Relaxed);

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ProviderError::RateLimitExceeded);
        }

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(ProviderError::UnknownTicker(ticker.to_string()));
        }

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(ProviderError::ApiError(format!("{}: {}", status, text)));
        }

        let body: YahooOptionsResponse = response.json().await.map_err(|e| {
            ProviderError::InvalidResponse(format!("Failed to parse response: {}", e))
        })?;

        body.into_result(ticker)
    }
}

impl ChainProvider for YahooClient {
    async fn current_price(&self, ticker: &str) -> Result<Decimal, ProviderError> {
        let data = self.request(ticker, &[]).await?;
        let price = data.quote.regular_market_price.ok_or_else(|| {
            ProviderError::InvalidResponse(format!("No market price for {}", ticker))
        })?;

        Decimal::try_from(price)
            .map_err(|e| ProviderError::InvalidResponse(format!("Bad price {}: {}", price, e)))
    }

    async fn expirations(&self, ticker: &str) -> Result<Vec<NaiveDate>, ProviderError> {
        let data = self.request(ticker, &[]).await?;

        let expirations: Vec<NaiveDate> = data
            .expiration_dates
            .iter()
            .filter_map(|&ts| DateTime::from_timestamp(ts, 0).map(|dt| dt.date_naive()))
            .collect();

        if expirations.is_empty() {
            return Err(ProviderError::NoExpirations(ticker.to_string()));
        }
        Ok(expirations)
    }

    async fn chain(
        &self,
        ticker: &str,
        expiration: NaiveDate,
    ) -> Result<ContractChain, ProviderError> {
        // Yahoo keys expirations by midnight UTC
        let ts = expiration.and_time(NaiveTime::MIN).and_utc().timestamp();
        let data = self.request(ticker, &[("date", ts.to_string())]).await?;

        let options = data
            .options
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::MissingChain {
                ticker: ticker.to_string(),
                expiration,
            })?;

        convert_chain(expiration, options).map_err(ProviderError::from)
    }
}

/// Convert one Yahoo expiration block into a chain.
fn convert_chain(expiration: NaiveDate, options: YahooOptions) -> Result<ContractChain, DataError> {
    let mut chain = ContractChain::new(expiration);

    for call in &options.calls {
        chain.add_contract(convert_contract(call, OptionType::Call, expiration)?);
    }

    for put in &options.puts {
        chain.add_contract(convert_contract(put, OptionType::Put, expiration)?);
    }

    Ok(chain)
}

/// Convert Yahoo option data to our contract format.
fn convert_contract(
    data: &YahooOptionData,
    option_type: OptionType,
    expiration: NaiveDate,
) -> Result<Contract, DataError> {
    let symbol = data
        .contract_symbol
        .clone()
        .ok_or_else(|| DataError::MissingField {
            symbol: "<unknown>".to_string(),
            field: "contractSymbol",
        })?;

    let missing = |field: &'static str| DataError::MissingField {
        symbol: symbol.clone(),
        field,
    };
    let decimal = |field: &'static str, value: f64| {
        Decimal::try_from(value).map_err(|_| DataError::InvalidValue {
            symbol: symbol.clone(),
            field,
            value: value.to_string(),
        })
    };

    let strike = decimal("strike", data.strike.ok_or_else(|| missing("strike"))?)?;
    let last_price = decimal("lastPrice", data.last_price.ok_or_else(|| missing("lastPrice"))?)?;

    let ts = data.last_trade_date.ok_or_else(|| missing("lastTradeDate"))?;
    let last_trade = DateTime::from_timestamp(ts, 0)
        .ok_or_else(|| DataError::MalformedTimestamp(ts.to_string()))?;

    Ok(Contract {
        symbol: symbol.clone(),
        option_type,
        expiration,
        strike,
        last_price,
        last_trade,
        volume: data.volume.unwrap_or(0),
        open_interest: data.open_interest.unwrap_or(0),
        implied_volatility: data.implied_volatility.unwrap_or(0.0),
    })
}

// Yahoo Finance API response structures

#[derive(Debug, Deserialize)]
struct YahooOptionsResponse {
    #[serde(rename = "optionChain")]
    option_chain: YahooOptionChain,
}

impl YahooOptionsResponse {
    fn into_result(self, ticker: &str) -> Result<YahooOptionChainData, ProviderError> {
        if let Some(err) = self.option_chain.error {
            return Err(ProviderError::ApiError(err.to_string()));
        }

        self.option_chain
            .result
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::UnknownTicker(ticker.to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct YahooOptionChain {
    #[serde(default)]
    result: Vec<YahooOptionChainData>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct YahooOptionChainData {
    #[serde(rename = "expirationDates", default)]
    expiration_dates: Vec<i64>,
    quote: YahooQuoteData,
    #[serde(default)]
    options: Vec<YahooOptions>,
}

#[derive(Debug, Deserialize)]
struct YahooQuoteData {
    #[serde(rename = "regularMarketPrice")]
    regular_market_price: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct YahooOptions {
    #[serde(default)]
    calls: Vec<YahooOptionData>,
    #[serde(default)]
    puts: Vec<YahooOptionData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct YahooOptionData {
    contract_symbol: Option<String>,
    strike: Option<f64>,
    last_price: Option<f64>,
    last_trade_date: Option<i64>,
    volume: Option<i64>,
    open_interest: Option<i64>,
    implied_volatility: Option<f64>,
}
