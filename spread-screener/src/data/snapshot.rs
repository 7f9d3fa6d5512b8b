//! Snapshot capture and replay.
//!
//! A fetched [`MarketSnapshot`] can be written to JSON and later served back
//! through [`SnapshotProvider`], so a screen can be rerun offline against the
//! exact same chain. Contract records are kept in their raw form on disk and
//! converted on every `chain` call, so malformed records surface as data
//! errors for their expiration just as they would from a live provider.

use std::fs;
use std::path::Path;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::provider::{ChainProvider, ProviderError};
use super::types::{parse_last_trade, Contract, ContractChain, DataError, MarketSnapshot, OptionType};

/// On-disk snapshot format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotFile {
    pub ticker: String,
    pub captured_at: DateTime<Utc>,
    pub underlying_price: Decimal,
    pub chains: Vec<RawChain>,
}

/// One expiration as stored on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawChain {
    pub expiration: NaiveDate,
    #[serde(default)]
    pub calls: Vec<RawContract>,
    #[serde(default)]
    pub puts: Vec<RawContract>,
}

/// One contract as stored on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawContract {
    pub contract_symbol: String,
    pub strike: Option<Decimal>,
    pub last_price: Option<Decimal>,
    pub last_trade_date: Option<String>,
    #[serde(default)]
    pub volume: Option<i64>,
    #[serde(default)]
    pub open_interest: Option<i64>,
    #[serde(default)]
    pub implied_volatility: Option<f64>,
}

impl RawContract {
    /// Convert to a contract, rejecting missing or malformed fields.
    pub fn to_contract(
        &self,
        option_type: OptionType,
        expiration: NaiveDate,
    ) -> Result<Contract, DataError> {
        let missing = |field: &'static str| DataError::MissingField {
            symbol: self.contract_symbol.clone(),
            field,
        };

        let strike = self.strike.ok_or_else(|| missing("strike"))?;
        let last_price = self.last_price.ok_or_else(|| missing("lastPrice"))?;
        let raw_trade = self
            .last_trade_date
            .as_deref()
            .ok_or_else(|| missing("lastTradeDate"))?;
        let last_trade = parse_last_trade(raw_trade)?;

        Ok(Contract {
            symbol: self.contract_symbol.clone(),
            option_type,
            expiration,
            strike,
            last_price,
            last_trade,
            volume: self.volume.unwrap_or(0),
            open_interest: self.open_interest.unwrap_or(0),
            implied_volatility: self.implied_volatility.unwrap_or(0.0),
        })
    }
}

impl From<&Contract> for RawContract {
    fn from(contract: &Contract) -> Self {
        Self {
            contract_symbol: contract.symbol.clone(),
            strike: Some(contract.strike),
            last_price: Some(contract.last_price),
            last_trade_date: Some(contract.last_trade.to_rfc3339_opts(SecondsFormat::Secs, true)),
            volume: Some(contract.volume),
            open_interest: Some(contract.open_interest),
            implied_volatility: Some(contract.implied_volatility),
        }
    }
}

impl RawChain {
    fn to_chain(&self) -> Result<ContractChain, DataError> {
        let mut chain = ContractChain::new(self.expiration);
        for call in &self.calls {
            chain.add_contract(call.to_contract(OptionType::Call, self.expiration)?);
        }
        for put in &self.puts {
            chain.add_contract(put.to_contract(OptionType::Put, self.expiration)?);
        }
        Ok(chain)
    }
}

impl From<&MarketSnapshot> for SnapshotFile {
    fn from(snapshot: &MarketSnapshot) -> Self {
        Self {
            ticker: snapshot.ticker.clone(),
            captured_at: snapshot.captured_at,
            underlying_price: snapshot.underlying_price,
            chains: snapshot
                .chains
                .iter()
                .map(|c| RawChain {
                    expiration: c.expiration,
                    calls: c.calls.iter().map(RawContract::from).collect(),
                    puts: c.puts.iter().map(RawContract::from).collect(),
                })
                .collect(),
        }
    }
}

impl SnapshotFile {
    /// Load a snapshot from a JSON file.
    pub fn load(path: &Path) -> Result<Self, ProviderError> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Write the snapshot as pretty JSON, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), ProviderError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }
}

/// Serves a stored snapshot through the provider interface.
#[derive(Debug, Clone)]
pub struct SnapshotProvider {
    snapshot: SnapshotFile,
}

impl SnapshotProvider {
    pub fn new(snapshot: SnapshotFile) -> Self {
        Self { snapshot }
    }

    /// Load from a JSON file.
    pub fn from_path(path: &Path) -> Result<Self, ProviderError> {
        Ok(Self::new(SnapshotFile::load(path)?))
    }

    /// Replay an in-memory snapshot.
    pub fn from_market_snapshot(snapshot: &MarketSnapshot) -> Self {
        Self::new(SnapshotFile::from(snapshot))
    }

    /// Instant the snapshot was captured; replays resolve sessions against it.
    pub fn captured_at(&self) -> DateTime<Utc> {
        self.snapshot.captured_at
    }

    pub fn ticker(&self) -> &str {
        &self.snapshot.ticker
    }

    fn check_ticker(&self, ticker: &str) -> Result<(), ProviderError> {
        if self.snapshot.ticker.eq_ignore_ascii_case(ticker) {
            Ok(())
        } else {
            Err(ProviderError::UnknownTicker(ticker.to_string()))
        }
    }
}

impl ChainProvider for SnapshotProvider {
    async fn current_price(&self, ticker: &str) -> Result<Decimal, ProviderError> {
        self.check_ticker(ticker)?;
        Ok(self.snapshot.underlying_price)
    }

    async fn expirations(&self, ticker: &str) -> Result<Vec<NaiveDate>, ProviderError> {
        self.check_ticker(ticker)?;
        if self.snapshot.chains.is_empty() {
            return Err(ProviderError::NoExpirations(ticker.to_string()));
        }
        Ok(self.snapshot.chains.iter().map(|c| c.expiration).collect())
    }

    async fn chain(
        &self,
        ticker: &str,
        expiration: NaiveDate,
    ) -> Result<ContractChain, ProviderError> {
        self.check_ticker(ticker)?;
        let raw = self
            .snapshot
            .chains
            .iter()
            .find(|c| c.expiration == expiration)
            .ok_or_else(|| ProviderError::MissingChain {
                ticker: ticker.to_string(),
                expiration,
            })?;

        Ok(raw.to_chain()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn sample_snapshot() -> MarketSnapshot {
        let expiration = NaiveDate::from_ymd_opt(2024, 2, 16).unwrap();
        let mut chain = ContractChain::new(expiration);
        chain.add_contract(Contract {
            symbol: "NVDA240216C00700000".to_string(),
            option_type: OptionType::Call,
            expiration,
            strike: dec!(700),
            last_price: dec!(3.15),
            last_trade: Utc.with_ymd_and_hms(2024, 1, 26, 20, 59, 58).unwrap(),
            volume: 1520,
            open_interest: 8841,
            implied_volatility: 0.49,
        });

        let mut snapshot = MarketSnapshot::new(
            "NVDA",
            Utc.with_ymd_and_hms(2024, 1, 26, 21, 5, 0).unwrap(),
            dec!(610.31),
        );
        snapshot.chains.push(chain);
        snapshot
    }

    #[tokio::test]
    async fn test_replay_matches_captured_snapshot() {
        let snapshot = sample_snapshot();
        let provider = SnapshotProvider::from_market_snapshot(&snapshot);
        let expiration = snapshot.chains[0].expiration;

        assert_eq!(provider.current_price("nvda").await.unwrap(), dec!(610.31));
        assert_eq!(provider.expirations("NVDA").await.unwrap(), vec![expiration]);
        assert_eq!(
            provider.chain("NVDA", expiration).await.unwrap(),
            snapshot.chains[0]
        );
    }

    #[tokio::test]
    async fn test_unknown_ticker_and_missing_chain() {
        let provider = SnapshotProvider::from_market_snapshot(&sample_snapshot());

        assert!(matches!(
            provider.current_price("AMD").await,
            Err(ProviderError::UnknownTicker(_))
        ));

        let other = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        assert!(matches!(
            provider.chain("NVDA", other).await,
            Err(ProviderError::MissingChain { .. })
        ));
    }

    #[tokio::test]
    async fn test_time_only_timestamp_fails_chain() {
        let mut file = SnapshotFile::from(&sample_snapshot());
        file.chains[0].calls[0].last_trade_date = Some("15:59".to_string());
        let provider = SnapshotProvider::new(file);

        let expiration = NaiveDate::from_ymd_opt(2024, 2, 16).unwrap();
        assert!(matches!(
            provider.chain("NVDA", expiration).await,
            Err(ProviderError::Data(DataError::TimeOnlyTimestamp(_)))
        ));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshots").join("nvda.json");

        let file = SnapshotFile::from(&sample_snapshot());
        file.save(&path).unwrap();

        let loaded = SnapshotFile::load(&path).unwrap();
        assert_eq!(loaded, file);
    }
}
