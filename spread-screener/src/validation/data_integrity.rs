//! Data integrity validation for fetched option chains.
//!
//! Validates:
//! - Strike positive, last price non-negative
//! - Volume and open interest non-negative
//! - IV finite and non-negative
//! - Contract symbol agrees with side, strike and chain expiration
//! - Duplicate strikes within one side of a chain

use std::collections::HashSet;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::data::{Contract, ContractChain, DataError, MarketSnapshot, OccSymbol};

/// IV above this is reported as suspicious but not rejected.
const IV_SANITY_CEILING: f64 = 5.0;

/// Result of a single validation check.
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub name: String,
    pub passed: bool,
    pub message: String,
    pub details: Option<String>,
}

impl CheckResult {
    pub fn pass(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            passed: true,
            message: message.to_string(),
            details: None,
        }
    }

    pub fn fail(name: &str, message: &str, details: Option<String>) -> Self {
        Self {
            name: name.to_string(),
            passed: false,
            message: message.to_string(),
            details,
        }
    }
}

/// Complete data integrity report for one snapshot.
#[derive(Debug)]
pub struct DataIntegrityReport {
    pub ticker: String,
    pub chain_count: usize,
    pub contract_count: usize,
    pub checks: Vec<CheckResult>,
}

impl DataIntegrityReport {
    pub fn all_passed(&self) -> bool {
        self.checks.iter().all(|c| c.passed)
    }

    pub fn failed_checks(&self) -> Vec<&CheckResult> {
        self.checks.iter().filter(|c| !c.passed).collect()
    }

    pub fn summary(&self) -> String {
        let passed = self.checks.iter().filter(|c| c.passed).count();
        let total = self.checks.len();
        format!(
            "{} ({} chains, {} contracts): {}/{} checks passed",
            self.ticker, self.chain_count, self.contract_count, passed, total
        )
    }
}

/// Validator for option chain contents.
#[derive(Debug, Default, Clone, Copy)]
pub struct DataIntegrityValidator;

impl DataIntegrityValidator {
    pub fn new() -> Self {
        Self
    }

    /// Check one contract. A failing contract must not be paired.
    pub fn check_contract(&self, contract: &Contract, expiration: NaiveDate) -> Result<(), DataError> {
        let invalid = |field: &'static str, value: String| DataError::InvalidValue {
            symbol: contract.symbol.clone(),
            field,
            value,
        };

        if contract.strike <= Decimal::ZERO {
            return Err(invalid("strike", contract.strike.to_string()));
        }
        if contract.last_price < Decimal::ZERO {
            return Err(invalid("lastPrice", contract.last_price.to_string()));
        }
        if contract.volume < 0 {
            return Err(invalid("volume", contract.volume.to_string()));
        }
        if contract.open_interest < 0 {
            return Err(invalid("openInterest", contract.open_interest.to_string()));
        }
        if !contract.implied_volatility.is_finite() || contract.implied_volatility < 0.0 {
            return Err(invalid(
                "impliedVolatility",
                contract.implied_volatility.to_string(),
            ));
        }

        let occ = OccSymbol::parse(&contract.symbol)?;
        if occ.expiration != expiration || contract.expiration != expiration {
            return Err(DataError::ExpirationMismatch {
                symbol: contract.symbol.clone(),
                expected: expiration,
                found: occ.expiration,
            });
        }
        if occ.option_type != contract.option_type {
            return Err(invalid("optionType", contract.option_type.as_str().to_string()));
        }
        if occ.strike != contract.strike {
            return Err(invalid("strike", format!("{} (symbol says {})", contract.strike, occ.strike)));
        }

        Ok(())
    }

    /// Run all checks over a snapshot.
    pub fn validate(&self, snapshot: &MarketSnapshot) -> DataIntegrityReport {
        let checks = vec![
            self.check_underlying_price(snapshot),
            self.check_contract_fields(snapshot),
            self.check_duplicate_strikes(snapshot),
            self.check_iv_range(snapshot),
        ];

        DataIntegrityReport {
            ticker: snapshot.ticker.clone(),
            chain_count: snapshot.chains.len(),
            contract_count: snapshot.total_contracts(),
            checks,
        }
    }

    fn check_underlying_price(&self, snapshot: &MarketSnapshot) -> CheckResult {
        if snapshot.underlying_price > Decimal::ZERO {
            CheckResult::pass(
                "underlying_price",
                &format!("Underlying at {}", snapshot.underlying_price),
            )
        } else {
            CheckResult::fail(
                "underlying_price",
                "Underlying price is not positive",
                Some(snapshot.underlying_price.to_string()),
            )
        }
    }

    fn check_contract_fields(&self, snapshot: &MarketSnapshot) -> CheckResult {
        let failures: Vec<String> = snapshot
            .chains
            .iter()
            .flat_map(|chain| {
                chain
                    .calls
                    .iter()
                    .chain(chain.puts.iter())
                    .filter_map(move |c| self.check_contract(c, chain.expiration).err())
            })
            .map(|e| e.to_string())
            .collect();

        if failures.is_empty() {
            CheckResult::pass("contract_fields", "All contracts well-formed")
        } else {
            CheckResult::fail(
                "contract_fields",
                &format!("{} invalid contracts", failures.len()),
                Some(failures.into_iter().take(5).collect::<Vec<_>>().join("; ")),
            )
        }
    }

    fn check_duplicate_strikes(&self, snapshot: &MarketSnapshot) -> CheckResult {
        let mut duplicates = Vec::new();
        for chain in &snapshot.chains {
            for (label, side) in [("calls", &chain.calls), ("puts", &chain.puts)] {
                let count = duplicate_strikes(side);
                if count > 0 {
                    duplicates.push(format!("{} {}: {}", chain.expiration, label, count));
                }
            }
        }

        if duplicates.is_empty() {
            CheckResult::pass("duplicate_strikes", "No duplicate strikes")
        } else {
            CheckResult::fail(
                "duplicate_strikes",
                &format!("{} chain sides with duplicate strikes", duplicates.len()),
                Some(duplicates.join("; ")),
            )
        }
    }

    fn check_iv_range(&self, snapshot: &MarketSnapshot) -> CheckResult {
        let extreme = snapshot
            .chains
            .iter()
            .flat_map(|c: &ContractChain| c.calls.iter().chain(c.puts.iter()))
            .filter(|c| c.implied_volatility > IV_SANITY_CEILING)
            .count();

        if extreme == 0 {
            CheckResult::pass("iv_range", "All IVs within sanity range")
        } else {
            CheckResult::fail(
                "iv_range",
                &format!("{} contracts with IV above {}", extreme, IV_SANITY_CEILING),
                None,
            )
        }
    }
}

/// Number of contracts sharing a strike with an earlier contract.
fn duplicate_strikes(contracts: &[Contract]) -> usize {
    let mut seen = HashSet::new();
    contracts.iter().filter(|c| !seen.insert(c.strike)).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::OptionType;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn expiration() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 2, 16).unwrap()
    }

    fn contract(symbol: &str, option_type: OptionType, strike: Decimal) -> Contract {
        Contract {
            symbol: symbol.to_string(),
            option_type,
            expiration: expiration(),
            strike,
            last_price: dec!(2.00),
            last_trade: Utc.with_ymd_and_hms(2024, 1, 26, 20, 0, 0).unwrap(),
            volume: 100,
            open_interest: 1000,
            implied_volatility: 0.45,
        }
    }

    #[test]
    fn test_valid_contract_passes() {
        let validator = DataIntegrityValidator::new();
        let c = contract("NVDA240216C00700000", OptionType::Call, dec!(700));
        assert!(validator.check_contract(&c, expiration()).is_ok());
    }

    #[test]
    fn test_negative_open_interest_rejected() {
        let validator = DataIntegrityValidator::new();
        let mut c = contract("NVDA240216C00700000", OptionType::Call, dec!(700));
        c.open_interest = -5;

        assert!(matches!(
            validator.check_contract(&c, expiration()),
            Err(DataError::InvalidValue { field: "openInterest", .. })
        ));
    }

    #[test]
    fn test_symbol_mismatches_rejected() {
        let validator = DataIntegrityValidator::new();

        let wrong_date = contract("NVDA240315C00700000", OptionType::Call, dec!(700));
        assert!(matches!(
            validator.check_contract(&wrong_date, expiration()),
            Err(DataError::ExpirationMismatch { .. })
        ));

        let wrong_side = contract("NVDA240216P00700000", OptionType::Call, dec!(700));
        assert!(validator.check_contract(&wrong_side, expiration()).is_err());

        let wrong_strike = contract("NVDA240216C00705000", OptionType::Call, dec!(700));
        assert!(validator.check_contract(&wrong_strike, expiration()).is_err());
    }

    #[test]
    fn test_report_flags_duplicates() {
        let mut chain = ContractChain::new(expiration());
        chain.add_contract(contract("NVDA240216C00700000", OptionType::Call, dec!(700)));
        chain.add_contract(contract("NVDA240216C00700000", OptionType::Call, dec!(700)));
        chain.add_contract(contract("NVDA240216P00500000", OptionType::Put, dec!(500)));

        let mut snapshot = MarketSnapshot::new(
            "NVDA",
            Utc.with_ymd_and_hms(2024, 1, 26, 21, 0, 0).unwrap(),
            dec!(610),
        );
        snapshot.chains.push(chain);

        let report = DataIntegrityValidator::new().validate(&snapshot);
        assert!(!report.all_passed());
        let failed: Vec<_> = report.failed_checks().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(failed, vec!["duplicate_strikes"]);
        assert_eq!(report.contract_count, 3);
    }
}
