//! Vertical credit spread strategies.
//!
//! Both strategies sell the contract closer to the money and buy one further
//! out on the same side; they differ only in which side of the chain they
//! use and in which direction "further out" points.

use std::cmp::Ordering;
use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::data::{Contract, OptionType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// Short lower-strike call, long higher-strike call.
    BearCall,
    /// Short higher-strike put, long lower-strike put.
    BullPut,
}

impl Strategy {
    pub const ALL: [Strategy; 2] = [Strategy::BearCall, Strategy::BullPut];

    pub fn option_type(self) -> OptionType {
        match self {
            Self::BearCall => OptionType::Call,
            Self::BullPut => OptionType::Put,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::BearCall => "bear call",
            Self::BullPut => "bull put",
        }
    }

    /// CSV file the strategy's report is written to.
    pub fn report_file_name(self) -> &'static str {
        match self {
            Self::BearCall => "bear_call_spreads.csv",
            Self::BullPut => "bull_put_spreads.csv",
        }
    }

    /// Strictly out of the money; at-the-money strikes are excluded.
    pub fn is_out_of_the_money(self, strike: Decimal, underlying_price: Decimal) -> bool {
        match self {
            Self::BearCall => strike > underlying_price,
            Self::BullPut => strike < underlying_price,
        }
    }

    /// Chain ordering: nearest the money first.
    pub fn cmp_strikes(self, a: &Contract, b: &Contract) -> Ordering {
        match self {
            Self::BearCall => a.strike.cmp(&b.strike),
            Self::BullPut => b.strike.cmp(&a.strike),
        }
    }

    /// The long leg must sit strictly further from the money than the short.
    pub fn is_valid_pair(self, short_strike: Decimal, long_strike: Decimal) -> bool {
        match self {
            Self::BearCall => long_strike > short_strike,
            Self::BullPut => long_strike < short_strike,
        }
    }

    /// Strike width between the legs.
    pub fn margin_requirement(self, short_strike: Decimal, long_strike: Decimal) -> Decimal {
        match self {
            Self::BearCall => long_strike - short_strike,
            Self::BullPut => short_strike - long_strike,
        }
    }

    /// Price move needed to reach the short strike, in currency units.
    pub fn distance_to_short(self, short_strike: Decimal, underlying_price: Decimal) -> Decimal {
        match self {
            Self::BearCall => short_strike - underlying_price,
            Self::BullPut => underlying_price - short_strike,
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_otm_is_strict() {
        assert!(Strategy::BearCall.is_out_of_the_money(dec!(100.01), dec!(100)));
        assert!(!Strategy::BearCall.is_out_of_the_money(dec!(100), dec!(100)));
        assert!(Strategy::BullPut.is_out_of_the_money(dec!(99.99), dec!(100)));
        assert!(!Strategy::BullPut.is_out_of_the_money(dec!(100), dec!(100)));
    }

    #[test]
    fn test_pair_direction() {
        assert!(Strategy::BearCall.is_valid_pair(dec!(105), dec!(110)));
        assert!(!Strategy::BearCall.is_valid_pair(dec!(105), dec!(105)));
        assert!(!Strategy::BearCall.is_valid_pair(dec!(110), dec!(105)));

        assert!(Strategy::BullPut.is_valid_pair(dec!(95), dec!(90)));
        assert!(!Strategy::BullPut.is_valid_pair(dec!(95), dec!(95)));
        assert!(!Strategy::BullPut.is_valid_pair(dec!(90), dec!(95)));
    }

    #[test]
    fn test_margin_and_distance_signs() {
        assert_eq!(Strategy::BearCall.margin_requirement(dec!(105), dec!(110)), dec!(5));
        assert_eq!(Strategy::BullPut.margin_requirement(dec!(95), dec!(90)), dec!(5));
        assert_eq!(Strategy::BearCall.distance_to_short(dec!(115), dec!(100)), dec!(15));
        assert_eq!(Strategy::BullPut.distance_to_short(dec!(85), dec!(100)), dec!(15));
    }

    #[test]
    fn test_report_file_names() {
        assert_eq!(Strategy::BearCall.report_file_name(), "bear_call_spreads.csv");
        assert_eq!(Strategy::BullPut.report_file_name(), "bull_put_spreads.csv");
    }
}
