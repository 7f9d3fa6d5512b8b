//! OCC option symbol parsing.
//!
//! Layout: root (1-6 chars, may contain digits for adjusted roots), then
//! `YYMMDD`, then `C` or `P`, then the strike times 1000 as 8 digits.
//! `NVDA240216C00800000` is the NVDA 800 call expiring 2024-02-16.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use super::types::{DataError, OptionType};

const DATE_LEN: usize = 6;
const STRIKE_LEN: usize = 8;
const SUFFIX_LEN: usize = DATE_LEN + 1 + STRIKE_LEN;

/// Components of an OCC option symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OccSymbol {
    pub root: String,
    pub expiration: NaiveDate,
    pub option_type: OptionType,
    pub strike: Decimal,
}

impl OccSymbol {
    /// Parse a symbol, reading the fixed-width suffix from the right so
    /// roots of any length work.
    pub fn parse(symbol: &str) -> Result<Self, DataError> {
        let invalid = || DataError::InvalidSymbol(symbol.to_string());

        let s = symbol.trim();
        if !s.is_ascii() || s.len() <= SUFFIX_LEN {
            return Err(invalid());
        }

        let (root, suffix) = s.split_at(s.len() - SUFFIX_LEN);
        let (date_part, rest) = suffix.split_at(DATE_LEN);
        let (type_part, strike_part) = rest.split_at(1);

        let expiration = NaiveDate::parse_from_str(date_part, "%y%m%d").map_err(|_| invalid())?;
        let option_type = OptionType::from_str(type_part).ok_or_else(invalid)?;

        if !strike_part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let thousandths: i64 = strike_part.parse().map_err(|_| invalid())?;
        let strike = Decimal::new(thousandths, 3).normalize();

        Ok(Self {
            root: root.trim_end().to_string(),
            expiration,
            option_type,
            strike,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_call() {
        let sym = OccSymbol::parse("NVDA240216C00800000").unwrap();
        assert_eq!(sym.root, "NVDA");
        assert_eq!(sym.expiration, NaiveDate::from_ymd_opt(2024, 2, 16).unwrap());
        assert_eq!(sym.option_type, OptionType::Call);
        assert_eq!(sym.strike, dec!(800));
    }

    #[test]
    fn test_parse_short_root_fractional_strike() {
        let sym = OccSymbol::parse("F240119P00012500").unwrap();
        assert_eq!(sym.root, "F");
        assert_eq!(sym.option_type, OptionType::Put);
        assert_eq!(sym.strike, dec!(12.5));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(OccSymbol::parse("").is_err());
        assert!(OccSymbol::parse("240216C00800000").is_err());
        assert!(OccSymbol::parse("NVDA241316C00800000").is_err());
        assert!(OccSymbol::parse("NVDA240216X00800000").is_err());
        assert!(OccSymbol::parse("NVDA240216C0080000A").is_err());
    }
}
