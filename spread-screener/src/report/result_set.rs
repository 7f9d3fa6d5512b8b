use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

use crate::analytics::{SpreadCandidate, Strategy};

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// One accepted spread as written to the report. Field order is column order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ReportRow {
    #[serde(rename = "Short Leg Strike")]
    pub short_strike: Decimal,
    #[serde(rename = "Short Leg Premium")]
    pub short_premium: Decimal,
    #[serde(rename = "Short Leg Volume")]
    pub short_volume: i64,
    #[serde(rename = "Short Leg Open Interest")]
    pub short_open_interest: i64,
    #[serde(rename = "Long Leg Strike")]
    pub long_strike: Decimal,
    #[serde(rename = "Long Leg Premium")]
    pub long_premium: Decimal,
    #[serde(rename = "Margin Requirement")]
    pub margin_requirement: Decimal,
    #[serde(rename = "Net Premium")]
    pub net_premium: Decimal,
    #[serde(rename = "Return (%)")]
    pub return_pct: Decimal,
    #[serde(rename = "Distance (%)")]
    pub distance_pct: Decimal,
    #[serde(rename = "Daily Distance (%)")]
    pub daily_distance_pct: Decimal,
    #[serde(rename = "Days to Expiration")]
    pub dte: i64,
    #[serde(rename = "Business Days to Expiration")]
    pub business_days: i64,
    #[serde(rename = "Expiration Date")]
    pub expiration: NaiveDate,
    #[serde(rename = "Last Trade (Short Leg)")]
    pub short_last_trade: DateTime<Utc>,
    #[serde(rename = "Last Trade (Long Leg)")]
    pub long_last_trade: DateTime<Utc>,
    #[serde(rename = "IV (Short Leg)")]
    pub short_iv: Decimal,
    #[serde(rename = "IV (Long Leg)")]
    pub long_iv: Decimal,
}

impl From<&SpreadCandidate> for ReportRow {
    fn from(c: &SpreadCandidate) -> Self {
        let iv = |v: f64| Decimal::try_from(v).unwrap_or_default().round_dp(2);

        Self {
            short_strike: c.short.strike.round_dp(2),
            short_premium: c.short.last_price.round_dp(2),
            short_volume: c.short.volume,
            short_open_interest: c.short.open_interest,
            long_strike: c.long.strike.round_dp(2),
            long_premium: c.long.last_price.round_dp(2),
            margin_requirement: c.margin_requirement,
            net_premium: c.net_premium,
            return_pct: c.return_pct,
            distance_pct: c.distance_pct,
            daily_distance_pct: c.daily_distance_pct,
            dte: c.dte,
            business_days: c.business_days,
            expiration: c.expiration,
            short_last_trade: c.short.last_trade,
            long_last_trade: c.long.last_trade,
            short_iv: iv(c.short.implied_volatility),
            long_iv: iv(c.long.implied_volatility),
        }
    }
}

/// Where a report ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    Written { path: PathBuf, rows: usize },
    Empty,
}

/// Accepted spreads for one strategy, ranked by return and free of
/// duplicate rows.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultSet {
    strategy: Strategy,
    rows: Vec<ReportRow>,
}

impl ResultSet {
    pub fn from_candidates(strategy: Strategy, candidates: &[SpreadCandidate]) -> Self {
        Self::from_rows(strategy, candidates.iter().map(ReportRow::from).collect())
    }

    /// Sort by return descending (ties keep input order), then drop exact
    /// duplicates keeping the first.
    pub fn from_rows(strategy: Strategy, mut rows: Vec<ReportRow>) -> Self {
        rows.sort_by(|a, b| b.return_pct.cmp(&a.return_pct));

        let mut seen = HashSet::new();
        rows.retain(|row| seen.insert(row.clone()));

        Self { strategy, rows }
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    pub fn rows(&self) -> &[ReportRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Write every row to `path` with a header line.
    pub fn write_csv(&self, path: &Path) -> Result<(), ReportError> {
        let mut writer = csv::Writer::from_path(path)?;
        for row in &self.rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Write the strategy's report into `output_dir`. Nothing is written
    /// for an empty set.
    pub fn export(&self, output_dir: &Path) -> Result<ExportOutcome, ReportError> {
        if self.is_empty() {
            return Ok(ExportOutcome::Empty);
        }

        if !output_dir.as_os_str().is_empty() {
            fs::create_dir_all(output_dir)?;
        }
        let path = output_dir.join(self.strategy.report_file_name());
        self.write_csv(&path)?;

        Ok(ExportOutcome::Written {
            path,
            rows: self.rows.len(),
        })
    }
}

impl ExportOutcome {
    /// Human-readable result line for the console.
    pub fn message(&self, strategy: Strategy) -> String {
        match self {
            Self::Written { path, rows } => {
                format!("Results saved to '{}' ({} spreads).", path.display(), rows)
            }
            Self::Empty => format!(
                "No qualifying {} spreads found that meet the criteria.",
                strategy
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn row(short_strike: Decimal, return_pct: Decimal) -> ReportRow {
        ReportRow {
            short_strike,
            short_premium: dec!(3.00),
            short_volume: 100,
            short_open_interest: 1000,
            long_strike: short_strike + dec!(15),
            long_premium: dec!(1.00),
            margin_requirement: dec!(15),
            net_premium: dec!(2.00),
            return_pct,
            distance_pct: dec!(15.00),
            daily_distance_pct: dec!(0.75),
            dte: 20,
            business_days: 15,
            expiration: NaiveDate::from_ymd_opt(2024, 2, 15).unwrap(),
            short_last_trade: Utc.with_ymd_and_hms(2024, 1, 26, 20, 0, 0).unwrap(),
            long_last_trade: Utc.with_ymd_and_hms(2024, 1, 26, 20, 5, 0).unwrap(),
            short_iv: dec!(0.52),
            long_iv: dec!(0.61),
        }
    }

    #[test]
    fn test_sorted_by_return_and_deduplicated() {
        let rows = vec![
            row(dec!(115), dec!(8.10)),
            row(dec!(120), dec!(13.33)),
            row(dec!(115), dec!(8.10)),
            row(dec!(125), dec!(9.75)),
        ];
        let set = ResultSet::from_rows(Strategy::BearCall, rows);

        assert_eq!(set.len(), 3);
        let returns: Vec<_> = set.rows().iter().map(|r| r.return_pct).collect();
        assert_eq!(returns, vec![dec!(13.33), dec!(9.75), dec!(8.10)]);
        assert!(set.rows().windows(2).all(|w| w[0].return_pct >= w[1].return_pct));
    }

    #[test]
    fn test_empty_set_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let set = ResultSet::from_rows(Strategy::BullPut, Vec::new());

        let outcome = set.export(dir.path()).unwrap();
        assert_eq!(outcome, ExportOutcome::Empty);
        assert!(!dir.path().join("bull_put_spreads.csv").exists());
        assert_eq!(
            outcome.message(Strategy::BullPut),
            "No qualifying bull put spreads found that meet the criteria."
        );
    }

    #[test]
    fn test_csv_columns_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let set = ResultSet::from_rows(Strategy::BearCall, vec![row(dec!(115), dec!(13.33))]);

        let outcome = set.export(dir.path()).unwrap();
        let path = dir.path().join("bear_call_spreads.csv");
        assert_eq!(outcome, ExportOutcome::Written { path: path.clone(), rows: 1 });

        let content = fs::read_to_string(&path).unwrap();
        let mut lines = content.lines();
        assert_eq!(
            lines.next().unwrap(),
            "Short Leg Strike,Short Leg Premium,Short Leg Volume,Short Leg Open Interest,\
             Long Leg Strike,Long Leg Premium,Margin Requirement,Net Premium,Return (%),\
             Distance (%),Daily Distance (%),Days to Expiration,Business Days to Expiration,\
             Expiration Date,Last Trade (Short Leg),Last Trade (Long Leg),IV (Short Leg),IV (Long Leg)"
        );
        let record = lines.next().unwrap();
        assert!(record.starts_with("115,3.00,100,1000,130,1.00,15,2.00,13.33,15.00,0.75,20,15,2024-02-15,"));
        assert!(record.ends_with(",0.52,0.61"));
        assert!(lines.next().is_none());
    }
}
