//! Ranked CSV reports of accepted spreads.

pub mod result_set;

pub use result_set::{ExportOutcome, ReportError, ReportRow, ResultSet};
