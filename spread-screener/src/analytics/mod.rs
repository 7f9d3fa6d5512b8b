//! Options analytics module.
//!
//! Provides:
//! - Bear call / bull put strategy definitions
//! - Vertical spread enumeration, pricing and filtering

pub mod spread_screener;
pub mod strategy;

pub use spread_screener::{enumerate_pairs, evaluate_pair, ScreenContext, SpreadCandidate, SpreadScreener};
pub use strategy::Strategy;
