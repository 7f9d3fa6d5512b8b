pub mod analytics;
pub mod config;
pub mod data;
pub mod pipeline;
pub mod report;
pub mod session;
pub mod validation;

// Re-export commonly used types
pub use analytics::{SpreadCandidate, SpreadScreener, Strategy};
pub use config::{ConfigError, ScreenerConfig};
pub use data::{ChainProvider, Contract, ContractChain, MarketSnapshot, OptionType, SnapshotProvider, YahooClient};
pub use pipeline::{fetch_snapshot, run, screen_snapshot, ScreenerError};
pub use report::{ExportOutcome, ResultSet};
pub use session::MarketSession;
pub use validation::DataIntegrityValidator;
