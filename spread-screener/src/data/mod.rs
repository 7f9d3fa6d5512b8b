pub mod provider;
pub mod snapshot;
pub mod symbol;
pub mod types;
pub mod yahoo;

pub use provider::{ChainProvider, ProviderError};
pub use snapshot::{RawChain, RawContract, SnapshotFile, SnapshotProvider};
pub use symbol::OccSymbol;
pub use types::{parse_last_trade, Contract, ContractChain, DataError, MarketSnapshot, OptionType};
pub use yahoo::YahooClient;
