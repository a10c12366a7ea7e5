pub mod alert_store;
pub mod chain_provider;
pub mod market_data;
pub mod notifier;

pub use alert_store::{
    AlertStore,
    NewPriceAlert,
    NewWalletAlert,
    PriceAlert,
    UserPriceAlerts,
    UserWalletAlerts,
    WalletAlert,
};
pub use chain_provider::{BlockData, BlockTransaction, BlockchainProvider};
pub use market_data::{MarketDataProvider, TokenInfo};
pub use notifier::Notifier;
