use async_trait::async_trait;
use uuid::Uuid;

use crate::enums::{AlertCondition, Network};
use crate::error::Result;

/// A persisted price alert, owned by a user.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceAlert {
    pub id: Uuid,
    /// Uppercase ticker symbol.
    pub token: String,
    pub condition: AlertCondition,
    /// Price observed on the most recent non-triggering cycle.
    pub last_price: f64,
}

/// A persisted wallet alert. Never auto-removed; the monitor watches it
/// indefinitely.
#[derive(Debug, Clone, PartialEq)]
pub struct WalletAlert {
    pub id: Uuid,
    /// Lowercase 0x-prefixed hex address.
    pub address: String,
    pub network: Network,
    /// Minimum transaction value in native units.
    pub min_value: f64,
    pub name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewPriceAlert {
    pub token: String,
    pub condition: AlertCondition,
    pub last_price: f64,
}

#[derive(Debug, Clone)]
pub struct NewWalletAlert {
    pub address: String,
    pub network: Network,
    pub min_value: f64,
    pub name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct UserPriceAlerts {
    pub user_id: String,
    pub alerts: Vec<PriceAlert>,
}

#[derive(Debug, Clone)]
pub struct UserWalletAlerts {
    pub user_id: String,
    pub alerts: Vec<WalletAlert>,
}

/// Narrow read/write contract over the persisted alert state. The
/// monitor and scanner re-read through this trait every cycle/block, so
/// concurrent creations and deletions are picked up on the next read.
#[async_trait]
pub trait AlertStore: Send + Sync {
    /// All users holding at least one price alert.
    async fn users_with_alerts(&self) -> Result<Vec<UserPriceAlerts>>;

    /// All users holding at least one wallet alert on the given network.
    async fn users_with_wallet_alerts(&self, network: Network) -> Result<Vec<UserWalletAlerts>>;

    /// Append a price alert to a user, creating the user if absent.
    async fn append_alert(&self, user_id: &str, alert: NewPriceAlert) -> Result<PriceAlert>;

    /// Append a wallet alert to a user, creating the user if absent.
    async fn append_wallet_alert(
        &self,
        user_id: &str,
        alert: NewWalletAlert
    ) -> Result<WalletAlert>;

    /// Record the price observed for a non-triggering alert.
    async fn update_alert_last_price(
        &self,
        user_id: &str,
        alert_id: Uuid,
        price: f64
    ) -> Result<()>;

    /// Remove an alert. Deleting an already-deleted alert is a no-op.
    async fn delete_alert(&self, user_id: &str, alert_id: Uuid) -> Result<()>;
}
