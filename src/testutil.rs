//! In-memory trait doubles shared by the unit tests.

use std::collections::{ HashMap, HashSet };
use std::sync::Mutex;
use std::sync::atomic::{ AtomicBool, AtomicU32, Ordering };

use async_trait::async_trait;
use uuid::Uuid;

use crate::enums::Network;
use crate::error::{ AppError, Result };
use crate::providers::{
    AlertStore,
    BlockData,
    BlockchainProvider,
    MarketDataProvider,
    NewPriceAlert,
    NewWalletAlert,
    Notifier,
    PriceAlert,
    TokenInfo,
    UserPriceAlerts,
    UserWalletAlerts,
    WalletAlert,
};

// ─── MemoryStore ─────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryStore {
    price_alerts: Mutex<Vec<(String, PriceAlert)>>,
    wallet_alerts: Mutex<Vec<(String, WalletAlert)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn price_alerts(&self) -> Vec<(String, PriceAlert)> {
        self.price_alerts.lock().unwrap().clone()
    }

    pub fn wallet_alerts(&self) -> Vec<(String, WalletAlert)> {
        self.wallet_alerts.lock().unwrap().clone()
    }

    pub fn seed_alert(&self, user_id: &str, alert: PriceAlert) {
        self.price_alerts.lock().unwrap().push((user_id.to_string(), alert));
    }

    pub fn seed_wallet_alert(&self, user_id: &str, alert: WalletAlert) {
        self.wallet_alerts.lock().unwrap().push((user_id.to_string(), alert));
    }
}

#[async_trait]
impl AlertStore for MemoryStore {
    async fn users_with_alerts(&self) -> Result<Vec<UserPriceAlerts>> {
        let rows = self.price_alerts.lock().unwrap();
        let mut users: Vec<UserPriceAlerts> = Vec::new();

        for (user_id, alert) in rows.iter() {
            match users.iter_mut().find(|u| &u.user_id == user_id) {
                Some(user) => user.alerts.push(alert.clone()),
                None =>
                    users.push(UserPriceAlerts {
                        user_id: user_id.clone(),
                        alerts: vec![alert.clone()],
                    }),
            }
        }

        Ok(users)
    }

    async fn users_with_wallet_alerts(&self, network: Network) -> Result<Vec<UserWalletAlerts>> {
        let rows = self.wallet_alerts.lock().unwrap();
        let mut users: Vec<UserWalletAlerts> = Vec::new();

        for (user_id, alert) in rows.iter().filter(|(_, a)| a.network == network) {
            match users.iter_mut().find(|u| &u.user_id == user_id) {
                Some(user) => user.alerts.push(alert.clone()),
                None =>
                    users.push(UserWalletAlerts {
                        user_id: user_id.clone(),
                        alerts: vec![alert.clone()],
                    }),
            }
        }

        Ok(users)
    }

    async fn append_alert(&self, user_id: &str, alert: NewPriceAlert) -> Result<PriceAlert> {
        let alert = PriceAlert {
            id: Uuid::new_v4(),
            token: alert.token,
            condition: alert.condition,
            last_price: alert.last_price,
        };
        self.price_alerts.lock().unwrap().push((user_id.to_string(), alert.clone()));
        Ok(alert)
    }

    async fn append_wallet_alert(
        &self,
        user_id: &str,
        alert: NewWalletAlert
    ) -> Result<WalletAlert> {
        let alert = WalletAlert {
            id: Uuid::new_v4(),
            address: alert.address,
            network: alert.network,
            min_value: alert.min_value,
            name: alert.name,
        };
        self.wallet_alerts.lock().unwrap().push((user_id.to_string(), alert.clone()));
        Ok(alert)
    }

    async fn update_alert_last_price(
        &self,
        user_id: &str,
        alert_id: Uuid,
        price: f64
    ) -> Result<()> {
        let mut rows = self.price_alerts.lock().unwrap();
        if let Some((_, alert)) = rows.iter_mut().find(|(u, a)| u == user_id && a.id == alert_id) {
            alert.last_price = price;
        }
        Ok(())
    }

    async fn delete_alert(&self, user_id: &str, alert_id: Uuid) -> Result<()> {
        self.price_alerts.lock().unwrap().retain(|(u, a)| !(u == user_id && a.id == alert_id));
        Ok(())
    }
}

// ─── StaticMarket ────────────────────────────────────────────────────

/// Market data double with a fixed token list and scriptable prices.
pub struct StaticMarket {
    pub tokens: Vec<TokenInfo>,
    prices: Mutex<HashMap<String, f64>>,
    /// Number of RateLimited responses to serve before succeeding.
    rate_limit_next: AtomicU32,
    pub price_calls: AtomicU32,
}

impl StaticMarket {
    pub fn new(tokens: Vec<TokenInfo>) -> Self {
        Self {
            tokens,
            prices: Mutex::new(HashMap::new()),
            rate_limit_next: AtomicU32::new(0),
            price_calls: AtomicU32::new(0),
        }
    }

    pub fn with_price(symbol: &str, provider_id: &str, price: f64) -> Self {
        let market = Self::new(
            vec![TokenInfo {
                symbol: symbol.to_string(),
                provider_id: provider_id.to_string(),
                name: symbol.to_string(),
            }]
        );
        market.set_price(provider_id, price);
        market
    }

    pub fn set_price(&self, provider_id: &str, price: f64) {
        self.prices.lock().unwrap().insert(provider_id.to_string(), price);
    }

    pub fn remove_price(&self, provider_id: &str) {
        self.prices.lock().unwrap().remove(provider_id);
    }

    pub fn rate_limit_next(&self, responses: u32) {
        self.rate_limit_next.store(responses, Ordering::SeqCst);
    }
}

#[async_trait]
impl MarketDataProvider for StaticMarket {
    async fn supported_tokens(&self) -> Result<Vec<TokenInfo>> {
        Ok(self.tokens.clone())
    }

    async fn prices(&self, provider_ids: &[String]) -> Result<HashMap<String, f64>> {
        self.price_calls.fetch_add(1, Ordering::SeqCst);

        let remaining = self.rate_limit_next.load(Ordering::SeqCst);
        if remaining > 0 {
            self.rate_limit_next.store(remaining - 1, Ordering::SeqCst);
            return Err(AppError::RateLimited);
        }

        let prices = self.prices.lock().unwrap();
        Ok(
            provider_ids
                .iter()
                .filter_map(|id| prices.get(id).map(|p| (id.clone(), *p)))
                .collect()
        )
    }
}

// ─── RecordingNotifier ───────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(String, String)>>,
    fail: AtomicBool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn fail_sends(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, user_id: &str, text: &str, _disable_link_preview: bool) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(AppError::Notification("notifier down".to_string()));
        }
        self.sent.lock().unwrap().push((user_id.to_string(), text.to_string()));
        Ok(())
    }
}

// ─── ScriptedChain ───────────────────────────────────────────────────

/// Blockchain double: a head counter and pre-scripted blocks.
#[derive(Default)]
pub struct ScriptedChain {
    head: Mutex<HashMap<Network, u64>>,
    blocks: Mutex<HashMap<(Network, u64), BlockData>>,
    failing_blocks: Mutex<HashSet<(Network, u64)>>,
}

impl ScriptedChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_head(&self, network: Network, number: u64) {
        self.head.lock().unwrap().insert(network, number);
    }

    pub fn add_block(&self, network: Network, block: BlockData) {
        self.blocks.lock().unwrap().insert((network, block.number), block);
    }

    pub fn fail_block(&self, network: Network, number: u64) {
        self.failing_blocks.lock().unwrap().insert((network, number));
    }
}

#[async_trait]
impl BlockchainProvider for ScriptedChain {
    async fn latest_block_number(&self, network: Network) -> Result<u64> {
        self.head
            .lock()
            .unwrap()
            .get(&network)
            .copied()
            .ok_or_else(|| AppError::BlockFetch(format!("no head for {}", network)))
    }

    async fn block_with_transactions(
        &self,
        network: Network,
        number: u64
    ) -> Result<Option<BlockData>> {
        if self.failing_blocks.lock().unwrap().contains(&(network, number)) {
            return Err(AppError::BlockFetch(format!("block {} unavailable", number)));
        }

        Ok(self.blocks.lock().unwrap().get(&(network, number)).cloned())
    }
}
