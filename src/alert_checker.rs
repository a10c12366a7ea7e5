use std::collections::{ BTreeMap, HashMap };
use std::sync::Arc;

use tokio::sync::watch;
use tokio::time::{ interval, sleep, MissedTickBehavior };

use crate::config::MonitorConfig;
use crate::enums::{ AlertCondition, Direction };
use crate::error::Result;
use crate::providers::{ AlertStore, MarketDataProvider, Notifier, PriceAlert };
use crate::services::price_service::TokenIndex;

/// Periodic price alert monitor. Each cycle reads every alert from the
/// store, fetches prices in rate-limited batches, evaluates triggers and
/// writes the results back. Cycles never overlap: a tick that fires
/// while a cycle is still running is skipped.
pub struct AlertChecker {
    store: Arc<dyn AlertStore>,
    market: Arc<dyn MarketDataProvider>,
    token_index: Arc<TokenIndex>,
    notifier: Arc<dyn Notifier>,
    config: MonitorConfig,
}

impl AlertChecker {
    pub fn new(
        store: Arc<dyn AlertStore>,
        market: Arc<dyn MarketDataProvider>,
        token_index: Arc<TokenIndex>,
        notifier: Arc<dyn Notifier>,
        config: MonitorConfig
    ) -> Self {
        Self {
            store,
            market,
            token_index,
            notifier,
            config,
        }
    }

    /// Run the monitor until the shutdown signal flips. An in-flight
    /// cycle is allowed to finish.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut interval = interval(self.config.check_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!(
            "Price alert monitor started (interval {:?}, batch size {})",
            self.config.check_interval,
            self.config.batch_size
        );

        loop {
            // Biased so a pending stop always wins over an already-due
            // tick: no new cycle starts after shutdown
            tokio::select! {
                biased;
                _ = shutdown.changed() => {
                    tracing::info!("Price alert monitor stopping");
                    break;
                }
                _ = interval.tick() => {
                    self.run_cycle().await;
                }
            }
        }
    }

    /// One full evaluation cycle. Never propagates errors; every
    /// per-batch and per-alert failure is logged and isolated.
    pub async fn run_cycle(&self) {
        let users = match self.store.users_with_alerts().await {
            Ok(users) => users,
            Err(e) => {
                tracing::error!("Failed to load alerts: {}", e);
                return;
            }
        };

        if users.is_empty() {
            return;
        }

        // Group alerts by token across all users so each token's price
        // is fetched once per cycle
        let mut token_alerts: BTreeMap<String, Vec<(String, PriceAlert)>> = BTreeMap::new();
        for user in users {
            for alert in user.alerts {
                token_alerts
                    .entry(alert.token.clone())
                    .or_default()
                    .push((user.user_id.clone(), alert));
            }
        }

        let tokens: Vec<String> = token_alerts.keys().cloned().collect();
        let batch_size = self.config.batch_size.max(1);
        tracing::debug!(
            "Checking {} tokens across {} batches",
            tokens.len(),
            tokens.chunks(batch_size).len()
        );

        for (i, batch) in tokens.chunks(batch_size).enumerate() {
            if i > 0 {
                sleep(self.config.batch_delay).await;
            }
            self.process_batch(batch, &token_alerts).await;
        }
    }

    async fn process_batch(
        &self,
        batch: &[String],
        token_alerts: &BTreeMap<String, Vec<(String, PriceAlert)>>
    ) {
        // Resolve symbols to provider ids; unresolved tokens are skipped
        // for the cycle
        let mut resolved: Vec<(&String, String)> = Vec::new();
        for token in batch {
            match self.token_index.resolve(token) {
                Some(info) => resolved.push((token, info.provider_id.clone())),
                None => {
                    tracing::warn!("Token {} not in supported-token index, skipping", token);
                }
            }
        }

        if resolved.is_empty() {
            return;
        }

        let ids: Vec<String> = resolved
            .iter()
            .map(|(_, id)| id.clone())
            .collect();

        let prices = match self.fetch_prices_with_retry(&ids).await {
            Ok(prices) => prices,
            Err(e) => {
                tracing::warn!("Price fetch failed, skipping batch this cycle: {}", e);
                return;
            }
        };

        for (token, provider_id) in resolved {
            let current = match prices.get(&provider_id) {
                Some(price) => *price,
                None => {
                    tracing::debug!("No price for {} this cycle", token);
                    continue;
                }
            };

            if let Some(alerts) = token_alerts.get(token) {
                for (user_id, alert) in alerts {
                    self.evaluate_alert(user_id, alert, current).await;
                }
            }
        }
    }

    /// Bounded iterative retry on rate-limit responses.
    async fn fetch_prices_with_retry(&self, ids: &[String]) -> Result<HashMap<String, f64>> {
        let mut attempt = 0;
        loop {
            match self.market.prices(ids).await {
                Ok(prices) => {
                    return Ok(prices);
                }
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    attempt += 1;
                    tracing::debug!(
                        "Rate limited, retry {}/{} after {:?}",
                        attempt,
                        self.config.max_retries,
                        self.config.retry_delay
                    );
                    sleep(self.config.retry_delay).await;
                }
                Err(e) => {
                    return Err(e);
                }
            }
        }
    }

    /// Evaluate one alert against the freshly fetched price. A triggered
    /// alert is deleted regardless of the notification outcome so a
    /// satisfied condition cannot re-fire every cycle; delivery is
    /// at-most-once.
    async fn evaluate_alert(&self, user_id: &str, alert: &PriceAlert, current: f64) {
        let triggered = alert.condition.should_trigger(
            alert.last_price,
            current,
            self.config.exact_tolerance
        );

        if triggered {
            let text = trigger_message(alert, current);
            if let Err(e) = self.notifier.send(user_id, &text, false).await {
                tracing::warn!("Failed to notify user {}: {}", user_id, e);
            }

            match self.store.delete_alert(user_id, alert.id).await {
                Ok(()) =>
                    tracing::info!(
                        "Alert triggered for user {} - {} {} at ${:.4}",
                        user_id,
                        alert.token,
                        alert.condition.kind(),
                        current
                    ),
                Err(e) =>
                    tracing::error!("Failed to delete triggered alert {}: {}", alert.id, e),
            }
        } else if let Err(e) = self.store.update_alert_last_price(user_id, alert.id, current).await {
            tracing::error!("Failed to update last price for alert {}: {}", alert.id, e);
        }
    }
}

fn trigger_message(alert: &PriceAlert, current: f64) -> String {
    let detail = match &alert.condition {
        AlertCondition::Percentage { direction, .. } => {
            let change = ((current - alert.last_price) / alert.last_price).abs() * 100.0;
            let moved = match direction {
                Direction::Up => "up",
                Direction::Down => "down",
            };
            format!("{} has moved {:.2}% {}!", alert.token, change, moved)
        }
        AlertCondition::Exact { .. } => {
            format!("{} has reached ${:.2}!", alert.token, current)
        }
        AlertCondition::Above { target_price } => {
            format!("{} has gone above ${:.2}!", alert.token, target_price)
        }
        AlertCondition::Below { target_price } => {
            format!("{} has gone below ${:.2}!", alert.token, target_price)
        }
    };

    format!(
        "🚨 Price Alert!\n\n\
        {detail}\n\
        💰 Current price: ${current:.2}\n\
        📊 Previous price: ${previous:.2}\n\n\
        Want to set another alert? Use /subscribe",
        detail = detail,
        current = current,
        previous = alert.last_price,
    )
}
