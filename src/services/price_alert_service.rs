use std::sync::Arc;

use ethers::types::H160;

use crate::enums::{ AlertCondition, Network };
use crate::error::{ AppError, Result };
use crate::providers::{
    AlertStore,
    MarketDataProvider,
    NewPriceAlert,
    NewWalletAlert,
    Notifier,
    PriceAlert,
    TokenInfo,
    WalletAlert,
};
use crate::services::price_service::TokenIndex;

/// Result of a create request. An already-satisfied Exact/Above/Below
/// condition is answered with a one-shot notification and nothing is
/// persisted: storing it with `last_price == current` would make the
/// crossing condition permanently unreachable.
#[derive(Debug, Clone, PartialEq)]
pub enum CreateAlertOutcome {
    Created {
        alert: PriceAlert,
        current_price: f64,
    },
    AlreadySatisfied {
        current_price: f64,
    },
}

/// Synchronous creation path: resolves the token, captures the price
/// baseline and persists the alert.
pub struct PriceAlertService {
    store: Arc<dyn AlertStore>,
    market: Arc<dyn MarketDataProvider>,
    token_index: Arc<TokenIndex>,
    notifier: Arc<dyn Notifier>,
    exact_tolerance: f64,
    default_min_value: f64,
}

impl PriceAlertService {
    pub fn new(
        store: Arc<dyn AlertStore>,
        market: Arc<dyn MarketDataProvider>,
        token_index: Arc<TokenIndex>,
        notifier: Arc<dyn Notifier>,
        exact_tolerance: f64,
        default_min_value: f64
    ) -> Self {
        Self {
            store,
            market,
            token_index,
            notifier,
            exact_tolerance,
            default_min_value,
        }
    }

    /// Resolve a symbol and fetch its current USD price.
    pub async fn current_price(&self, symbol: &str) -> Result<(TokenInfo, f64)> {
        let token = self.token_index
            .resolve(symbol)
            .cloned()
            .ok_or_else(|| AppError::TokenNotFound(symbol.to_uppercase()))?;

        let prices = self.market.prices(std::slice::from_ref(&token.provider_id)).await?;

        let price = prices
            .get(&token.provider_id)
            .copied()
            .ok_or_else(|| {
                AppError::PriceUnavailable(format!("No price returned for {}", token.symbol))
            })?;

        Ok((token, price))
    }

    /// Create a price alert for a user.
    pub async fn create_alert(
        &self,
        user_id: &str,
        symbol: &str,
        condition: AlertCondition
    ) -> Result<CreateAlertOutcome> {
        let (token, current_price) = self.current_price(symbol).await?;

        if condition.already_satisfied(current_price, self.exact_tolerance) {
            let text = immediate_alert_message(&token.symbol, &condition, current_price);

            if let Err(e) = self.notifier.send(user_id, &text, false).await {
                tracing::warn!("Failed to send immediate alert to user {}: {}", user_id, e);
            }

            return Ok(CreateAlertOutcome::AlreadySatisfied { current_price });
        }

        let alert = self.store.append_alert(user_id, NewPriceAlert {
            token: token.symbol,
            condition,
            last_price: current_price,
        }).await?;

        tracing::info!("User {} created {} alert for {}", user_id, alert.condition.kind(), alert.token);

        Ok(CreateAlertOutcome::Created { alert, current_price })
    }

    /// Create a wallet alert for a user. The address is validated as an
    /// EVM address and normalized to lowercase before persisting.
    pub async fn create_wallet_alert(
        &self,
        user_id: &str,
        address: &str,
        network: &str,
        min_value: Option<f64>,
        name: Option<String>
    ) -> Result<WalletAlert> {
        let parsed: H160 = address.parse().map_err(|_| AppError::InvalidAddress)?;
        let network = network.parse::<Network>()?;

        let min_value = min_value.unwrap_or(self.default_min_value);
        if !min_value.is_finite() || min_value <= 0.0 {
            return Err(AppError::InvalidAmount(format!("Minimum value must be positive: {}", min_value)));
        }

        let alert = self.store.append_wallet_alert(user_id, NewWalletAlert {
            address: format!("{:#x}", parsed),
            network,
            min_value,
            name,
        }).await?;

        tracing::info!("User {} now tracking {} on {}", user_id, alert.address, network);

        Ok(alert)
    }
}

fn immediate_alert_message(symbol: &str, condition: &AlertCondition, current_price: f64) -> String {
    let (relation, target) = match condition {
        AlertCondition::Exact { target_price } => ("already at", *target_price),
        AlertCondition::Above { target_price } => ("already above", *target_price),
        AlertCondition::Below { target_price } => ("already below", *target_price),
        // already_satisfied() is never true for percentage alerts
        AlertCondition::Percentage { .. } => ("at", current_price),
    };

    format!(
        "🚨 Immediate Price Alert!\n\n\
        {symbol} is {relation} your target price!\n\
        💰 Current price: ${current:.2}\n\
        🎯 Target price: ${target:.2}\n\n\
        Want to set another alert? Use /subscribe",
        symbol = symbol,
        relation = relation,
        current = current_price,
        target = target,
    )
}
