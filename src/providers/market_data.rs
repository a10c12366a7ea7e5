use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A token known to the market data provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenInfo {
    /// Uppercase ticker symbol (BTC, ETH, ...).
    pub symbol: String,
    /// Provider-specific identifier used in price queries.
    pub provider_id: String,
    /// Human-readable name.
    pub name: String,
}

#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Full list of tokens the provider can price, in descending
    /// market-cap order. Fetched once at startup to build the token index.
    async fn supported_tokens(&self) -> Result<Vec<TokenInfo>>;

    /// Current USD spot prices for a batch of provider ids. Ids the
    /// provider cannot price are absent from the result. Surfaces
    /// `AppError::RateLimited` on 429 responses.
    async fn prices(&self, provider_ids: &[String]) -> Result<HashMap<String, f64>>;
}
