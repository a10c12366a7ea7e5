use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::{ AppError, Result };
use crate::providers::{ MarketDataProvider, TokenInfo };

const COINGECKO_API_BASE: &str = "https://api.coingecko.com/api/v3";
const TOKEN_LIST_PAGE_SIZE: u32 = 250;

/// Immutable snapshot of the provider's supported tokens, keyed by
/// uppercase symbol. Built once at startup and shared as an `Arc`; a
/// refresh replaces the whole snapshot, never mutates it in place.
#[derive(Debug, Default)]
pub struct TokenIndex {
    tokens: Vec<TokenInfo>,
    by_symbol: HashMap<String, usize>,
}

impl TokenIndex {
    pub fn new(tokens: Vec<TokenInfo>) -> Self {
        let mut by_symbol = HashMap::new();

        // Tokens arrive in market-cap order; on symbol collision the
        // larger token wins (matches how users read ticker symbols)
        for (i, token) in tokens.iter().enumerate() {
            by_symbol.entry(token.symbol.to_uppercase()).or_insert(i);
        }

        Self { tokens, by_symbol }
    }

    /// Case-insensitive symbol lookup.
    pub fn resolve(&self, symbol: &str) -> Option<&TokenInfo> {
        self.by_symbol
            .get(&symbol.to_uppercase())
            .map(|&i| &self.tokens[i])
    }

    /// Exact symbol match first; otherwise substring match on symbol or
    /// name. Used by the /tokens command.
    pub fn search(&self, query: &str) -> Vec<&TokenInfo> {
        let query = query.to_lowercase();

        if let Some(token) = self.resolve(&query) {
            return vec![token];
        }

        self.tokens
            .iter()
            .filter(|t| {
                t.symbol.to_lowercase().contains(&query) || t.name.to_lowercase().contains(&query)
            })
            .collect()
    }

    pub fn all(&self) -> &[TokenInfo] {
        &self.tokens
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

#[derive(Deserialize)]
struct CoinMarket {
    id: String,
    symbol: String,
    name: String,
}

#[derive(Deserialize)]
struct SimplePriceEntry {
    usd: Option<f64>,
}

/// CoinGecko-backed market data provider.
pub struct PriceService {
    client: reqwest::Client,
    api_base: String,
}

impl PriceService {
    pub fn new() -> Self {
        Self::with_api_base(COINGECKO_API_BASE)
    }

    pub fn with_api_base(api_base: &str) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_default(),
            api_base: api_base.to_string(),
        }
    }

    async fn get(&self, url: &str, query: &[(&str, &str)]) -> Result<reqwest::Response> {
        let response = self.client
            .get(url)
            .query(query)
            .send().await
            .map_err(|e| AppError::PriceUnavailable(format!("CoinGecko request failed: {}", e)))?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(AppError::RateLimited);
        }

        if !response.status().is_success() {
            return Err(
                AppError::PriceUnavailable(
                    format!("CoinGecko returned status: {}", response.status())
                )
            );
        }

        Ok(response)
    }
}

impl Default for PriceService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MarketDataProvider for PriceService {
    async fn supported_tokens(&self) -> Result<Vec<TokenInfo>> {
        let url = format!("{}/coins/markets", self.api_base);
        let per_page = TOKEN_LIST_PAGE_SIZE.to_string();

        let response = self.get(
            &url,
            &[
                ("vs_currency", "usd"),
                ("order", "market_cap_desc"),
                ("per_page", per_page.as_str()),
                ("sparkline", "false"),
            ]
        ).await?;

        let coins: Vec<CoinMarket> = response
            .json().await
            .map_err(|e| {
                AppError::PriceUnavailable(format!("Failed to parse CoinGecko response: {}", e))
            })?;

        Ok(
            coins
                .into_iter()
                .map(|c| TokenInfo {
                    symbol: c.symbol.to_uppercase(),
                    provider_id: c.id,
                    name: c.name,
                })
                .collect()
        )
    }

    async fn prices(&self, provider_ids: &[String]) -> Result<HashMap<String, f64>> {
        if provider_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let url = format!("{}/simple/price", self.api_base);
        let ids = provider_ids.join(",");

        let response = self.get(&url, &[("ids", ids.as_str()), ("vs_currencies", "usd")]).await?;

        let prices: HashMap<String, SimplePriceEntry> = response
            .json().await
            .map_err(|e| {
                AppError::PriceUnavailable(format!("Failed to parse CoinGecko response: {}", e))
            })?;

        Ok(
            prices
                .into_iter()
                .filter_map(|(id, entry)| entry.usd.map(|price| (id, price)))
                .collect()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(symbol: &str, id: &str, name: &str) -> TokenInfo {
        TokenInfo {
            symbol: symbol.to_string(),
            provider_id: id.to_string(),
            name: name.to_string(),
        }
    }

    #[test]
    fn resolve_is_case_insensitive() {
        let index = TokenIndex::new(vec![token("BTC", "bitcoin", "Bitcoin")]);

        assert_eq!(index.resolve("btc").unwrap().provider_id, "bitcoin");
        assert_eq!(index.resolve("BTC").unwrap().provider_id, "bitcoin");
        assert!(index.resolve("DOGE").is_none());
    }

    #[test]
    fn resolve_prefers_first_listed_on_symbol_collision() {
        let index = TokenIndex::new(
            vec![token("UNI", "uniswap", "Uniswap"), token("UNI", "unicorn", "Unicorn")]
        );

        assert_eq!(index.resolve("uni").unwrap().provider_id, "uniswap");
    }

    #[test]
    fn search_exact_symbol_beats_substring() {
        let index = TokenIndex::new(
            vec![token("SOL", "solana", "Solana"), token("LSOL", "liquid-sol", "Liquid SOL")]
        );

        let results = index.search("sol");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].provider_id, "solana");

        let results = index.search("liquid");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].provider_id, "liquid-sol");
    }
}
