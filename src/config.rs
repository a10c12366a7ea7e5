use std::collections::HashMap;
use std::env;
use std::time::Duration;

use crate::enums::Network;

/// Per-network configuration resolved from environment variables.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    pub network: Network,
    pub rpc_url: String,
    pub explorer_url: String,
}

/// Tuning knobs for the price alert monitor.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub check_interval: Duration,
    pub batch_size: usize,
    pub batch_delay: Duration,
    pub retry_delay: Duration,
    pub max_retries: u32,
    pub exact_tolerance: f64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            check_interval: Duration::from_secs(60),
            batch_size: 50,
            batch_delay: Duration::from_millis(1000),
            retry_delay: Duration::from_millis(5000),
            max_retries: 3,
            exact_tolerance: 0.001,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub telegram_bot_token: String,
    pub database_url: String,
    pub network_configs: HashMap<Network, NetworkConfig>,
    pub monitor: MonitorConfig,
    pub block_poll_interval: Duration,
    pub default_min_value: f64,
    pub server_host: String,
    pub server_port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        dotenv::dotenv().ok();

        let telegram_bot_token = env::var("TELEGRAM_BOT_TOKEN")?;
        let database_url = env::var("DATABASE_URL")?;
        let alchemy_api_key = env::var("ALCHEMY_API_KEY").ok();

        // Build network configs from env vars, falling back to public
        // mainnet endpoints (Alchemy where a key is available)
        let mut network_configs = HashMap::new();

        for &network in Network::all() {
            let rpc_key = format!("{}_RPC_URL", network.as_str().to_uppercase());
            let explorer_key = format!("{}_EXPLORER_URL", network.as_str().to_uppercase());

            let rpc_url = match env::var(&rpc_key) {
                Ok(url) => url,
                Err(_) => match Self::default_rpc_url(network, alchemy_api_key.as_deref()) {
                    Some(url) => url,
                    None => {
                        continue;
                    }
                },
            };

            let explorer_url = env::var(&explorer_key)
                .unwrap_or_else(|_| network.explorer_url().to_string());

            network_configs.insert(network, NetworkConfig {
                network,
                rpc_url,
                explorer_url,
            });
        }

        if network_configs.is_empty() {
            return Err(
                "No network RPC URLs configured. Set ALCHEMY_API_KEY or at least one *_RPC_URL env var.".into()
            );
        }

        let monitor = MonitorConfig {
            check_interval: Duration::from_secs(
                env::var("ALERT_CHECK_INTERVAL_SECS")
                    .unwrap_or_else(|_| "60".to_string())
                    .parse()?
            ),
            batch_size: env::var("PRICE_BATCH_SIZE")
                .unwrap_or_else(|_| "50".to_string())
                .parse()?,
            batch_delay: Duration::from_millis(
                env::var("BATCH_DELAY_MS").unwrap_or_else(|_| "1000".to_string()).parse()?
            ),
            retry_delay: Duration::from_millis(
                env::var("RETRY_DELAY_MS").unwrap_or_else(|_| "5000".to_string()).parse()?
            ),
            max_retries: env::var("MAX_RETRIES").unwrap_or_else(|_| "3".to_string()).parse()?,
            exact_tolerance: env::var("EXACT_TOLERANCE")
                .unwrap_or_else(|_| "0.001".to_string())
                .parse()?,
        };

        let block_poll_interval = Duration::from_millis(
            env::var("BLOCK_POLL_INTERVAL_MS").unwrap_or_else(|_| "5000".to_string()).parse()?
        );

        let default_min_value = env::var("DEFAULT_MIN_VALUE")
            .unwrap_or_else(|_| "1".to_string())
            .parse()?;

        let server_host = env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let server_port = env::var("SERVER_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()?;

        Ok(Config {
            telegram_bot_token,
            database_url,
            network_configs,
            monitor,
            block_poll_interval,
            default_min_value,
            server_host,
            server_port,
        })
    }

    fn default_rpc_url(network: Network, alchemy_api_key: Option<&str>) -> Option<String> {
        match network {
            Network::Ethereum => alchemy_api_key
                .map(|key| format!("https://eth-mainnet.g.alchemy.com/v2/{}", key)),
            Network::Bsc => Some("https://bsc-dataseed.binance.org".to_string()),
            Network::Polygon => alchemy_api_key
                .map(|key| format!("https://polygon-mainnet.g.alchemy.com/v2/{}", key)),
        }
    }

    /// Get list of configured networks.
    pub fn configured_networks(&self) -> Vec<Network> {
        self.network_configs.keys().copied().collect()
    }
}
