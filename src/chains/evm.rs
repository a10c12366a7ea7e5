use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use ethers::providers::{ Http, Middleware, Provider };

use crate::config::NetworkConfig;
use crate::enums::Network;
use crate::error::{ AppError, Result };
use crate::providers::{ BlockData, BlockTransaction, BlockchainProvider };

/// JSON-RPC access to the configured EVM networks.
#[derive(Clone)]
pub struct EvmProvider {
    providers: HashMap<Network, Arc<Provider<Http>>>,
}

impl EvmProvider {
    pub fn new(configs: &HashMap<Network, NetworkConfig>) -> Result<Self> {
        let mut providers = HashMap::new();

        for (&network, config) in configs {
            let provider = Provider::<Http>
                ::try_from(config.rpc_url.as_str())
                .map_err(|e| {
                    AppError::Config(format!("Bad RPC URL for {}: {}", network, e))
                })?;
            providers.insert(network, Arc::new(provider));
        }

        Ok(Self { providers })
    }

    fn provider(&self, network: Network) -> Result<&Arc<Provider<Http>>> {
        self.providers
            .get(&network)
            .ok_or_else(|| AppError::InvalidNetwork(format!("{} is not configured", network)))
    }
}

#[async_trait]
impl BlockchainProvider for EvmProvider {
    async fn latest_block_number(&self, network: Network) -> Result<u64> {
        let number = self
            .provider(network)?
            .get_block_number().await
            .map_err(|e| AppError::BlockFetch(format!("{} block number: {}", network, e)))?;

        Ok(number.as_u64())
    }

    async fn block_with_transactions(
        &self,
        network: Network,
        number: u64
    ) -> Result<Option<BlockData>> {
        let block = self
            .provider(network)?
            .get_block_with_txs(number).await
            .map_err(|e| AppError::BlockFetch(format!("{} block {}: {}", network, number, e)))?;

        Ok(
            block.map(|block| BlockData {
                number: block.number.map(|n| n.as_u64()).unwrap_or(number),
                transactions: block.transactions
                    .into_iter()
                    .map(|tx| BlockTransaction {
                        hash: format!("{:#x}", tx.hash),
                        from: Some(format!("{:#x}", tx.from)),
                        to: tx.to.map(|to| format!("{:#x}", to)),
                        value: tx.value,
                    })
                    .collect(),
            })
        )
    }
}
