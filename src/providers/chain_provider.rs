use async_trait::async_trait;
use ethers::types::U256;

use crate::enums::Network;
use crate::error::Result;

/// A transaction as observed in a mined block.
#[derive(Debug, Clone)]
pub struct BlockTransaction {
    pub hash: String,
    /// Lowercase 0x-prefixed hex. Absent for some non-standard txs.
    pub from: Option<String>,
    /// Absent for contract creations.
    pub to: Option<String>,
    /// Raw value in the network's smallest denomination (wei).
    pub value: U256,
}

#[derive(Debug, Clone)]
pub struct BlockData {
    pub number: u64,
    pub transactions: Vec<BlockTransaction>,
}

#[async_trait]
pub trait BlockchainProvider: Send + Sync {
    /// Current chain head for the network.
    async fn latest_block_number(&self, network: Network) -> Result<u64>;

    /// Fetch a block with its full transaction list. Returns None when
    /// the block is not (yet) available from the RPC node.
    async fn block_with_transactions(
        &self,
        network: Network,
        number: u64
    ) -> Result<Option<BlockData>>;
}
