use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use ethers::types::U256;
use ethers::utils::format_units;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio::time::sleep;

use crate::enums::Network;
use crate::providers::{ AlertStore, BlockchainProvider, Notifier };

struct Watcher {
    user_id: String,
    min_value: f64,
}

/// Block-driven wallet transaction scanner. One long-lived task per
/// configured network follows the chain head and matches each block's
/// transactions against the tracked addresses.
pub struct WalletMonitor {
    store: Arc<dyn AlertStore>,
    chain: Arc<dyn BlockchainProvider>,
    notifier: Arc<dyn Notifier>,
    networks: Vec<Network>,
    explorer_urls: HashMap<Network, String>,
    poll_interval: Duration,
}

impl WalletMonitor {
    pub fn new(
        store: Arc<dyn AlertStore>,
        chain: Arc<dyn BlockchainProvider>,
        notifier: Arc<dyn Notifier>,
        networks: Vec<Network>,
        explorer_urls: HashMap<Network, String>,
        poll_interval: Duration
    ) -> Self {
        Self {
            store,
            chain,
            notifier,
            networks,
            explorer_urls,
            poll_interval,
        }
    }

    /// Run one watcher task per network until shutdown. In-flight block
    /// processing finishes before a watcher exits.
    pub async fn run(self: Arc<Self>, shutdown: watch::Receiver<bool>) {
        let mut watchers = JoinSet::new();

        for &network in &self.networks {
            let monitor = self.clone();
            let shutdown = shutdown.clone();
            watchers.spawn(async move {
                monitor.watch_network(network, shutdown).await;
            });
        }

        while watchers.join_next().await.is_some() {}
    }

    async fn watch_network(&self, network: Network, mut shutdown: watch::Receiver<bool>) {
        // Start at the current head: blocks mined while the scanner was
        // down are never alerted for
        let mut last_seen = loop {
            match self.chain.latest_block_number(network).await {
                Ok(number) => break number,
                Err(e) => {
                    tracing::warn!("Failed to read {} chain head: {}", network, e);
                    tokio::select! {
                        _ = sleep(self.poll_interval) => {}
                        _ = shutdown.changed() => {
                            return;
                        }
                    }
                }
            }
        };

        tracing::info!("Watching {} from block {}", network, last_seen);

        loop {
            tokio::select! {
                _ = sleep(self.poll_interval) => {}
                _ = shutdown.changed() => {
                    tracing::info!("Wallet monitor for {} stopping", network);
                    return;
                }
            }

            let head = match self.chain.latest_block_number(network).await {
                Ok(number) => number,
                Err(e) => {
                    tracing::warn!("Failed to read {} chain head: {}", network, e);
                    continue;
                }
            };

            // Re-check the stop flag between blocks: a shutdown arriving
            // mid-catch-up must not start processing the rest of the gap
            while last_seen < head {
                if *shutdown.borrow() {
                    tracing::info!("Wallet monitor for {} stopping", network);
                    return;
                }
                last_seen += 1;
                self.process_block(network, last_seen).await;
            }
        }
    }

    /// Handle a single new block. Failures are logged and the block is
    /// skipped; there is no retry or backfill.
    pub async fn process_block(&self, network: Network, number: u64) {
        let block = match self.chain.block_with_transactions(network, number).await {
            Ok(Some(block)) => block,
            Ok(None) => {
                tracing::debug!("{} block {} not available yet", network, number);
                return;
            }
            Err(e) => {
                tracing::warn!("Skipping {} block {}: {}", network, number, e);
                return;
            }
        };

        if block.transactions.is_empty() {
            return;
        }

        let users = match self.store.users_with_wallet_alerts(network).await {
            Ok(users) => users,
            Err(e) => {
                tracing::error!("Failed to load wallet alerts for {}: {}", network, e);
                return;
            }
        };

        if users.is_empty() {
            return;
        }

        // Rebuilt every block: the tracked set can change between blocks
        let mut watched: HashMap<String, Vec<Watcher>> = HashMap::new();
        for user in users {
            for alert in user.alerts {
                watched.entry(alert.address).or_default().push(Watcher {
                    user_id: user.user_id.clone(),
                    min_value: alert.min_value,
                });
            }
        }

        // Notifications for this block run in a task group scoped to the
        // block, so processing has a bounded completion point
        let mut sends = JoinSet::new();

        for tx in &block.transactions {
            if tx.value.is_zero() {
                continue;
            }
            let (Some(from), Some(to)) = (&tx.from, &tx.to) else {
                continue;
            };

            let value = match format_native_value(tx.value) {
                Some(value) if value > 0.0 => value,
                _ => {
                    tracing::debug!("Unformattable value in tx {}", tx.hash);
                    continue;
                }
            };

            for (address, direction) in [(from, "sent"), (to, "received")] {
                let Some(watchers) = watched.get(&address.to_lowercase()) else {
                    continue;
                };

                for watcher in watchers {
                    if value < watcher.min_value {
                        continue;
                    }

                    let text = self.transaction_message(
                        network,
                        direction,
                        value,
                        address,
                        number,
                        &tx.hash
                    );
                    let notifier = self.notifier.clone();
                    let user_id = watcher.user_id.clone();

                    sends.spawn(async move {
                        if let Err(e) = notifier.send(&user_id, &text, true).await {
                            tracing::warn!("Failed to send wallet alert to user {}: {}", user_id, e);
                        }
                    });
                }
            }
        }

        while sends.join_next().await.is_some() {}
    }

    fn transaction_message(
        &self,
        network: Network,
        direction: &str,
        value: f64,
        address: &str,
        block_number: u64,
        tx_hash: &str
    ) -> String {
        let explorer = self.explorer_urls
            .get(&network)
            .map(String::as_str)
            .unwrap_or_else(|| network.explorer_url());

        format!(
            "🚨 Transaction Alert!\n\n\
            💰 Value: {value:.4} {symbol}\n\
            💸 Direction: {direction}\n\
            🏷️ Address: {address}\n\
            🕒 Block: {block}\n\
            🔗 Transaction: {explorer}/tx/{hash}",
            value = value,
            symbol = network.native_symbol(),
            direction = direction,
            address = address,
            block = block_number,
            explorer = explorer,
            hash = tx_hash,
        )
    }
}

/// Convert a raw wei amount to the native decimal unit.
fn format_native_value(value: U256) -> Option<f64> {
    let formatted = format_units(value, "ether").ok()?;
    let value: f64 = formatted.parse().ok()?;
    value.is_finite().then_some(value)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use uuid::Uuid;

    use super::*;
    use crate::error::Result;
    use crate::providers::{ BlockData, BlockTransaction, WalletAlert };
    use crate::testutil::{ MemoryStore, RecordingNotifier, ScriptedChain };

    const WHALE: &str = "0xd8da6bf26964af9d7eed9e03e53415d37aa96045";
    const OTHER: &str = "0x00000000219ab540356cbb839cbe05303d7705fa";

    fn one_ether() -> U256 {
        U256::exp10(18)
    }

    fn wallet_alert(address: &str, network: Network, min_value: f64) -> WalletAlert {
        WalletAlert {
            id: Uuid::new_v4(),
            address: address.to_string(),
            network,
            min_value,
            name: None,
        }
    }

    fn tx(hash: &str, from: &str, to: &str, value: U256) -> BlockTransaction {
        BlockTransaction {
            hash: hash.to_string(),
            from: Some(from.to_string()),
            to: Some(to.to_string()),
            value,
        }
    }

    fn monitor(
        store: Arc<MemoryStore>,
        chain: Arc<ScriptedChain>,
        notifier: Arc<RecordingNotifier>
    ) -> WalletMonitor {
        WalletMonitor::new(
            store,
            chain,
            notifier,
            vec![Network::Ethereum],
            HashMap::new(),
            Duration::from_millis(10)
        )
    }

    #[tokio::test]
    async fn value_equal_to_min_value_triggers() {
        let store = Arc::new(MemoryStore::new());
        let chain = Arc::new(ScriptedChain::new());
        let notifier = Arc::new(RecordingNotifier::new());
        store.seed_wallet_alert("7", wallet_alert(WHALE, Network::Ethereum, 1.0));
        chain.add_block(Network::Ethereum, BlockData {
            number: 100,
            transactions: vec![tx("0xaa", WHALE, OTHER, one_ether())],
        });

        monitor(store, chain, notifier.clone()).process_block(Network::Ethereum, 100).await;

        let sent = notifier.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].1.contains("sent"));
        assert!(sent[0].1.contains("1.0000 ETH"));
        assert!(sent[0].1.contains("Block: 100"));
        assert!(sent[0].1.contains("/tx/0xaa"));
    }

    #[tokio::test]
    async fn value_just_below_min_value_does_not_trigger() {
        let store = Arc::new(MemoryStore::new());
        let chain = Arc::new(ScriptedChain::new());
        let notifier = Arc::new(RecordingNotifier::new());
        store.seed_wallet_alert("7", wallet_alert(WHALE, Network::Ethereum, 1.0));
        chain.add_block(Network::Ethereum, BlockData {
            number: 100,
            transactions: vec![tx("0xaa", WHALE, OTHER, one_ether() - U256::one())],
        });

        monitor(store, chain, notifier.clone()).process_block(Network::Ethereum, 100).await;

        assert!(notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn receiver_match_reports_received_direction() {
        let store = Arc::new(MemoryStore::new());
        let chain = Arc::new(ScriptedChain::new());
        let notifier = Arc::new(RecordingNotifier::new());
        store.seed_wallet_alert("7", wallet_alert(WHALE, Network::Ethereum, 1.0));
        chain.add_block(Network::Ethereum, BlockData {
            number: 100,
            transactions: vec![tx("0xaa", OTHER, WHALE, one_ether() * 2)],
        });

        monitor(store, chain, notifier.clone()).process_block(Network::Ethereum, 100).await;

        let sent = notifier.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].1.contains("received"));
    }

    #[tokio::test]
    async fn mixed_case_transaction_addresses_still_match() {
        let store = Arc::new(MemoryStore::new());
        let chain = Arc::new(ScriptedChain::new());
        let notifier = Arc::new(RecordingNotifier::new());
        store.seed_wallet_alert("7", wallet_alert(WHALE, Network::Ethereum, 1.0));
        chain.add_block(Network::Ethereum, BlockData {
            number: 100,
            transactions: vec![tx("0xaa", &WHALE.to_uppercase().replace("0X", "0x"), OTHER, one_ether())],
        });

        monitor(store, chain, notifier.clone()).process_block(Network::Ethereum, 100).await;

        assert_eq!(notifier.sent().len(), 1);
    }

    #[tokio::test]
    async fn duplicate_entries_notify_independently() {
        let store = Arc::new(MemoryStore::new());
        let chain = Arc::new(ScriptedChain::new());
        let notifier = Arc::new(RecordingNotifier::new());
        // same (address, network) tracked twice by the same user
        store.seed_wallet_alert("7", wallet_alert(WHALE, Network::Ethereum, 1.0));
        store.seed_wallet_alert("7", wallet_alert(WHALE, Network::Ethereum, 1.5));
        // and once by another user
        store.seed_wallet_alert("8", wallet_alert(WHALE, Network::Ethereum, 1.0));
        chain.add_block(Network::Ethereum, BlockData {
            number: 100,
            transactions: vec![tx("0xaa", WHALE, OTHER, one_ether() * 2)],
        });

        monitor(store, chain, notifier.clone()).process_block(Network::Ethereum, 100).await;

        assert_eq!(notifier.sent().len(), 3);
    }

    #[tokio::test]
    async fn alerts_on_other_networks_are_ignored() {
        let store = Arc::new(MemoryStore::new());
        let chain = Arc::new(ScriptedChain::new());
        let notifier = Arc::new(RecordingNotifier::new());
        store.seed_wallet_alert("7", wallet_alert(WHALE, Network::Bsc, 1.0));
        chain.add_block(Network::Ethereum, BlockData {
            number: 100,
            transactions: vec![tx("0xaa", WHALE, OTHER, one_ether() * 2)],
        });

        monitor(store, chain, notifier.clone()).process_block(Network::Ethereum, 100).await;

        assert!(notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn zero_value_and_contract_creation_txs_are_skipped() {
        let store = Arc::new(MemoryStore::new());
        let chain = Arc::new(ScriptedChain::new());
        let notifier = Arc::new(RecordingNotifier::new());
        store.seed_wallet_alert("7", wallet_alert(WHALE, Network::Ethereum, 1.0));
        chain.add_block(Network::Ethereum, BlockData {
            number: 100,
            transactions: vec![
                tx("0xaa", WHALE, OTHER, U256::zero()),
                BlockTransaction {
                    hash: "0xbb".to_string(),
                    from: Some(WHALE.to_string()),
                    to: None,
                    value: one_ether() * 5,
                }
            ],
        });

        monitor(store, chain, notifier.clone()).process_block(Network::Ethereum, 100).await;

        assert!(notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn failed_block_fetch_is_skipped() {
        let store = Arc::new(MemoryStore::new());
        let chain = Arc::new(ScriptedChain::new());
        let notifier = Arc::new(RecordingNotifier::new());
        store.seed_wallet_alert("7", wallet_alert(WHALE, Network::Ethereum, 1.0));
        chain.fail_block(Network::Ethereum, 100);
        chain.add_block(Network::Ethereum, BlockData {
            number: 101,
            transactions: vec![tx("0xcc", WHALE, OTHER, one_ether() * 2)],
        });

        let monitor = monitor(store, chain, notifier.clone());
        monitor.process_block(Network::Ethereum, 100).await;
        assert!(notifier.sent().is_empty());

        // the next block processes normally
        monitor.process_block(Network::Ethereum, 101).await;
        assert_eq!(notifier.sent().len(), 1);
    }

    /// Records sends and flips a stop flag on the first one, so a
    /// shutdown arriving in the middle of a multi-block catch-up can be
    /// produced deterministically.
    struct StopOnFirstSend {
        sent: Mutex<Vec<String>>,
        stop: watch::Sender<bool>,
    }

    #[async_trait]
    impl Notifier for StopOnFirstSend {
        async fn send(&self, _user_id: &str, text: &str, _disable_link_preview: bool) -> Result<()> {
            self.sent.lock().unwrap().push(text.to_string());
            let _ = self.stop.send(true);
            Ok(())
        }
    }

    #[tokio::test]
    async fn shutdown_mid_catch_up_skips_remaining_blocks() {
        let store = Arc::new(MemoryStore::new());
        let chain = Arc::new(ScriptedChain::new());
        store.seed_wallet_alert("7", wallet_alert(WHALE, Network::Ethereum, 1.0));
        chain.set_head(Network::Ethereum, 100);
        for number in 101..=103 {
            chain.add_block(Network::Ethereum, BlockData {
                number,
                transactions: vec![
                    tx(&format!("0x{:02x}", number), WHALE, OTHER, one_ether() * 2)
                ],
            });
        }

        let (stop_tx, stop_rx) = watch::channel(false);
        let notifier = Arc::new(StopOnFirstSend {
            sent: Mutex::new(Vec::new()),
            stop: stop_tx,
        });

        let monitor = Arc::new(
            WalletMonitor::new(
                store,
                chain.clone(),
                notifier.clone(),
                vec![Network::Ethereum],
                HashMap::new(),
                Duration::from_millis(10)
            )
        );
        let handle = tokio::spawn(monitor.run(stop_rx));

        // let the watcher initialize at block 100, then grow the chain
        // by three blocks at once
        tokio::time::sleep(Duration::from_millis(50)).await;
        chain.set_head(Network::Ethereum, 103);

        tokio::time::timeout(Duration::from_secs(2), handle).await.unwrap().unwrap();

        // the first notification flipped the stop flag, so blocks 102
        // and 103 were never processed
        assert_eq!(notifier.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn blocks_mined_while_stopped_are_never_alerted() {
        let store = Arc::new(MemoryStore::new());
        let chain = Arc::new(ScriptedChain::new());
        let notifier = Arc::new(RecordingNotifier::new());
        store.seed_wallet_alert("7", wallet_alert(WHALE, Network::Ethereum, 1.0));
        // block 101 was mined before the scanner started; the head is
        // already past it
        chain.set_head(Network::Ethereum, 103);
        chain.add_block(Network::Ethereum, BlockData {
            number: 101,
            transactions: vec![tx("0xold", WHALE, OTHER, one_ether() * 2)],
        });
        chain.add_block(Network::Ethereum, BlockData {
            number: 104,
            transactions: vec![tx("0xnew", WHALE, OTHER, one_ether() * 2)],
        });

        let (stop_tx, stop_rx) = watch::channel(false);
        let handle = tokio::spawn(
            Arc::new(monitor(store, chain.clone(), notifier.clone())).run(stop_rx)
        );

        tokio::time::sleep(Duration::from_millis(50)).await;
        chain.set_head(Network::Ethereum, 104);
        tokio::time::sleep(Duration::from_millis(50)).await;

        let _ = stop_tx.send(true);
        tokio::time::timeout(Duration::from_secs(2), handle).await.unwrap().unwrap();

        // only the block mined after startup is alerted for
        let sent = notifier.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].1.contains("/tx/0xnew"));
    }

    #[test]
    fn wei_conversion_to_native_units() {
        assert_eq!(format_native_value(one_ether()), Some(1.0));
        assert_eq!(format_native_value(U256::exp10(16)), Some(0.01));
        assert_eq!(format_native_value(U256::zero()), Some(0.0));
    }
}
