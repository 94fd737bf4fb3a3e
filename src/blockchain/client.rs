//! Read-side JSON-RPC access with failover across configured nodes.
//!
//! Every query walks the provider list in order and returns the first
//! answer; per-node errors and timeouts are logged and skipped. When no node
//! answers the chain is reported as unavailable.

use alloy::primitives::{Address, TxHash};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::TransactionReceipt;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;

use crate::blockchain::types::{BlockchainConfig, BlockchainError, BlockchainResult, ChainId};
use crate::observability::metrics;

/// Node connections plus the chain settings they were built from.
///
/// Contract writes go through the signing provider owned by
/// [`crate::blockchain::ContractLedger`]; this type only reads.
#[derive(Clone)]
pub struct BlockchainClient {
    nodes: Vec<DynProvider>,
    config: BlockchainConfig,
    rpc_timeout: Duration,
}

fn connect(raw: &str) -> BlockchainResult<DynProvider> {
    let url: url::Url = raw
        .parse()
        .map_err(|e| BlockchainError::Rpc(format!("Invalid RPC URL '{}': {}", raw, e)))?;
    Ok(ProviderBuilder::new().connect_http(url).erased())
}

impl BlockchainClient {
    /// Connect to the primary node and any failovers.
    ///
    /// An unreachable node is not an error here; a wrong chain id only warns,
    /// so the portal can start before the local chain does.
    pub async fn new(config: BlockchainConfig) -> BlockchainResult<Self> {
        let mut nodes = vec![connect(&config.rpc_url)?];
        for raw in &config.failover_urls {
            match connect(raw) {
                Ok(node) => nodes.push(node),
                Err(e) => tracing::warn!(error = %e, "Ignoring failover node"),
            }
        }

        let client = Self {
            nodes,
            rpc_timeout: Duration::from_secs(config.rpc_timeout_secs),
            config,
        };

        if let Err(e) = client.verify_chain_id().await {
            tracing::warn!(error = %e, "Chain node not verified at startup");
        } else {
            tracing::info!(
                rpc_url = %client.config.rpc_url,
                chain_id = client.config.chain_id,
                nodes = client.nodes.len(),
                "Blockchain client ready"
            );
        }

        Ok(client)
    }

    async fn first_answer<T, E, F, Fut>(&self, what: &'static str, query: F) -> BlockchainResult<T>
    where
        E: Display,
        F: Fn(DynProvider) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        for (idx, node) in self.nodes.iter().enumerate() {
            match timeout(self.rpc_timeout, query(node.clone())).await {
                Ok(Ok(answer)) => return Ok(answer),
                Ok(Err(e)) => tracing::warn!(node = idx, query = what, error = %e, "RPC error"),
                Err(_) => tracing::warn!(node = idx, query = what, "RPC timeout"),
            }
        }
        Err(BlockchainError::NotAvailable(format!(
            "All RPC providers failed: {}",
            what
        )))
    }

    /// Fails with `ChainMismatch` when the node serves another network.
    pub async fn verify_chain_id(&self) -> BlockchainResult<()> {
        let ChainId(actual) = self.get_chain_id().await?;
        if actual != self.config.chain_id {
            return Err(BlockchainError::ChainMismatch {
                expected: self.config.chain_id,
                actual,
            });
        }
        Ok(())
    }

    pub async fn get_chain_id(&self) -> BlockchainResult<ChainId> {
        self.first_answer("chain_id", |node| async move { node.get_chain_id().await })
            .await
            .map(ChainId)
    }

    pub async fn get_block_number(&self) -> BlockchainResult<u64> {
        self.first_answer("block_number", |node| async move { node.get_block_number().await })
            .await
    }

    /// Accounts unlocked on the node (Ganache/Anvil dev accounts).
    pub async fn get_accounts(&self) -> BlockchainResult<Vec<Address>> {
        self.first_answer("accounts", |node| async move { node.get_accounts().await })
            .await
    }

    pub async fn get_transaction_receipt(
        &self,
        tx_hash: TxHash,
    ) -> BlockchainResult<Option<TransactionReceipt>> {
        self.first_answer("receipt", move |node| async move {
            node.get_transaction_receipt(tx_hash).await
        })
        .await
    }

    /// Current gas price in wei.
    pub async fn get_gas_price(&self) -> BlockchainResult<u128> {
        self.first_answer("gas_price", |node| async move { node.get_gas_price().await })
            .await
    }

    /// Reachable means some node answers a block number. Updates the health gauge.
    pub async fn is_healthy(&self) -> bool {
        let healthy = self.get_block_number().await.is_ok();
        metrics::record_chain_health(healthy);
        healthy
    }

    pub fn config(&self) -> &BlockchainConfig {
        &self.config
    }

    pub fn confirmation_blocks(&self) -> u32 {
        self.config.confirmation_blocks
    }
}

impl std::fmt::Debug for BlockchainClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockchainClient")
            .field("rpc_url", &self.config.rpc_url)
            .field("chain_id", &self.config.chain_id)
            .field("nodes", &self.nodes.len())
            .finish()
    }
}
