//! Errors and value types shared by the chain client and the ledger.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use crate::config::schema::BlockchainConfig;

/// EIP-155 chain id as reported by a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChainId(pub u64);

/// Errors that can occur during blockchain operations.
#[derive(Debug, Error)]
pub enum BlockchainError {
    /// Every node failed or the URL is unusable.
    #[error("RPC error: {0}")]
    Rpc(String),

    /// A contract call was not accepted by the node in time.
    #[error("RPC timeout after {0} seconds")]
    Timeout(u64),

    /// Receipt arrived but never reached the configured depth.
    #[error("Transaction not confirmed after {0} blocks")]
    ConfirmationTimeout(u32),

    /// Receipt status was 0.
    #[error("Transaction reverted: {0}")]
    Reverted(String),

    #[error("Wallet error: {0}")]
    Wallet(String),

    #[error("Gas price {current_gwei} gwei exceeds maximum {max_gwei} gwei")]
    GasPriceTooHigh { current_gwei: u64, max_gwei: u64 },

    #[error("Chain ID mismatch: expected {expected}, got {actual}")]
    ChainMismatch { expected: u64, actual: u64 },

    /// Contract address could not be resolved from config or artifact.
    #[error("Contract {contract}: {reason}")]
    Contract { contract: String, reason: String },

    /// No RPC node answered, or the node refused the connection.
    #[error("Blockchain not available: {0}")]
    NotAvailable(String),
}

/// Result type for blockchain operations.
pub type BlockchainResult<T> = Result<T, BlockchainError>;

/// Outcome of waiting for a sent transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmationStatus {
    Confirmed { block_number: u64 },
    /// Reverted or dropped, with the reason.
    Failed(String),
}

/// What a successful contract call leaves behind for the database write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainReceipt {
    pub tx_hash: String,
    pub block_number: Option<u64>,
    /// Set when the receipt carries an ERC-721 mint.
    pub token_id: Option<String>,
}
