//! Blockchain integration subsystem.
//!
//! # Data Flow
//! ```text
//! Environment (CAMPUS_CHAIN_PRIVATE_KEY, RPC_URL) + truffle artifacts
//!     → wallet.rs (optional local signer)
//!     → contracts.rs (sol! bindings, address resolution)
//!     → client.rs (read-side RPC with failover and timeouts)
//!     → ledger.rs (NftLedger: gas check → send → receipt → confirmations)
//! ```
//!
//! # Security Constraints
//! - Private keys ONLY from environment variables
//! - Never log private keys or sensitive data
//! - All RPC calls have configurable timeouts

pub mod client;
pub mod confirmation;
pub mod contracts;
pub mod ledger;
pub mod types;
pub mod wallet;

pub use client::BlockchainClient;
pub use ledger::{ContractLedger, LedgerInfo, NftLedger};
pub use types::{BlockchainConfig, BlockchainError, ChainId, ChainReceipt};
pub use wallet::Wallet;
