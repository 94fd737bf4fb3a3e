//! Startup orchestration.
//!
//! Config is already loaded and validated by the time these run. Order:
//! store (creating the database and tables for Postgres), then the chain
//! ledger when enabled, then the [`Portal`] handle the server shares.
//! Any error here is fatal.

use std::sync::Arc;
use thiserror::Error;

use crate::blockchain::{BlockchainError, ContractLedger, NftLedger, Wallet};
use crate::config::{PortalConfig, StoreBackend};
use crate::db::{bootstrap, MemoryStore, PgStore, PortalStore, StoreError};
use crate::portal::Portal;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Store initialization failed: {0}")]
    Store(#[from] StoreError),

    #[error("Blockchain initialization failed: {0}")]
    Chain(#[from] BlockchainError),
}

pub async fn build_store(config: &PortalConfig) -> Result<Arc<dyn PortalStore>, StartupError> {
    match config.database.backend {
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store; data is lost on exit");
            Ok(Arc::new(MemoryStore::new()))
        }
        StoreBackend::Postgres => {
            let pool = bootstrap::init_database(&config.database).await?;
            Ok(Arc::new(PgStore::new(pool)))
        }
    }
}

/// `None` when the chain is disabled.
pub async fn build_ledger(
    config: &PortalConfig,
) -> Result<Option<Arc<dyn NftLedger>>, StartupError> {
    if !config.blockchain.enabled {
        tracing::info!("Blockchain disabled; operations record database rows only");
        return Ok(None);
    }

    let wallet = Wallet::from_env(config.blockchain.chain_id)?;
    match &wallet {
        Some(wallet) => tracing::info!(address = %wallet.address(), "Signing with local wallet"),
        None => tracing::info!("No private key set; sending from the node's first account"),
    }

    let ledger = ContractLedger::connect(&config.blockchain, &config.contracts, wallet).await?;
    Ok(Some(Arc::new(ledger)))
}

pub async fn build_portal(config: PortalConfig) -> Result<Portal, StartupError> {
    let store = build_store(&config).await?;
    let ledger = build_ledger(&config).await?;
    Ok(Portal::new(store, ledger, Arc::new(config)))
}
