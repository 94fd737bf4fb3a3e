//! Pre-send gas checks and post-send confirmation tracking.
//!
//! # Responsibilities
//! - Refuse to send while the gas price is above the configured ceiling
//! - Monitor confirmations once a receipt exists

use alloy::primitives::TxHash;
use std::time::Duration;
use tokio::time::{interval, timeout};

use crate::blockchain::client::BlockchainClient;
use crate::blockchain::types::{BlockchainError, BlockchainResult, ConfirmationStatus};

/// Fail with [`BlockchainError::GasPriceTooHigh`] when the node's gas price exceeds the ceiling.
pub async fn ensure_gas_price(client: &BlockchainClient) -> BlockchainResult<u128> {
    let gas_price = client.get_gas_price().await?;
    check_gas_price(gas_price, client.config().max_gas_price_gwei)?;
    Ok(gas_price)
}

fn check_gas_price(gas_price_wei: u128, max_gwei: u64) -> BlockchainResult<()> {
    let gas_price_gwei = gas_price_wei / 1_000_000_000;
    if gas_price_gwei > max_gwei as u128 {
        return Err(BlockchainError::GasPriceTooHigh {
            current_gwei: gas_price_gwei as u64,
            max_gwei,
        });
    }
    Ok(())
}

/// Confirmations a transaction mined in `tx_block` has at `current_block`.
///
/// The mining block itself counts as the first confirmation.
pub fn confirmations(current_block: u64, tx_block: u64) -> u32 {
    if current_block < tx_block {
        return 0;
    }
    (current_block - tx_block + 1).min(u32::MAX as u64) as u32
}

/// Wait for a transaction to reach the configured confirmation depth.
pub async fn wait_for_confirmation(
    client: &BlockchainClient,
    tx_hash: TxHash,
    timeout_secs: u64,
) -> BlockchainResult<ConfirmationStatus> {
    let required_confirmations = client.confirmation_blocks();
    let timeout_duration = Duration::from_secs(timeout_secs);
    let poll_interval = Duration::from_secs(1);

    let result = timeout(timeout_duration, async {
        let mut ticker = interval(poll_interval);

        loop {
            ticker.tick().await;

            let receipt = match client.get_transaction_receipt(tx_hash).await? {
                Some(r) => r,
                None => {
                    tracing::debug!(tx_hash = %tx_hash, "Transaction pending");
                    continue;
                }
            };

            if !receipt.status() {
                return Ok(ConfirmationStatus::Failed(format!(
                    "transaction {} reverted",
                    tx_hash
                )));
            }

            let current_block = client.get_block_number().await?;
            let tx_block = receipt.block_number.unwrap_or(current_block);
            let confirmed = confirmations(current_block, tx_block);

            if confirmed >= required_confirmations {
                return Ok(ConfirmationStatus::Confirmed {
                    block_number: tx_block,
                });
            }

            tracing::debug!(
                tx_hash = %tx_hash,
                confirmations = confirmed,
                required = required_confirmations,
                "Waiting for confirmations"
            );
        }
    })
    .await;

    match result {
        Ok(status) => status,
        Err(_) => Err(BlockchainError::ConfirmationTimeout(required_confirmations)),
    }
}
