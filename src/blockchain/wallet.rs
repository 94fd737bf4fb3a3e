//! Portal signing key.
//!
//! The key comes from `CAMPUS_CHAIN_PRIVATE_KEY` only and is never logged.
//! Without it the portal sends as the node's first unlocked account, which
//! is how a Ganache deployment is usually driven.

use alloy::network::EthereumWallet;
use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::Signer;

use crate::blockchain::types::{BlockchainError, BlockchainResult};

pub const PRIVATE_KEY_ENV_VAR: &str = "CAMPUS_CHAIN_PRIVATE_KEY";

/// Signer for every contract call the portal makes.
#[derive(Debug, Clone)]
pub struct Wallet {
    signer: PrivateKeySigner,
    chain_id: u64,
}

impl Wallet {
    /// Hex key, `0x` prefix optional.
    pub fn from_private_key(key: &str, chain_id: u64) -> BlockchainResult<Self> {
        let key = key.trim();
        let signer = key
            .strip_prefix("0x")
            .unwrap_or(key)
            .parse::<PrivateKeySigner>()
            .map_err(|e| BlockchainError::Wallet(format!("Invalid private key format: {}", e)))?
            .with_chain_id(Some(chain_id));

        tracing::info!(sender = %signer.address(), chain_id, "Portal signing key loaded");

        Ok(Self { signer, chain_id })
    }

    /// `None` when the variable is unset or blank.
    pub fn from_env(chain_id: u64) -> BlockchainResult<Option<Self>> {
        match std::env::var(PRIVATE_KEY_ENV_VAR) {
            Ok(key) if !key.trim().is_empty() => Self::from_private_key(&key, chain_id).map(Some),
            _ => Ok(None),
        }
    }

    pub fn address(&self) -> Address {
        self.signer.address()
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Network wallet for the signing provider.
    pub fn into_ethereum_wallet(self) -> EthereumWallet {
        EthereumWallet::from(self.signer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // First Ganache/Anvil dev account.
    const DEV_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const DEV_ADDRESS: &str = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";

    #[test]
    fn test_key_with_and_without_prefix_gives_same_sender() {
        let bare = Wallet::from_private_key(DEV_KEY, 1337).unwrap();
        let prefixed = Wallet::from_private_key(&format!("  0x{}\n", DEV_KEY), 1337).unwrap();

        assert_eq!(bare.address(), prefixed.address());
        assert_eq!(bare.address().to_string().to_lowercase(), DEV_ADDRESS);
        assert_eq!(bare.chain_id(), 1337);
    }

    #[test]
    fn test_malformed_key_rejected() {
        let err = Wallet::from_private_key("not-a-key", 1337).unwrap_err();
        assert!(matches!(err, BlockchainError::Wallet(_)));
        assert!(err.to_string().contains("Invalid private key"));
    }

    #[test]
    fn test_signing_wallet_uses_portal_sender() {
        use alloy::network::NetworkWallet;
        use alloy::network::Ethereum;

        let wallet = Wallet::from_private_key(DEV_KEY, 1337).unwrap();
        let address = wallet.address();
        let eth_wallet = wallet.into_ethereum_wallet();
        assert_eq!(NetworkWallet::<Ethereum>::default_signer_address(&eth_wallet), address);
    }
}
