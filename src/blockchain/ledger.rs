//! The on-chain half of every dual write.
//!
//! [`NftLedger`] is the seam the portal operations call; [`ContractLedger`]
//! implements it against the deployed contracts. Each call checks the gas
//! ceiling, sends, waits for the receipt (and confirmations when configured)
//! and reports the tx hash plus any minted token id.

use alloy::network::Ethereum;
use alloy::primitives::{Address, U256};
use alloy::providers::{DynProvider, PendingTransactionBuilder, Provider, ProviderBuilder};
use alloy::transports::RpcError;
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use tokio::time::{error::Elapsed, timeout};

use crate::blockchain::client::BlockchainClient;
use crate::blockchain::confirmation::{ensure_gas_price, wait_for_confirmation};
use crate::blockchain::contracts::{
    minted_token_id, AmenitiesNFT, CertificateNFT, ContractAddresses, FeePaymentNFT, MyCourseReg,
    MyNFT,
};
use crate::blockchain::types::{
    BlockchainConfig, BlockchainError, BlockchainResult, ChainReceipt, ConfirmationStatus,
};
use crate::blockchain::wallet::Wallet;
use crate::config::ContractsConfig;
use crate::observability::metrics;

/// Contract calls backing the portal's mutating endpoints.
#[async_trait]
pub trait NftLedger: Send + Sync {
    /// Mint an identity NFT for a student or faculty member.
    async fn mint_identity(&self, email: &str, token_uri: &str) -> BlockchainResult<ChainReceipt>;

    async fn register_course(&self, student: Address, course_id: u64)
        -> BlockchainResult<ChainReceipt>;

    async fn issue_certificate(
        &self,
        student: Address,
        token_uri: &str,
    ) -> BlockchainResult<ChainReceipt>;

    /// Pay `value` wei and mint the fee receipt NFT.
    async fn pay_fees(&self, token_uri: &str, value: U256) -> BlockchainResult<ChainReceipt>;

    async fn book_room(
        &self,
        user: Address,
        room_id: u64,
        token_uri: &str,
    ) -> BlockchainResult<ChainReceipt>;

    async fn join_event(
        &self,
        user: Address,
        event_id: u64,
        token_uri: &str,
    ) -> BlockchainResult<ChainReceipt>;

    async fn is_healthy(&self) -> bool;

    fn info(&self) -> LedgerInfo;
}

/// Sender and contract addresses, for status output.
#[derive(Debug, Clone, Serialize)]
pub struct LedgerInfo {
    pub sender: String,
    pub chain_id: u64,
    pub contracts: Vec<(String, String)>,
}

type SendOutcome =
    Result<Result<PendingTransactionBuilder<Ethereum>, alloy::contract::Error>, Elapsed>;

/// [`NftLedger`] over the deployed contracts.
pub struct ContractLedger {
    client: BlockchainClient,
    provider: DynProvider,
    sender: Address,
    addresses: ContractAddresses,
    call_timeout: Duration,
}

impl ContractLedger {
    /// Resolve contract addresses and build the sending provider.
    ///
    /// With a wallet, calls are signed locally; without one they are sent from
    /// the node's first unlocked account.
    pub async fn connect(
        config: &BlockchainConfig,
        contracts: &ContractsConfig,
        wallet: Option<Wallet>,
    ) -> BlockchainResult<Self> {
        let addresses = ContractAddresses::resolve(contracts)?;
        let client = BlockchainClient::new(config.clone()).await?;
        let url: url::Url = config.rpc_url.parse().map_err(|e| {
            BlockchainError::Rpc(format!("Invalid RPC URL '{}': {}", config.rpc_url, e))
        })?;

        let (provider, sender) = match wallet {
            Some(wallet) => {
                let sender = wallet.address();
                let provider = ProviderBuilder::new()
                    .wallet(wallet.into_ethereum_wallet())
                    .connect_http(url)
                    .erased();
                (provider, sender)
            }
            None => {
                let sender = client.get_accounts().await?.into_iter().next().ok_or_else(|| {
                    BlockchainError::Wallet(
                        "no private key configured and the node exposes no accounts".to_string(),
                    )
                })?;
                (ProviderBuilder::new().connect_http(url).erased(), sender)
            }
        };

        tracing::info!(
            sender = %sender,
            identity = %addresses.identity,
            course_registration = %addresses.course_registration,
            certificate = %addresses.certificate,
            fee_payment = %addresses.fee_payment,
            amenities = %addresses.amenities,
            "Contract ledger ready"
        );

        Ok(Self {
            client,
            provider,
            sender,
            addresses,
            call_timeout: Duration::from_secs(config.rpc_timeout_secs),
        })
    }

    pub fn sender(&self) -> Address {
        self.sender
    }

    async fn finish(&self, contract: &'static str, sent: SendOutcome) -> BlockchainResult<ChainReceipt> {
        let outcome = self.await_receipt(sent).await;
        match &outcome {
            Ok(receipt) => tracing::info!(
                contract = contract,
                tx_hash = %receipt.tx_hash,
                token_id = ?receipt.token_id,
                "Contract call mined"
            ),
            Err(e) => tracing::error!(contract = contract, error = %e, "Contract call failed"),
        }
        metrics::record_chain_call(contract, outcome.is_ok());
        outcome
    }

    async fn await_receipt(&self, sent: SendOutcome) -> BlockchainResult<ChainReceipt> {
        let pending = match sent {
            Ok(Ok(pending)) => pending,
            Ok(Err(alloy::contract::Error::TransportError(RpcError::Transport(kind)))) => {
                return Err(BlockchainError::NotAvailable(kind.to_string()))
            }
            Ok(Err(e)) => return Err(BlockchainError::Rpc(e.to_string())),
            Err(_) => return Err(BlockchainError::Timeout(self.call_timeout.as_secs())),
        };
        let tx_hash = *pending.tx_hash();

        let receipt = pending
            .with_timeout(Some(self.call_timeout))
            .get_receipt()
            .await
            .map_err(|e| BlockchainError::Rpc(format!("awaiting receipt for {}: {}", tx_hash, e)))?;

        if !receipt.status() {
            return Err(BlockchainError::Reverted(tx_hash.to_string()));
        }

        if self.client.confirmation_blocks() > 0 {
            let timeout_secs = self.client.config().confirmation_timeout_secs;
            if let ConfirmationStatus::Failed(reason) =
                wait_for_confirmation(&self.client, tx_hash, timeout_secs).await?
            {
                return Err(BlockchainError::Reverted(reason));
            }
        }

        Ok(ChainReceipt {
            tx_hash: tx_hash.to_string(),
            block_number: receipt.block_number,
            token_id: minted_token_id(receipt.inner.logs()).map(|id| id.to_string()),
        })
    }
}

#[async_trait]
impl NftLedger for ContractLedger {
    async fn mint_identity(&self, email: &str, token_uri: &str) -> BlockchainResult<ChainReceipt> {
        ensure_gas_price(&self.client).await?;
        let contract = MyNFT::new(self.addresses.identity, &self.provider);
        let call = contract
            .mintNFT(email.to_string(), token_uri.to_string())
            .from(self.sender);
        let sent = timeout(self.call_timeout, call.send()).await;
        self.finish("identity", sent).await
    }

    async fn register_course(
        &self,
        student: Address,
        course_id: u64,
    ) -> BlockchainResult<ChainReceipt> {
        ensure_gas_price(&self.client).await?;
        let contract = MyCourseReg::new(self.addresses.course_registration, &self.provider);
        let call = contract
            .registerCourse(student, U256::from(course_id))
            .from(self.sender);
        let sent = timeout(self.call_timeout, call.send()).await;
        self.finish("course_registration", sent).await
    }

    async fn issue_certificate(
        &self,
        student: Address,
        token_uri: &str,
    ) -> BlockchainResult<ChainReceipt> {
        ensure_gas_price(&self.client).await?;
        let contract = CertificateNFT::new(self.addresses.certificate, &self.provider);
        let call = contract
            .issueCertificate(student, token_uri.to_string())
            .from(self.sender);
        let sent = timeout(self.call_timeout, call.send()).await;
        self.finish("certificate", sent).await
    }

    async fn pay_fees(&self, token_uri: &str, value: U256) -> BlockchainResult<ChainReceipt> {
        ensure_gas_price(&self.client).await?;
        let contract = FeePaymentNFT::new(self.addresses.fee_payment, &self.provider);
        let call = contract
            .payFees(token_uri.to_string())
            .from(self.sender)
            .value(value);
        let sent = timeout(self.call_timeout, call.send()).await;
        self.finish("fee_payment", sent).await
    }

    async fn book_room(
        &self,
        user: Address,
        room_id: u64,
        token_uri: &str,
    ) -> BlockchainResult<ChainReceipt> {
        ensure_gas_price(&self.client).await?;
        let contract = AmenitiesNFT::new(self.addresses.amenities, &self.provider);
        let call = contract
            .bookRoom(user, U256::from(room_id), token_uri.to_string())
            .from(self.sender);
        let sent = timeout(self.call_timeout, call.send()).await;
        self.finish("amenities", sent).await
    }

    async fn join_event(
        &self,
        user: Address,
        event_id: u64,
        token_uri: &str,
    ) -> BlockchainResult<ChainReceipt> {
        ensure_gas_price(&self.client).await?;
        let contract = AmenitiesNFT::new(self.addresses.amenities, &self.provider);
        let call = contract
            .joinEvent(user, U256::from(event_id), token_uri.to_string())
            .from(self.sender);
        let sent = timeout(self.call_timeout, call.send()).await;
        self.finish("amenities", sent).await
    }

    async fn is_healthy(&self) -> bool {
        self.client.is_healthy().await
    }

    fn info(&self) -> LedgerInfo {
        LedgerInfo {
            sender: self.sender.to_string(),
            chain_id: self.client.config().chain_id,
            contracts: self
                .addresses
                .entries()
                .iter()
                .map(|(name, address)| (name.to_string(), address.to_string()))
                .collect(),
        }
    }
}
