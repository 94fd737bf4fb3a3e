//! Contract bindings and address resolution.
//!
//! The contracts are deployed separately; the portal only needs their ABI
//! subset (declared with `sol!`) and their addresses, taken either from the
//! config or from the compiled truffle artifacts.

use alloy::primitives::{Address, U256};
use alloy::rpc::types::Log;
use alloy::sol;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::blockchain::types::{BlockchainError, BlockchainResult};
use crate::config::{ContractRef, ContractsConfig};

sol! {
    /// Identity NFT shared by students and faculty.
    #[sol(rpc)]
    contract MyNFT {
        function mintNFT(string memory email, string memory tokenURI) public returns (uint256);
    }

    #[sol(rpc)]
    contract MyCourseReg {
        function registerCourse(address student, uint256 courseId) public;
    }

    #[sol(rpc)]
    contract CertificateNFT {
        function issueCertificate(address student, string memory tokenURI) public returns (uint256);
    }

    #[sol(rpc)]
    contract FeePaymentNFT {
        function payFees(string memory tokenURI) public payable returns (uint256);
    }

    #[sol(rpc)]
    contract AmenitiesNFT {
        function bookRoom(address user, uint256 roomId, string memory tokenURI) public returns (uint256);
        function joinEvent(address user, uint256 eventId, string memory tokenURI) public returns (uint256);
    }

    /// ERC-721 transfer; a mint is a transfer from the zero address.
    #[derive(Debug)]
    event Transfer(address indexed from, address indexed to, uint256 indexed tokenId);
}

/// Subset of a truffle build artifact.
#[derive(Debug, Deserialize)]
struct TruffleArtifact {
    #[serde(rename = "contractName", default)]
    contract_name: Option<String>,
    #[serde(default)]
    networks: BTreeMap<String, ArtifactNetwork>,
}

#[derive(Debug, Deserialize)]
struct ArtifactNetwork {
    address: String,
}

/// Resolved addresses of every contract the portal calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContractAddresses {
    pub identity: Address,
    pub course_registration: Address,
    pub certificate: Address,
    pub fee_payment: Address,
    pub amenities: Address,
}

impl ContractAddresses {
    pub fn resolve(config: &ContractsConfig) -> BlockchainResult<Self> {
        Ok(Self {
            identity: resolve_address("identity", &config.identity, config)?,
            course_registration: resolve_address(
                "course_registration",
                &config.course_registration,
                config,
            )?,
            certificate: resolve_address("certificate", &config.certificate, config)?,
            fee_payment: resolve_address("fee_payment", &config.fee_payment, config)?,
            amenities: resolve_address("amenities", &config.amenities, config)?,
        })
    }

    /// `(name, address)` pairs for status output.
    pub fn entries(&self) -> [(&'static str, Address); 5] {
        [
            ("identity", self.identity),
            ("course_registration", self.course_registration),
            ("certificate", self.certificate),
            ("fee_payment", self.fee_payment),
            ("amenities", self.amenities),
        ]
    }
}

fn contract_error(contract: &str, reason: impl Into<String>) -> BlockchainError {
    BlockchainError::Contract {
        contract: contract.to_string(),
        reason: reason.into(),
    }
}

/// Resolve one contract: explicit address first, then the artifact's network entry.
pub fn resolve_address(
    contract: &str,
    reference: &ContractRef,
    config: &ContractsConfig,
) -> BlockchainResult<Address> {
    if let Some(address) = &reference.address {
        return address
            .parse()
            .map_err(|_| contract_error(contract, format!("invalid address '{}'", address)));
    }

    let path = Path::new(&config.build_dir).join(&reference.artifact);
    let content = fs::read_to_string(&path)
        .map_err(|e| contract_error(contract, format!("reading {}: {}", path.display(), e)))?;
    let artifact: TruffleArtifact = serde_json::from_str(&content)
        .map_err(|e| contract_error(contract, format!("parsing {}: {}", path.display(), e)))?;

    let network = match &config.network_id {
        Some(id) => artifact
            .networks
            .get(id)
            .ok_or_else(|| contract_error(contract, format!("artifact has no network {}", id)))?,
        None => first_network(&artifact.networks)
            .ok_or_else(|| contract_error(contract, "artifact has no networks"))?,
    };

    let address: Address = network.address.parse().map_err(|_| {
        contract_error(contract, format!("invalid address '{}' in artifact", network.address))
    })?;

    tracing::debug!(
        contract = contract,
        artifact = artifact.contract_name.as_deref().unwrap_or("unknown"),
        address = %address,
        "Resolved contract from artifact"
    );
    Ok(address)
}

/// Lowest numeric network id; non-numeric ids sort after every number.
fn first_network(networks: &BTreeMap<String, ArtifactNetwork>) -> Option<&ArtifactNetwork> {
    networks
        .iter()
        .min_by_key(|(id, _)| match id.parse::<u64>() {
            Ok(n) => (false, n, String::new()),
            Err(_) => (true, 0, id.to_string()),
        })
        .map(|(_, network)| network)
}

/// Token id of the first ERC-721 mint among `logs`.
pub fn minted_token_id(logs: &[Log]) -> Option<U256> {
    logs.iter()
        .filter_map(|log| log.log_decode::<Transfer>().ok())
        .map(|decoded| decoded.inner.data)
        .find(|transfer| transfer.from == Address::ZERO)
        .map(|transfer| transfer.tokenId)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{address, Bytes, LogData, B256};
    use alloy::sol_types::SolEvent;
    use std::io::Write;

    fn artifact_dir(name: &str, body: &str) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let mut file = fs::File::create(dir.path().join(name)).unwrap();
        file.write_all(body.as_bytes()).unwrap();
        dir
    }

    fn config_for(dir: &tempfile::TempDir) -> ContractsConfig {
        ContractsConfig {
            build_dir: dir.path().to_string_lossy().into_owned(),
            ..ContractsConfig::default()
        }
    }

    #[test]
    fn test_explicit_address_wins() {
        let config = ContractsConfig::default();
        let reference = ContractRef {
            address: Some("0x5FbDB2315678afecb367f032d93F642f64180aa3".to_string()),
            artifact: "Missing.json".to_string(),
        };
        let resolved = resolve_address("identity", &reference, &config).unwrap();
        assert_eq!(resolved, address!("5FbDB2315678afecb367f032d93F642f64180aa3"));
    }

    #[test]
    fn test_artifact_first_network() {
        let dir = artifact_dir(
            "MyNFT.json",
            r#"{"contractName":"MyNFT","abi":[],"networks":{"5777":{"address":"0x5FbDB2315678afecb367f032d93F642f64180aa3"}}}"#,
        );
        let config = config_for(&dir);
        let resolved = resolve_address("identity", &config.identity, &config).unwrap();
        assert_eq!(resolved, address!("5FbDB2315678afecb367f032d93F642f64180aa3"));
    }

    #[test]
    fn test_artifact_first_network_is_lowest_numeric_id() {
        let dir = artifact_dir(
            "MyNFT.json",
            r#"{"networks":{
                "1337":{"address":"0x5FbDB2315678afecb367f032d93F642f64180aa3"},
                "999":{"address":"0xe7f1725E7734CE288F8367e1Bb143E90bb3F0512"}}}"#,
        );
        let config = config_for(&dir);
        let resolved = resolve_address("identity", &config.identity, &config).unwrap();
        assert_eq!(resolved, address!("e7f1725E7734CE288F8367e1Bb143E90bb3F0512"));
    }

    #[test]
    fn test_artifact_selected_network() {
        let dir = artifact_dir(
            "MyNFT.json",
            r#"{"networks":{
                "1337":{"address":"0x5FbDB2315678afecb367f032d93F642f64180aa3"},
                "5777":{"address":"0xe7f1725E7734CE288F8367e1Bb143E90bb3F0512"}}}"#,
        );
        let mut config = config_for(&dir);
        config.network_id = Some("5777".to_string());
        let resolved = resolve_address("identity", &config.identity, &config).unwrap();
        assert_eq!(resolved, address!("e7f1725E7734CE288F8367e1Bb143E90bb3F0512"));
    }

    #[test]
    fn test_artifact_without_networks() {
        let dir = artifact_dir("MyNFT.json", r#"{"contractName":"MyNFT","networks":{}}"#);
        let config = config_for(&dir);
        let err = resolve_address("identity", &config.identity, &config).unwrap_err();
        assert!(err.to_string().contains("no networks"));
    }

    #[test]
    fn test_missing_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_for(&dir);
        let err = ContractAddresses::resolve(&config).unwrap_err();
        assert!(err.to_string().starts_with("Contract identity"));
    }

    #[test]
    fn test_minted_token_id_from_logs() {
        let to = address!("f39fd6e51aad88f6f4ce6ab8827279cfffb92266");
        let token = U256::from(42u64);
        let topics = vec![
            Transfer::SIGNATURE_HASH,
            Address::ZERO.into_word(),
            to.into_word(),
            B256::from(token.to_be_bytes::<32>()),
        ];
        let log = Log {
            inner: alloy::primitives::Log {
                address: Address::ZERO,
                data: LogData::new_unchecked(topics, Bytes::new()),
            },
            ..Default::default()
        };

        assert_eq!(minted_token_id(&[log]), Some(token));
        assert_eq!(minted_token_id(&[]), None);
    }
}
