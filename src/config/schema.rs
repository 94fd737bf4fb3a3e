//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the portal.
//! All types derive Serde traits for deserialization from config files, and
//! every section has defaults so a missing file still yields a runnable setup.

use serde::{Deserialize, Serialize};

/// Root configuration for the campus portal.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct PortalConfig {
    /// Listener configuration (bind address, TLS, public URL).
    pub listener: ListenerConfig,

    /// Database connection and backend selection.
    pub database: DatabaseConfig,

    /// Blockchain integration settings.
    pub blockchain: BlockchainConfig,

    /// Deployed contract locations.
    pub contracts: ContractsConfig,

    /// Fee defaults.
    pub fees: FeeConfig,

    /// Room and event booking limits.
    pub amenities: AmenitiesConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    #[serde(default)]
    pub admin: AdminConfig,

    #[serde(default)]
    pub security: SecurityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:3000").
    pub bind_address: String,

    /// Base URL embedded in NFT token URIs.
    pub public_url: String,

    /// Optional TLS configuration.
    pub tls: Option<TlsConfig>,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
            public_url: "http://localhost:3000".to_string(),
            tls: None,
        }
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,
}

/// Which store implementation backs the portal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Postgres,
    Memory,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub backend: StoreBackend,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,

    /// Target database, created on startup when missing.
    pub name: String,

    /// Create the target database through the `postgres` maintenance database.
    pub create_if_missing: bool,

    pub max_connections: u32,

    /// Seconds to wait for a pooled connection.
    pub acquire_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Postgres,
            host: "localhost".to_string(),
            port: 5432,
            user: "postgres".to_string(),
            password: String::new(),
            name: "nft_identity".to_string(),
            create_if_missing: true,
            max_connections: 10,
            acquire_timeout_secs: 5,
        }
    }
}

/// Blockchain integration configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BlockchainConfig {
    /// Enable blockchain integration.
    pub enabled: bool,

    /// JSON-RPC endpoint URL.
    pub rpc_url: String,

    /// Failover JSON-RPC endpoint URLs (read path only).
    #[serde(default)]
    pub failover_urls: Vec<String>,

    /// Chain ID (1337 for Ganache, 31337 for Anvil).
    pub chain_id: u64,

    /// RPC request timeout in seconds.
    pub rpc_timeout_secs: u64,

    /// Number of block confirmations to wait for after a receipt. Zero skips the wait.
    pub confirmation_blocks: u32,

    /// Upper bound on the confirmation wait in seconds.
    pub confirmation_timeout_secs: u64,

    /// Maximum gas price in gwei (protection against spikes).
    pub max_gas_price_gwei: u64,
}

impl Default for BlockchainConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            rpc_url: "http://localhost:8545".to_string(),
            failover_urls: Vec::new(),
            chain_id: 1337,
            rpc_timeout_secs: 10,
            confirmation_blocks: 0,
            confirmation_timeout_secs: 60,
            max_gas_price_gwei: 500,
        }
    }
}

impl BlockchainConfig {
    /// Worst-case seconds for one contract call: the gas price read across
    /// every node, the send, the receipt wait and the confirmation wait.
    pub fn call_budget_secs(&self) -> u64 {
        let nodes = 1 + self.failover_urls.len() as u64;
        let confirmation = if self.confirmation_blocks > 0 {
            self.confirmation_timeout_secs
        } else {
            0
        };
        self.rpc_timeout_secs * (nodes + 2) + confirmation
    }
}

/// Location of a single deployed contract.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ContractRef {
    /// Explicit address; takes precedence over the artifact.
    #[serde(default)]
    pub address: Option<String>,

    /// Truffle artifact file name, relative to `contracts.build_dir`.
    pub artifact: String,
}

impl ContractRef {
    fn artifact(name: &str) -> Self {
        Self {
            address: None,
            artifact: name.to_string(),
        }
    }
}

/// Deployed contract configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ContractsConfig {
    /// Directory holding compiled truffle artifacts.
    pub build_dir: String,

    /// Truffle network id to read from artifacts. First entry when unset.
    pub network_id: Option<String>,

    pub identity: ContractRef,
    pub course_registration: ContractRef,
    pub certificate: ContractRef,
    pub fee_payment: ContractRef,
    pub amenities: ContractRef,
}

impl Default for ContractsConfig {
    fn default() -> Self {
        Self {
            build_dir: "build/contracts".to_string(),
            network_id: None,
            identity: ContractRef::artifact("MyNFT.json"),
            course_registration: ContractRef::artifact("MyCourseReg.json"),
            certificate: ContractRef::artifact("CertificateNFT.json"),
            fee_payment: ContractRef::artifact("FeePaymentNFT.json"),
            amenities: ContractRef::artifact("AmenitiesNFT.json"),
        }
    }
}

/// Fee configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FeeConfig {
    /// Semester fee in ether used when a semester is created without one.
    pub default_amount_eth: String,
}

impl Default for FeeConfig {
    fn default() -> Self {
        Self {
            default_amount_eth: "0.05".to_string(),
        }
    }
}

/// Amenities configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AmenitiesConfig {
    /// Longest single room booking in hours.
    pub max_booking_hours: u32,
}

impl Default for AmenitiesConfig {
    fn default() -> Self {
        Self {
            max_booking_hours: 4,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    /// Must exceed [`BlockchainConfig::call_budget_secs`] when the chain is enabled.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 90 }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable the admin routes.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,
}

/// Placeholder admin key; validation rejects it when admin is enabled.
pub const ADMIN_KEY_PLACEHOLDER: &str = "CHANGE_ME_IN_PRODUCTION";

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: ADMIN_KEY_PLACEHOLDER.to_string(),
        }
    }
}

/// Security hardening configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Enable security headers.
    pub enable_headers: bool,
    /// Maximum body size in bytes.
    pub max_body_size: usize,
    /// Allow any origin (the portal front end is served separately).
    pub cors_permissive: bool,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            enable_headers: true,
            max_body_size: 256 * 1024,
            cors_permissive: true,
        }
    }
}
