//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize, environment overrides)
//!     → validation.rs (semantic checks)
//!     → PortalConfig (validated, immutable)
//!     → shared via Arc to all subsystems
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal configs
//! - Environment variables override the file (DB_*, PORT, RPC_URL)
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    AdminConfig, AmenitiesConfig, BlockchainConfig, ContractRef, ContractsConfig, DatabaseConfig,
    FeeConfig, ListenerConfig, LogFormat, ObservabilityConfig, PortalConfig, SecurityConfig,
    StoreBackend, TimeoutConfig, TlsConfig,
};
