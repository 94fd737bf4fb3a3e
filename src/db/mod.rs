//! Persistence subsystem.
//!
//! # Data Flow
//! ```text
//! startup
//!     → bootstrap.rs (create database if missing, CREATE TABLE IF NOT EXISTS list)
//!     → postgres.rs (PgStore over a shared PgPool)
//!
//! handlers / portal operations
//!     → store.rs (PortalStore trait)
//!     → PgStore | MemoryStore
//! ```

pub mod bootstrap;
pub mod memory;
pub mod postgres;
pub mod store;

pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use store::{PortalStore, StoreError, StoreResult};
