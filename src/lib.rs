//! Campus ledger: a university portal that records every action both as a
//! database row and as an NFT contract call.

pub mod admin;
pub mod blockchain;
pub mod config;
pub mod db;
pub mod domain;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod portal;

pub use config::schema::PortalConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use portal::{Portal, PortalError};
