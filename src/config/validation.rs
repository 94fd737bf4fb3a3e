//! Configuration validation.
//!
//! Serde handles the syntax; this module checks values that would only fail
//! later at runtime: identifiers spliced into DDL, ether amounts, URLs and
//! timeouts. All errors are collected rather than stopping at the first.

use crate::config::schema::{PortalConfig, StoreBackend, ADMIN_KEY_PLACEHOLDER};
use crate::domain::parse_amount;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// `CREATE DATABASE` cannot take a bind parameter, so the name must be a plain identifier.
pub fn is_sql_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    name.len() <= 63 && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

pub fn validate_config(config: &PortalConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.database.backend == StoreBackend::Postgres {
        if !is_sql_identifier(&config.database.name) {
            errors.push(ValidationError::new(
                "database.name",
                format!("'{}' is not a valid SQL identifier", config.database.name),
            ));
        }
        if config.database.max_connections == 0 {
            errors.push(ValidationError::new("database.max_connections", "must be > 0"));
        }
    }

    if url::Url::parse(&config.listener.public_url).is_err() {
        errors.push(ValidationError::new(
            "listener.public_url",
            format!("'{}' is not a valid URL", config.listener.public_url),
        ));
    }

    if parse_amount(&config.fees.default_amount_eth).is_err() {
        errors.push(ValidationError::new(
            "fees.default_amount_eth",
            format!("'{}' is not an ether amount", config.fees.default_amount_eth),
        ));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be > 0"));
    }

    if config.amenities.max_booking_hours == 0 {
        errors.push(ValidationError::new("amenities.max_booking_hours", "must be > 0"));
    }

    if config.blockchain.enabled {
        if url::Url::parse(&config.blockchain.rpc_url).is_err() {
            errors.push(ValidationError::new(
                "blockchain.rpc_url",
                format!("'{}' is not a valid URL", config.blockchain.rpc_url),
            ));
        }
        if config.blockchain.rpc_timeout_secs == 0 {
            errors.push(ValidationError::new("blockchain.rpc_timeout_secs", "must be > 0"));
        }
        let budget = config.blockchain.call_budget_secs();
        if config.timeouts.request_secs <= budget {
            errors.push(ValidationError::new(
                "timeouts.request_secs",
                format!(
                    "{}s does not cover a contract call, which may take {}s",
                    config.timeouts.request_secs, budget
                ),
            ));
        }
    }

    if config.admin.enabled
        && (config.admin.api_key.is_empty() || config.admin.api_key == ADMIN_KEY_PLACEHOLDER)
    {
        errors.push(ValidationError::new(
            "admin.api_key",
            "must be set when the admin API is enabled",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
