//! Portal operations.
//!
//! # Data Flow
//! ```text
//! handler
//!     → precondition reads (PortalStore)
//!     → contract call (NftLedger, skipped when the chain is disabled)
//!     → DB writes recording the result (+ `transactions` audit row)
//! ```
//!
//! The two writes are not atomic. Operations that insert first (user,
//! faculty, booking, event seat) delete their row when the contract call
//! fails. Operations that call the contract first (course registration,
//! certificate, fees) log the tx hash and bump
//! `campus_dual_write_divergence_total` when the row cannot be written.

mod academics;
mod amenities;
mod error;
mod fees;
mod identity;
pub mod metadata;
mod queries;

#[cfg(test)]
pub(crate) mod testing;

use alloy::primitives::Address;
use chrono::{NaiveDate, Utc};
use std::str::FromStr;
use std::sync::Arc;

use crate::blockchain::NftLedger;
use crate::config::PortalConfig;
use crate::db::{PortalStore, StoreError};
use crate::domain::User;
use crate::observability::metrics;

pub use error::{PortalError, PortalResult};
pub use queries::{AdminStatus, HealthReport};

/// Shared handle to the store, the optional ledger and config.
#[derive(Clone)]
pub struct Portal {
    store: Arc<dyn PortalStore>,
    ledger: Option<Arc<dyn NftLedger>>,
    config: Arc<PortalConfig>,
}

impl Portal {
    /// `ledger = None` runs every operation without its contract call.
    pub fn new(
        store: Arc<dyn PortalStore>,
        ledger: Option<Arc<dyn NftLedger>>,
        config: Arc<PortalConfig>,
    ) -> Self {
        Self {
            store,
            ledger,
            config,
        }
    }

    pub fn store(&self) -> &Arc<dyn PortalStore> {
        &self.store
    }

    pub fn ledger(&self) -> Option<&Arc<dyn NftLedger>> {
        self.ledger.as_ref()
    }

    pub fn config(&self) -> &PortalConfig {
        &self.config
    }

    fn today(&self) -> NaiveDate {
        Utc::now().date_naive()
    }

    /// Absolute URL under the portal's public base.
    fn public_link(&self, path: &str) -> String {
        format!(
            "{}{}",
            self.config.listener.public_url.trim_end_matches('/'),
            path
        )
    }

    pub fn identity_uri(&self, user_id: i32) -> String {
        self.public_link(&format!("/api/metadata/identity/{}", user_id))
    }

    pub fn faculty_uri(&self, faculty_id: i32) -> String {
        self.public_link(&format!("/api/metadata/faculty/{}", faculty_id))
    }

    pub fn certificate_uri(&self, user_id: i32, course_id: i32) -> String {
        self.public_link(&format!("/api/metadata/certificate/{}/{}", user_id, course_id))
    }

    pub fn fee_uri(&self, user_id: i32, semester_id: i32) -> String {
        self.public_link(&format!("/api/metadata/fee/{}/{}", user_id, semester_id))
    }

    pub fn booking_uri(&self, booking_id: i32) -> String {
        self.public_link(&format!("/api/metadata/booking/{}", booking_id))
    }

    async fn require_user(&self, user_id: i32) -> PortalResult<User> {
        self.store
            .find_user(user_id)
            .await?
            .ok_or_else(|| PortalError::NotFound(format!("User {} not found", user_id)))
    }

    /// With the chain enabled, actions need a minted identity token.
    fn require_identity(&self, user: &User) -> PortalResult<()> {
        if self.ledger.is_some() && user.identity_token_id.is_none() {
            return Err(PortalError::Forbidden(format!(
                "User {} has no on-chain identity",
                user.user_id
            )));
        }
        Ok(())
    }

    /// Recipient for a contract call: the request override, else the stored wallet.
    fn recipient(&self, user: &User, requested: Option<&str>) -> PortalResult<Address> {
        let present = |s: &&str| !s.trim().is_empty();
        let raw = requested
            .filter(present)
            .or(user.wallet_address.as_deref().filter(present))
            .ok_or_else(|| {
                PortalError::Invalid(format!("User {} has no wallet address", user.user_id))
            })?;
        parse_wallet(raw)
    }

    /// The chain call landed but the row did not.
    fn diverged(&self, operation: &'static str, tx_hash: &str, err: StoreError) -> PortalError {
        tracing::error!(
            operation = operation,
            tx_hash = %tx_hash,
            error = %err,
            "Contract call succeeded but the database write failed"
        );
        metrics::record_dual_write_divergence(operation);
        err.into()
    }
}

pub(crate) fn parse_wallet(raw: &str) -> PortalResult<Address> {
    Address::from_str(raw.trim())
        .map_err(|_| PortalError::Invalid(format!("Invalid wallet address '{}'", raw.trim())))
}

pub(crate) fn require_text(field: &str, value: &str) -> PortalResult<()> {
    if value.trim().is_empty() {
        return Err(PortalError::Invalid(format!("{} is required", field)));
    }
    Ok(())
}
