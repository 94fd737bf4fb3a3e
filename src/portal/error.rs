use thiserror::Error;

use crate::blockchain::BlockchainError;
use crate::db::StoreError;

/// Failure of a portal operation, classified for the HTTP layer.
#[derive(Debug, Error)]
pub enum PortalError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Invalid(String),

    /// The caller lacks the on-chain identity or ownership the action needs.
    #[error("{0}")]
    Forbidden(String),

    #[error("Database error: {0}")]
    Store(String),

    #[error("Blockchain error: {0}")]
    Chain(#[from] BlockchainError),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type PortalResult<T> = Result<T, PortalError>;

impl From<StoreError> for PortalError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => PortalError::NotFound(format!("{} not found", what)),
            StoreError::Conflict(detail) => PortalError::Conflict(detail),
            StoreError::Constraint(detail) => PortalError::Invalid(detail),
            StoreError::Database(detail) => PortalError::Store(detail),
        }
    }
}
