//! Extractors whose rejections use the portal's error envelope.

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{FromRequest, FromRequestParts};

use crate::portal::PortalError;

/// `axum::Json` with a `{"success": false, ...}` rejection.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(PortalError))]
pub struct ApiJson<T>(pub T);

/// `axum::extract::Path` with a `{"success": false, ...}` rejection.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(PortalError))]
pub struct ApiPath<T>(pub T);

impl From<JsonRejection> for PortalError {
    fn from(rejection: JsonRejection) -> Self {
        PortalError::Invalid(rejection.body_text())
    }
}

impl From<PathRejection> for PortalError {
    fn from(rejection: PathRejection) -> Self {
        PortalError::Invalid(rejection.body_text())
    }
}
