//! HTTP client for the campus ledger portal.

mod client;

pub use client::{NewUser, PortalClient, SdkError};
