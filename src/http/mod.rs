//! HTTP surface of the portal.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (request id, trace, timeout, body limit, CORS, headers)
//!     → middleware.rs (per-route metrics)
//!     → handlers.rs / admin (extract, call Portal)
//!     → response.rs (JSON envelope, error → status)
//! ```

pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod response;
pub mod server;
pub mod tls;

pub use middleware::X_REQUEST_ID;
pub use server::{build_router, HttpServer};
