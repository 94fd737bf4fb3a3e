//! Portal entities and request payloads.
//!
//! Rows map one-to-one onto the tables created by `db::bootstrap`. Ether
//! amounts stay decimal strings end to end; [`parse_amount`] is the single
//! place they are interpreted.

pub mod amount;
pub mod entities;
pub mod requests;

pub use amount::parse_amount;
pub use entities::*;
pub use requests::*;
