//! HTTP server for the video certification ledger.
//!
//! Exposes issuance, certificate lookup, verification and chain audit over
//! a JSON API. Verification outcomes are always `200 OK` with the status in
//! the body; only store and input failures map to error statuses.

pub mod config;
pub mod error;
pub mod handler;
pub mod router;
pub mod server;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use handler::AppState;
pub use server::VclServer;
