//! Core ledger logic for the video certification ledger (VCL).
//!
//! This crate is the heart of VCL. It provides:
//! - [`ChainBuilder`]: issues certificates by claiming the next block with a
//!   conditional write, retrying on contention with bounded backoff
//! - [`Verifier`]: recomputes authenticity of a certificate, a presented
//!   recording, or the whole chain on every call
//! - [`EventRouter`]: fan-out change notifications for issued certificates
//! - [`Ledger`]: facade wiring the three over one shared store
//!
//! Nothing here caches chain state between calls. Every issuance re-reads
//! the chain head from the store and every verification re-reads the
//! records it checks.

pub mod builder;
pub mod config;
pub mod error;
pub mod events;
pub mod ledger;
pub mod retry;
pub mod verifier;

#[cfg(test)]
mod test_support;

pub use builder::{ChainBuilder, IssueRequest, ISSUER_KEY_FIELD, ISSUER_SIGNATURE_FIELD};
pub use config::LedgerConfig;
pub use error::{LedgerError, LedgerResult};
pub use events::{EventFilter, EventRouter, EventStream, LedgerEvent};
pub use ledger::Ledger;
pub use retry::Backoff;
pub use verifier::{ChainFault, ChainReport, FaultKind, Verifier};
