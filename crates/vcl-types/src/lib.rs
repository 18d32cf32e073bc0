//! Ledger entities for the video certification ledger (VCL).
//!
//! This crate holds the pure value objects shared by every other VCL crate.
//! Nothing here touches storage or hashing; entities only know how to map
//! themselves to and from the document shape used by the backing store.
//!
//! # Key Types
//!
//! - [`Certificate`]: claim that a recording with a given content hash existed
//! - [`Block`]: hash-linked ledger entry anchoring one certificate
//! - [`VerificationResult`]: fresh, never-persisted outcome of a verification
//! - [`Document`]: JSON object representation used by store backends
//!
//! Decoding is lenient: a malformed field falls back to its default and is
//! reported through [`Decoded::defaulted`] instead of failing the record.

pub mod block;
pub mod certificate;
pub mod document;
pub mod error;
pub mod temporal;
pub mod verification;

pub use block::{Block, GENESIS_BLOCK_NUMBER, GENESIS_HASH, GENESIS_PAYLOAD_HASH, ZERO_HASH};
pub use certificate::Certificate;
pub use document::{encode_document, parse_document, Decoded, Document};
pub use error::TypeError;
pub use verification::{VerificationResult, VerificationStatus};
