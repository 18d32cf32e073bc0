//! Ledger store adapters for the video certification ledger.
//!
//! The store is a persistence adapter and nothing more: it appends blocks
//! and certificates, looks them up, and answers the handful of ordered
//! queries the ledger needs. All chain logic lives in `vcl-ledger`.
//!
//! # Backends
//!
//! All backends implement the [`LedgerStore`] trait:
//!
//! - [`InMemoryLedgerStore`] -- map-based store for tests and embedding
//! - [`FsLedgerStore`] -- one JSON document per record on a local filesystem
//! - [`TimeoutStore`] -- decorator bounding every call by a deadline
//!
//! # Design Rules
//!
//! 1. Blocks and certificates are never updated or deleted through the trait.
//!    Both writes are create-if-absent on the record key.
//! 2. `put_block_if_absent` is the only concurrency-control primitive: it
//!    succeeds for exactly one writer per block number.
//! 3. Absence is `Ok(None)`, never an error.
//! 4. Every I/O failure or timeout surfaces as [`StoreError::Unavailable`].
//! 5. Documents are decoded leniently; unreadable fields are logged and
//!    replaced by defaults. A block is always reported at its store key.

pub mod config;
pub mod error;
pub mod fs;
pub mod memory;
pub mod timeout;
pub mod traits;

mod codec;

// Re-export primary types at crate root for ergonomic imports.
pub use config::{StoreBackend, StoreConfig};
pub use error::{StoreError, StoreResult};
pub use fs::FsLedgerStore;
pub use memory::InMemoryLedgerStore;
pub use timeout::TimeoutStore;
pub use traits::{LedgerStore, SharedStore};
