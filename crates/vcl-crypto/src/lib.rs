//! Hash engine for the video certification ledger.
//!
//! Provides SHA-256 hashing with length-prefixed, domain-separated field
//! encoding for block headers, certificate id derivation, Ed25519 issuer
//! seals, and hash chain verification over stored blocks.
//!
//! All crypto operations wrap established libraries; there is no custom cryptography.
//! Hashing never fails; callers validate inputs (e.g. with
//! [`is_sha256_hex`]) before hashing.

pub mod chain;
pub mod hasher;
pub mod ids;
pub mod signer;

pub use chain::{recompute_block_hash, ChainError, HashChainVerifier};
pub use hasher::{
    block_hash, hashes_match, is_sha256_hex, sha256, sha256_hex, sha256_reader, short_hash,
    FieldHasher,
};
pub use ids::{block_nonce, certificate_id, certificate_id_with_salt, CERTIFICATE_ID_LEN};
pub use signer::{seal_message, Signature, SignatureError, SigningKey, VerifyingKey};
