use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::document::{Decoded, Document, FieldReader};

/// Block number reserved for the genesis block.
pub const GENESIS_BLOCK_NUMBER: u64 = 0;

/// 64 zero characters: the genesis block's `previous_hash`.
pub const ZERO_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

/// Published genesis hash: SHA-256 of the ASCII string `vcl-genesis-v1`.
///
/// Computed block hashes are domain-separated with a different tag, so no
/// block can ever hash to this value.
pub const GENESIS_HASH: &str = "63e991f1d427f43b83d110bc148331909d60ec010490f88890c760eb22edccba";

/// Genesis carries no certificate, so its payload is empty.
pub const GENESIS_PAYLOAD_HASH: &str = "";

/// Ledger entry anchoring one certificate's content hash at a chain position.
///
/// Blocks are immutable once written. `hash` is the digest of the other five
/// fields; verification always recomputes it rather than trusting it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub block_number: u64,
    /// Creation instant in epoch milliseconds.
    pub timestamp: i64,
    /// `video_hash` of the anchored certificate.
    pub payload_hash: String,
    pub previous_hash: String,
    pub hash: String,
    /// Uniqueness token recorded so the hash can be reproduced.
    pub nonce: u64,
}

impl Block {
    /// The fixed genesis block. Its timestamp is pinned at zero so every
    /// instance that initializes the chain writes an identical document.
    pub fn genesis() -> Self {
        Self {
            block_number: GENESIS_BLOCK_NUMBER,
            timestamp: 0,
            payload_hash: GENESIS_PAYLOAD_HASH.to_string(),
            previous_hash: ZERO_HASH.to_string(),
            hash: GENESIS_HASH.to_string(),
            nonce: 0,
        }
    }

    pub fn is_genesis(&self) -> bool {
        self.block_number == GENESIS_BLOCK_NUMBER
    }

    /// Returns `true` if every field equals the published genesis values.
    pub fn matches_genesis(&self) -> bool {
        *self == Self::genesis()
    }

    /// Store key for a block number: its decimal string form.
    pub fn document_key(block_number: u64) -> String {
        block_number.to_string()
    }

    pub fn key(&self) -> String {
        Self::document_key(self.block_number)
    }

    pub fn to_document(&self) -> Document {
        let mut doc = Document::new();
        doc.insert("blockNumber".into(), Value::from(self.block_number));
        doc.insert("timestamp".into(), Value::from(self.timestamp));
        doc.insert("payloadHash".into(), Value::from(self.payload_hash.clone()));
        doc.insert("previousHash".into(), Value::from(self.previous_hash.clone()));
        doc.insert("hash".into(), Value::from(self.hash.clone()));
        doc.insert("nonce".into(), Value::from(self.nonce));
        doc
    }

    /// Decode a block document, substituting defaults for unreadable fields.
    pub fn decode(document: &Document) -> Decoded<Self> {
        let mut r = FieldReader::new(document);
        let block = Self {
            block_number: r.u64("blockNumber"),
            timestamp: r.i64("timestamp"),
            payload_hash: r.string("payloadHash"),
            previous_hash: r.string("previousHash"),
            hash: r.string("hash"),
            nonce: r.u64("nonce"),
        };
        r.finish(block)
    }

    pub fn from_document(document: &Document) -> Self {
        Self::decode(document).into_inner()
    }
}
