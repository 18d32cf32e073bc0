use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::document::{Decoded, Document, FieldReader};
use crate::temporal;

/// A claim that a recording from a given camera, with a given content hash,
/// existed at `issued_at`.
///
/// `verified` is advisory only. It is set once at issuance and never read
/// back for an authenticity decision.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Certificate {
    pub id: String,
    pub camera_id: String,
    pub camera_location: String,
    /// Epoch milliseconds.
    pub issued_at: i64,
    /// Hex SHA-256 of the recording (64 chars).
    pub video_hash: String,
    /// Ledger position claiming this certificate; always >= 1 once issued.
    pub block_number: u64,
    pub previous_block_hash: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, Value>,
    #[serde(default)]
    pub verified: bool,
}

impl Certificate {
    /// Returns `true` if the certificate points past genesis.
    pub fn is_anchored(&self) -> bool {
        self.block_number >= 1
    }

    pub fn issued_at_display(&self) -> String {
        temporal::format_display(self.issued_at)
    }

    /// String-valued metadata entry.
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(Value::as_str)
    }

    pub fn to_document(&self) -> Document {
        let mut doc = Document::new();
        doc.insert("id".into(), Value::from(self.id.clone()));
        doc.insert("cameraId".into(), Value::from(self.camera_id.clone()));
        doc.insert(
            "cameraLocation".into(),
            Value::from(self.camera_location.clone()),
        );
        doc.insert("issuedAt".into(), Value::from(self.issued_at));
        doc.insert("videoHash".into(), Value::from(self.video_hash.clone()));
        doc.insert("blockNumber".into(), Value::from(self.block_number));
        doc.insert(
            "previousBlockHash".into(),
            Value::from(self.previous_block_hash.clone()),
        );
        doc.insert(
            "metadata".into(),
            Value::Object(
                self.metadata
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect(),
            ),
        );
        doc.insert("verified".into(), Value::from(self.verified));
        doc
    }

    /// Decode a certificate document, substituting defaults for unreadable
    /// fields.
    pub fn decode(document: &Document) -> Decoded<Self> {
        let mut r = FieldReader::new(document);
        let certificate = Self {
            id: r.string("id"),
            camera_id: r.string("cameraId"),
            camera_location: r.string("cameraLocation"),
            issued_at: r.i64("issuedAt"),
            video_hash: r.string("videoHash"),
            block_number: r.u64("blockNumber"),
            previous_block_hash: r.string("previousBlockHash"),
            metadata: r.object("metadata"),
            verified: r.bool("verified"),
        };
        r.finish(certificate)
    }

    pub fn from_document(document: &Document) -> Self {
        Self::decode(document).into_inner()
    }
}
