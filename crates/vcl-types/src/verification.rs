use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::certificate::Certificate;
use crate::temporal;

/// Outcome of a verification. These are results, not errors.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerificationStatus {
    /// Block hash recomputes and links to its predecessor.
    Authentic,
    /// A record's content no longer matches its recorded hash.
    Tampered,
    /// No certificate with the requested id.
    NotFound,
    /// The certificate's block, or its link to the predecessor, is missing or wrong.
    ChainBroken,
    /// Verification has not completed yet.
    #[default]
    Pending,
}

impl VerificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Authentic => "AUTHENTIC",
            Self::Tampered => "TAMPERED",
            Self::NotFound => "NOT_FOUND",
            Self::ChainBroken => "CHAIN_BROKEN",
            Self::Pending => "PENDING",
        }
    }
}

impl fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of verifying one certificate. Built fresh on every call and never
/// persisted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationResult {
    pub status: VerificationStatus,
    pub certificate: Option<Certificate>,
    pub message: String,
    /// Epoch milliseconds at which the result was produced.
    pub verified_at: i64,
    pub chain_integrity: bool,
    #[serde(default)]
    pub details: BTreeMap<String, Value>,
}

impl VerificationResult {
    fn new(
        status: VerificationStatus,
        certificate: Option<Certificate>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            status,
            chain_integrity: status == VerificationStatus::Authentic,
            certificate,
            message: message.into(),
            verified_at: temporal::now_millis(),
            details: BTreeMap::new(),
        }
    }

    pub fn pending() -> Self {
        Self::new(VerificationStatus::Pending, None, "verification in progress")
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(VerificationStatus::NotFound, None, message)
    }

    pub fn chain_broken(certificate: Certificate, message: impl Into<String>) -> Self {
        Self::new(VerificationStatus::ChainBroken, Some(certificate), message)
    }

    pub fn tampered(certificate: Certificate, message: impl Into<String>) -> Self {
        Self::new(VerificationStatus::Tampered, Some(certificate), message)
    }

    pub fn authentic(certificate: Certificate, message: impl Into<String>) -> Self {
        Self::new(VerificationStatus::Authentic, Some(certificate), message)
    }

    /// Attach a supplementary detail.
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    /// `true` only for an authentic certificate on an intact chain.
    pub fn is_valid(&self) -> bool {
        self.status == VerificationStatus::Authentic && self.chain_integrity
    }
}

impl Default for VerificationResult {
    fn default() -> Self {
        Self::pending()
    }
}
