use std::collections::BTreeSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use vcl_crypto::{
    hashes_match, is_sha256_hex, recompute_block_hash, short_hash, ChainError, HashChainVerifier,
    Signature, VerifyingKey,
};
use vcl_store::SharedStore;
use vcl_types::{temporal, Certificate, VerificationResult, VerificationStatus};

use crate::builder::{ISSUER_KEY_FIELD, ISSUER_SIGNATURE_FIELD};
use crate::error::{LedgerError, LedgerResult};

/// Kind of chain integrity fault.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FaultKind {
    MissingGenesis,
    GenesisAltered,
    Gap,
    BrokenLink,
    HashMismatch,
    /// A block past the pending window that no certificate references.
    OrphanBlock,
}

impl FaultKind {
    /// Verification status the fault maps to.
    pub fn status(self) -> VerificationStatus {
        match self {
            Self::GenesisAltered | Self::HashMismatch => VerificationStatus::Tampered,
            Self::MissingGenesis | Self::Gap | Self::BrokenLink | Self::OrphanBlock => {
                VerificationStatus::ChainBroken
            }
        }
    }
}

/// First integrity fault found while walking the chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainFault {
    pub block_number: u64,
    pub kind: FaultKind,
    pub description: String,
}

impl From<&ChainError> for ChainFault {
    fn from(err: &ChainError) -> Self {
        let kind = match err {
            ChainError::MissingGenesis { .. } => FaultKind::MissingGenesis,
            ChainError::GenesisAltered => FaultKind::GenesisAltered,
            ChainError::Gap { .. } => FaultKind::Gap,
            ChainError::BrokenLink { .. } => FaultKind::BrokenLink,
            ChainError::HashMismatch { .. } => FaultKind::HashMismatch,
        };
        Self {
            block_number: err.block_number(),
            kind,
            description: err.to_string(),
        }
    }
}

/// Result of walking the whole chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainReport {
    pub intact: bool,
    /// `AUTHENTIC`, `PENDING`, or the status of the fault.
    pub status: VerificationStatus,
    /// Blocks found in the store.
    pub block_count: u64,
    pub fault: Option<ChainFault>,
    /// Recent blocks whose certificate has not been written yet.
    #[serde(default)]
    pub pending_blocks: Vec<u64>,
    pub verified_at: i64,
}

impl ChainReport {
    /// Block number of the first fault, if any.
    pub fn broken_at(&self) -> Option<u64> {
        self.fault.as_ref().map(|f| f.block_number)
    }
}

/// Read-side verification. Every call re-reads the records it checks and
/// never writes; the stored `verified` flag is ignored.
#[derive(Clone)]
pub struct Verifier {
    store: SharedStore,
    trusted_issuer: Option<VerifyingKey>,
    pending_window: Duration,
}

impl Verifier {
    pub fn new(store: SharedStore) -> Self {
        Self {
            store,
            trusted_issuer: None,
            pending_window: Duration::ZERO,
        }
    }

    /// Report uncertified blocks younger than `window` as pending instead
    /// of orphaned.
    pub fn with_pending_window(mut self, window: Duration) -> Self {
        self.pending_window = window;
        self
    }

    /// Require every certificate to carry a valid seal from `issuer`.
    pub fn with_trusted_issuer(mut self, issuer: VerifyingKey) -> Self {
        self.trusted_issuer = Some(issuer);
        self
    }

    pub fn trusted_issuer(&self) -> Option<&VerifyingKey> {
        self.trusted_issuer.as_ref()
    }

    /// Check one certificate against its block and the block's predecessor.
    ///
    /// Store failures come back as `Err`; every other outcome, including
    /// tampering and a broken chain, is a `VerificationResult`. Nothing is
    /// retried.
    pub async fn verify_certificate(&self, id: &str) -> LedgerResult<VerificationResult> {
        let result = self.evaluate(id).await?;
        match result.status {
            VerificationStatus::Authentic => {}
            VerificationStatus::NotFound | VerificationStatus::Pending => {
                info!(certificate = id, status = %result.status, "{}", result.message)
            }
            VerificationStatus::Tampered | VerificationStatus::ChainBroken => {
                warn!(certificate = id, status = %result.status, "{}", result.message)
            }
        }
        Ok(result)
    }

    async fn evaluate(&self, id: &str) -> LedgerResult<VerificationResult> {
        let Some(certificate) = self.store.get_certificate(id).await? else {
            return Ok(VerificationResult::not_found(format!(
                "no certificate with id {id}"
            )));
        };

        let n = certificate.block_number;
        if !certificate.is_anchored() {
            return Ok(VerificationResult::chain_broken(
                certificate,
                "certificate references the genesis block",
            ));
        }

        let Some(block) = self.store.get_block(n).await? else {
            return Ok(VerificationResult::chain_broken(
                certificate,
                format!("block {n} referenced by the certificate is missing"),
            ));
        };

        if !hashes_match(&recompute_block_hash(&block), &block.hash) {
            return Ok(VerificationResult::tampered(
                certificate,
                format!("block {n} content does not match its recorded hash"),
            ));
        }
        if !hashes_match(&certificate.video_hash, &block.payload_hash) {
            return Ok(VerificationResult::tampered(
                certificate,
                format!("certificate video hash differs from the payload of block {n}"),
            ));
        }
        if !hashes_match(&certificate.previous_block_hash, &block.previous_hash) {
            return Ok(VerificationResult::tampered(
                certificate,
                format!("certificate previous block hash differs from block {n}"),
            ));
        }
        if let Some(reason) = self.seal_problem(&certificate, &block.hash) {
            return Ok(VerificationResult::tampered(certificate, reason));
        }

        let Some(predecessor) = self.store.get_block(n - 1).await? else {
            return Ok(VerificationResult::chain_broken(
                certificate,
                format!("predecessor block {} is missing", n - 1),
            ));
        };
        if !hashes_match(&block.previous_hash, &predecessor.hash) {
            return Ok(VerificationResult::chain_broken(
                certificate,
                format!("block {n} does not link to block {}", n - 1),
            ));
        }

        let verified_at = temporal::format_display(temporal::now_millis());
        Ok(VerificationResult::authentic(
            certificate,
            format!("certificate is anchored at block {n} and its chain link is intact"),
        )
        .with_detail("blockNumber", n)
        .with_detail("blockHash", short_hash(&block.hash, 8))
        .with_detail("verifiedAt", verified_at))
    }

    /// Reason the issuer seal is unacceptable, if a trusted issuer is set.
    fn seal_problem(&self, certificate: &Certificate, block_hash: &str) -> Option<String> {
        let trusted = self.trusted_issuer.as_ref()?;
        let Some(seal_hex) = certificate.metadata_str(ISSUER_SIGNATURE_FIELD) else {
            return Some("certificate carries no issuer seal".into());
        };
        if let Some(key_hex) = certificate.metadata_str(ISSUER_KEY_FIELD) {
            if !key_hex.eq_ignore_ascii_case(&trusted.to_hex()) {
                return Some("certificate was sealed by an untrusted issuer".into());
            }
        }
        let valid = Signature::from_hex(seal_hex)
            .ok()
            .is_some_and(|seal| trusted.verify_seal(&certificate.id, block_hash, &seal).is_ok());
        if valid {
            None
        } else {
            Some("issuer seal does not verify".into())
        }
    }

    /// Verify a certificate and check that a presented recording hash is
    /// the certified one.
    pub async fn verify_recording(
        &self,
        id: &str,
        presented_hash: &str,
    ) -> LedgerResult<VerificationResult> {
        if !is_sha256_hex(presented_hash) {
            return Err(LedgerError::InvalidInput(format!(
                "presented hash must be 64 hex characters, got {presented_hash:?}"
            )));
        }

        let result = self.verify_certificate(id).await?;
        if result.status != VerificationStatus::Authentic {
            return Ok(result);
        }
        let Some(certificate) = result.certificate.clone() else {
            return Ok(result);
        };

        if hashes_match(presented_hash, &certificate.video_hash) {
            Ok(result.with_detail("recordingMatches", true))
        } else {
            warn!(certificate = id, "presented recording does not match the certified hash");
            Ok(VerificationResult::tampered(
                certificate,
                "presented recording does not match the certified video hash",
            )
            .with_detail("presentedHash", presented_hash.to_ascii_lowercase()))
        }
    }

    /// Walk every block in ascending order and match blocks to
    /// certificates. The lowest faulty block is reported; a link fault wins
    /// over an orphan at the same number.
    pub async fn verify_chain(&self) -> LedgerResult<ChainReport> {
        let blocks = self.store.all_blocks().await?;
        let certified: BTreeSet<u64> = self
            .store
            .all_certificates()
            .await?
            .iter()
            .map(|c| c.block_number)
            .collect();
        let now = temporal::now_millis();
        let window_ms = i64::try_from(self.pending_window.as_millis()).unwrap_or(i64::MAX);

        let link_fault = HashChainVerifier::verify_chain(&blocks)
            .err()
            .map(|err| ChainFault::from(&err));

        let mut pending_blocks = Vec::new();
        let mut orphan = None;
        for block in blocks
            .iter()
            .filter(|b| !b.is_genesis() && !certified.contains(&b.block_number))
        {
            if now.saturating_sub(block.timestamp) < window_ms {
                pending_blocks.push(block.block_number);
            } else {
                orphan = Some(ChainFault {
                    block_number: block.block_number,
                    kind: FaultKind::OrphanBlock,
                    description: format!(
                        "block {} is not referenced by any certificate",
                        block.block_number
                    ),
                });
                break;
            }
        }

        let fault = match (link_fault, orphan) {
            (Some(link), Some(orphan)) if orphan.block_number < link.block_number => Some(orphan),
            (Some(link), _) => Some(link),
            (None, orphan) => orphan,
        };
        let status = match &fault {
            Some(fault) => {
                warn!(block = fault.block_number, kind = ?fault.kind, "{}", fault.description);
                fault.kind.status()
            }
            None if !pending_blocks.is_empty() => {
                info!(blocks = ?pending_blocks, "blocks awaiting their certificate");
                VerificationStatus::Pending
            }
            None => VerificationStatus::Authentic,
        };

        Ok(ChainReport {
            intact: fault.is_none(),
            status,
            block_count: blocks.len() as u64,
            fault,
            pending_blocks,
            verified_at: now,
        })
    }
}

impl std::fmt::Debug for Verifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Verifier")
            .field("trusted_issuer", &self.trusted_issuer)
            .field("pending_window", &self.pending_window)
            .finish()
    }
}
