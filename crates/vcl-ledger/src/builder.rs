use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, info, warn};
use vcl_crypto::{
    block_hash, block_nonce, certificate_id, hashes_match, is_sha256_hex, recompute_block_hash,
    SigningKey,
};
use vcl_store::{SharedStore, StoreError};
use vcl_types::{temporal, Block, Certificate, GENESIS_BLOCK_NUMBER};

use crate::config::LedgerConfig;
use crate::error::{LedgerError, LedgerResult};
use crate::events::{EventRouter, LedgerEvent};
use crate::retry::Backoff;

/// Metadata key holding the hex Ed25519 issuer seal.
pub const ISSUER_SIGNATURE_FIELD: &str = "issuerSignature";
/// Metadata key holding the hex public key of the sealing issuer.
pub const ISSUER_KEY_FIELD: &str = "issuerKey";

/// Evidence submitted for certification.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueRequest {
    pub camera_id: String,
    #[serde(default)]
    pub camera_location: String,
    /// Hex SHA-256 of the recording.
    pub video_hash: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, Value>,
}

impl IssueRequest {
    pub fn new(
        camera_id: impl Into<String>,
        camera_location: impl Into<String>,
        video_hash: impl Into<String>,
    ) -> Self {
        Self {
            camera_id: camera_id.into(),
            camera_location: camera_location.into(),
            video_hash: video_hash.into(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Reject input that must never reach the hash engine. The video hash
    /// is normalized to lowercase.
    fn validated(mut self) -> LedgerResult<Self> {
        if self.camera_id.trim().is_empty() {
            return Err(LedgerError::InvalidInput("camera id must not be empty".into()));
        }
        if !is_sha256_hex(&self.video_hash) {
            return Err(LedgerError::InvalidInput(format!(
                "video hash must be 64 hex characters, got {:?}",
                self.video_hash
            )));
        }
        if self.metadata.contains_key(ISSUER_SIGNATURE_FIELD)
            || self.metadata.contains_key(ISSUER_KEY_FIELD)
        {
            return Err(LedgerError::InvalidInput(
                "issuer seal fields are reserved".into(),
            ));
        }
        self.video_hash.make_ascii_lowercase();
        Ok(self)
    }
}

/// Issuance path: appends one block and one certificate per request.
///
/// The chain head is re-read from the store on every attempt. The only
/// concurrency control is the store's create-if-absent write on the block
/// number: a writer that loses the race re-reads the head and tries the
/// next number, up to `max_contention_retries` times.
pub struct ChainBuilder {
    store: SharedStore,
    config: LedgerConfig,
    backoff: Backoff,
    signer: Option<Arc<SigningKey>>,
    events: Arc<EventRouter>,
    generate_id: fn(&str, i64) -> String,
}

impl ChainBuilder {
    pub fn new(store: SharedStore, config: LedgerConfig) -> Self {
        let events = Arc::new(EventRouter::new(config.event_channel_capacity));
        Self {
            store,
            backoff: config.backoff(),
            config,
            signer: None,
            events,
            generate_id: certificate_id,
        }
    }

    /// Seal every issued certificate with this key.
    pub fn with_signer(mut self, signer: SigningKey) -> Self {
        self.signer = Some(Arc::new(signer));
        self
    }

    /// Publish issuance events through a shared router.
    pub fn with_events(mut self, events: Arc<EventRouter>) -> Self {
        self.events = events;
        self
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn is_sealing(&self) -> bool {
        self.signer.is_some()
    }

    /// Create the genesis block if it does not exist yet.
    ///
    /// Idempotent and safe to race: every initializer writes the same fixed
    /// genesis values and a lost claim is success.
    pub async fn ensure_genesis(&self) -> LedgerResult<Block> {
        if let Some(existing) = self.store.get_block(GENESIS_BLOCK_NUMBER).await? {
            if !existing.matches_genesis() {
                warn!(hash = %existing.hash, "stored genesis block differs from the fixed genesis values");
            }
            return Ok(existing);
        }

        let genesis = Block::genesis();
        match self.store.put_block_if_absent(&genesis).await {
            Ok(()) => {
                info!(hash = %genesis.hash, "genesis block created");
                self.events.route(&LedgerEvent::GenesisCreated {
                    hash: genesis.hash.clone(),
                });
                Ok(genesis)
            }
            Err(StoreError::AlreadyExists { .. }) => {
                debug!("genesis block created concurrently");
                Ok(genesis)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Issue a certificate for a recording.
    ///
    /// The certificate is written only after its block has been claimed, so
    /// a failed issuance never leaves a certificate pointing at a block
    /// that does not exist.
    pub async fn issue_certificate(&self, request: IssueRequest) -> LedgerResult<Certificate> {
        let request = request.validated()?;
        let issued_at = temporal::now_millis();
        let id = self.unused_certificate_id(&request.camera_id, issued_at).await?;
        let block = self.claim_next_block(&request.video_hash).await?;

        let mut metadata = request.metadata;
        if let Some(signer) = &self.signer {
            let seal = signer.seal(&id, &block.hash);
            metadata.insert(ISSUER_SIGNATURE_FIELD.into(), Value::from(seal.to_hex()));
            metadata.insert(
                ISSUER_KEY_FIELD.into(),
                Value::from(signer.verifying_key().to_hex()),
            );
        }

        let certificate = Certificate {
            id,
            camera_id: request.camera_id,
            camera_location: request.camera_location,
            issued_at,
            video_hash: request.video_hash,
            block_number: block.block_number,
            previous_block_hash: block.previous_hash.clone(),
            metadata,
            verified: true,
        };
        self.persist_certificate(&certificate).await?;

        info!(
            certificate = %certificate.id,
            camera = %certificate.camera_id,
            block = block.block_number,
            "certificate issued"
        );
        self.events.route(&LedgerEvent::CertificateIssued {
            certificate_id: certificate.id.clone(),
            camera_id: certificate.camera_id.clone(),
            block_number: block.block_number,
            block_hash: block.hash,
        });
        Ok(certificate)
    }

    async fn unused_certificate_id(&self, camera_id: &str, issued_at: i64) -> LedgerResult<String> {
        let attempts = self.config.certificate_id_attempts.max(1);
        for attempt in 1..=attempts {
            let id = (self.generate_id)(camera_id, issued_at);
            if !self.store.certificate_exists(&id).await? {
                return Ok(id);
            }
            warn!(id = %id, attempt, "certificate id already in use, regenerating");
        }
        Err(LedgerError::CertificateIdExhausted { attempts })
    }

    /// Claim the block after the current chain head for `payload_hash`.
    async fn claim_next_block(&self, payload_hash: &str) -> LedgerResult<Block> {
        let mut lost_races = 0u32;
        let mut outages = 0u32;

        loop {
            let head = self
                .store
                .latest_block()
                .await?
                .ok_or(LedgerError::GenesisMissing)?;
            if let Some(reason) = head_defect(&head) {
                error!(block = head.block_number, reason, "refusing to extend a corrupt chain head");
                return Err(LedgerError::CorruptChainHead {
                    block_number: head.block_number,
                    reason: reason.into(),
                });
            }
            let block_number = head
                .block_number
                .checked_add(1)
                .ok_or_else(|| LedgerError::Internal("block number space exhausted".into()))?;

            let timestamp = temporal::now_millis();
            let nonce = block_nonce();
            let candidate = Block {
                block_number,
                timestamp,
                payload_hash: payload_hash.to_string(),
                previous_hash: head.hash.clone(),
                hash: block_hash(block_number, timestamp, payload_hash, &head.hash, nonce),
                nonce,
            };

            match self.store.put_block_if_absent(&candidate).await {
                Ok(()) => {
                    debug!(block = block_number, lost_races, "block claimed");
                    return Ok(candidate);
                }
                Err(StoreError::AlreadyExists { .. }) => {
                    lost_races += 1;
                    if lost_races > self.config.max_contention_retries {
                        warn!(block = block_number, attempts = lost_races, "contention retry budget exhausted");
                        return Err(LedgerError::ContentionExceeded {
                            block_number,
                            attempts: lost_races,
                        });
                    }
                    debug!(block = block_number, attempt = lost_races, "block claimed by another writer, retrying");
                    tokio::time::sleep(self.backoff.delay_for_attempt(lost_races - 1)).await;
                }
                Err(e) if e.is_retryable() => {
                    outages += 1;
                    if outages > self.config.max_unavailable_retries {
                        return Err(e.into());
                    }
                    warn!(block = block_number, attempt = outages, error = %e, "block claim failed, retrying");
                    tokio::time::sleep(self.backoff.delay_for_attempt(outages - 1)).await;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Write the certificate on a detached task.
    ///
    /// Once the block is claimed the write must finish even if the caller
    /// drops the issuance future.
    async fn persist_certificate(&self, certificate: &Certificate) -> LedgerResult<()> {
        let store = Arc::clone(&self.store);
        let record = certificate.clone();
        let write = tokio::spawn(async move { store.put_certificate(&record).await });

        match write.await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                error!(
                    certificate = %certificate.id,
                    block = certificate.block_number,
                    error = %e,
                    "block claimed but certificate write failed"
                );
                Err(e.into())
            }
            Err(join) => Err(LedgerError::Internal(format!(
                "certificate write task failed: {join}"
            ))),
        }
    }
}

/// Why a chain head cannot be extended, if it cannot.
fn head_defect(head: &Block) -> Option<&'static str> {
    if head.is_genesis() {
        (!head.matches_genesis()).then_some("genesis block differs from the fixed genesis values")
    } else if !hashes_match(&recompute_block_hash(head), &head.hash) {
        Some("block content does not match its recorded hash")
    } else {
        None
    }
}

impl std::fmt::Debug for ChainBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainBuilder")
            .field("config", &self.config)
            .field("sealing", &self.is_sealing())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventFilter;
    use crate::test_support::ScriptedStore;
    use std::sync::atomic::Ordering;
    use std::time::Duration;
    use vcl_store::{InMemoryLedgerStore, LedgerStore};
    use vcl_types::{Document, GENESIS_HASH};

    fn fast_config() -> LedgerConfig {
        LedgerConfig {
            retry_initial_delay_ms: 1,
            retry_max_delay_ms: 5,
            ..LedgerConfig::default()
        }
    }

    fn request(camera: &str, seed: u8) -> IssueRequest {
        IssueRequest::new(camera, "Avenue Mohammed V", format!("{seed:02x}").repeat(32))
    }

    async fn initialized(store: SharedStore) -> ChainBuilder {
        let builder = ChainBuilder::new(store, fast_config());
        builder.ensure_genesis().await.unwrap();
        builder
    }

    #[tokio::test]
    async fn genesis_is_idempotent() {
        let store = Arc::new(InMemoryLedgerStore::new());
        let builder = ChainBuilder::new(store.clone(), fast_config());
        let first = builder.ensure_genesis().await.unwrap();
        let second = builder.ensure_genesis().await.unwrap();
        assert_eq!(first, Block::genesis());
        assert_eq!(first, second);
        assert_eq!(store.block_count(), 1);
    }

    #[tokio::test]
    async fn issuance_requires_genesis() {
        let builder = ChainBuilder::new(Arc::new(InMemoryLedgerStore::new()), fast_config());
        let err = builder.issue_certificate(request("CAM-1", 1)).await.unwrap_err();
        assert_eq!(err, LedgerError::GenesisMissing);
    }

    #[tokio::test]
    async fn first_certificate_links_to_genesis() {
        let store = Arc::new(InMemoryLedgerStore::new());
        let builder = initialized(store.clone()).await;
        let cert = builder
            .issue_certificate(request("CAM-1", 0xaa).with_metadata("duration", 30))
            .await
            .unwrap();

        assert_eq!(cert.block_number, 1);
        assert_eq!(cert.previous_block_hash, GENESIS_HASH);
        assert_eq!(cert.id.len(), vcl_crypto::CERTIFICATE_ID_LEN);
        assert!(cert.verified);
        assert_eq!(cert.metadata["duration"], 30);

        let block = store.get_block(1).await.unwrap().unwrap();
        assert_eq!(block.payload_hash, cert.video_hash);
        assert_eq!(recompute_block_hash(&block), block.hash);
        assert_eq!(store.get_certificate(&cert.id).await.unwrap(), Some(cert));
    }

    #[tokio::test]
    async fn sequential_issuance_is_dense_and_linked() {
        let store = Arc::new(InMemoryLedgerStore::new());
        let builder = initialized(store.clone()).await;
        for seed in 1..=5u8 {
            let cert = builder.issue_certificate(request("CAM-1", seed)).await.unwrap();
            assert_eq!(cert.block_number, u64::from(seed));
        }
        let blocks = store.all_blocks().await.unwrap();
        for pair in blocks.windows(2) {
            assert_eq!(pair[1].previous_hash, pair[0].hash);
        }
    }

    #[tokio::test]
    async fn invalid_requests_are_rejected_before_any_write() {
        let store = Arc::new(InMemoryLedgerStore::new());
        let builder = initialized(store.clone()).await;

        let err = builder.issue_certificate(request("  ", 1)).await.unwrap_err();
        assert!(matches!(err, LedgerError::InvalidInput(_)));

        let bad_hash = IssueRequest::new("CAM-1", "", "aa11");
        assert!(matches!(
            builder.issue_certificate(bad_hash).await,
            Err(LedgerError::InvalidInput(_))
        ));

        let spoofed = request("CAM-1", 1).with_metadata(ISSUER_SIGNATURE_FIELD, "00");
        assert!(matches!(
            builder.issue_certificate(spoofed).await,
            Err(LedgerError::InvalidInput(_))
        ));
        assert_eq!(store.block_count(), 1);
    }

    #[tokio::test]
    async fn uppercase_video_hash_is_normalized() {
        let builder = initialized(Arc::new(InMemoryLedgerStore::new())).await;
        let cert = builder
            .issue_certificate(IssueRequest::new("CAM-1", "", "AB".repeat(32)))
            .await
            .unwrap();
        assert_eq!(cert.video_hash, "ab".repeat(32));
    }

    #[tokio::test]
    async fn contention_budget_is_bounded() {
        let store = ScriptedStore::new();
        store.always_contended.store(true, Ordering::SeqCst);
        let builder = initialized(store.clone()).await;

        let err = builder.issue_certificate(request("CAM-1", 1)).await.unwrap_err();
        assert_eq!(
            err,
            LedgerError::ContentionExceeded {
                block_number: 1,
                attempts: 17
            }
        );
        assert_eq!(store.claim_attempts.load(Ordering::SeqCst), 17);
        assert_eq!(store.inner.certificate_count(), 0);
    }

    #[tokio::test]
    async fn transient_claim_failures_are_retried() {
        let store = ScriptedStore::new();
        store.failing_claims.store(2, Ordering::SeqCst);
        let builder = initialized(store.clone()).await;

        let cert = builder.issue_certificate(request("CAM-1", 1)).await.unwrap();
        assert_eq!(cert.block_number, 1);
        assert_eq!(store.claim_attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn persistent_outage_surfaces_unavailable() {
        let store = ScriptedStore::new();
        store.failing_claims.store(100, Ordering::SeqCst);
        let builder = initialized(store.clone()).await;

        let err = builder.issue_certificate(request("CAM-1", 1)).await.unwrap_err();
        assert!(matches!(
            err,
            LedgerError::StoreUnavailable {
                operation: "put_block_if_absent",
                ..
            }
        ));
        assert_eq!(store.claim_attempts.load(Ordering::SeqCst), 4);
        assert_eq!(store.inner.certificate_count(), 0);
    }

    #[tokio::test]
    async fn corrupt_head_is_not_extended() {
        let store = Arc::new(InMemoryLedgerStore::new());
        let builder = initialized(store.clone()).await;
        builder.issue_certificate(request("CAM-1", 1)).await.unwrap();
        builder.issue_certificate(request("CAM-1", 2)).await.unwrap();
        store.overwrite_block_document(2, Document::new());

        let err = builder.issue_certificate(request("CAM-1", 3)).await.unwrap_err();
        assert!(matches!(
            err,
            LedgerError::CorruptChainHead { block_number: 2, .. }
        ));
        assert_eq!(store.block_count(), 3);
        assert_eq!(store.certificate_count(), 2);
    }

    #[tokio::test]
    async fn edited_head_payload_is_not_extended() {
        let store = Arc::new(InMemoryLedgerStore::new());
        let builder = initialized(store.clone()).await;
        builder.issue_certificate(request("CAM-1", 1)).await.unwrap();
        let mut doc = store.block_document(1).unwrap();
        doc.insert("payloadHash".into(), Value::from("ee".repeat(32)));
        store.overwrite_block_document(1, doc);

        assert!(matches!(
            builder.issue_certificate(request("CAM-1", 2)).await,
            Err(LedgerError::CorruptChainHead { block_number: 1, .. })
        ));
    }

    #[tokio::test]
    async fn id_collisions_exhaust_attempts() {
        let store = Arc::new(InMemoryLedgerStore::new());
        let mut builder = initialized(store.clone()).await;
        builder.generate_id = |_, _| "00000000deadbeef".to_string();

        builder.issue_certificate(request("CAM-1", 1)).await.unwrap();
        let err = builder.issue_certificate(request("CAM-1", 2)).await.unwrap_err();
        assert_eq!(err, LedgerError::CertificateIdExhausted { attempts: 4 });
        assert_eq!(store.block_count(), 2);
    }

    #[tokio::test]
    async fn cancelled_issuance_still_writes_certificate() {
        let store = ScriptedStore::new();
        store.certificate_delay_ms.store(50, Ordering::SeqCst);
        let builder = initialized(store.clone()).await;

        let cancelled = tokio::time::timeout(
            Duration::from_millis(10),
            builder.issue_certificate(request("CAM-1", 1)),
        )
        .await;
        assert!(cancelled.is_err());

        tokio::time::sleep(Duration::from_millis(150)).await;
        let listed = store.inner.certificates_by_camera("CAM-1").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].block_number, 1);
    }

    #[tokio::test]
    async fn signer_seals_certificates() {
        let key = SigningKey::generate();
        let public = key.verifying_key();
        let store = Arc::new(InMemoryLedgerStore::new());
        let builder = initialized(store.clone()).await.with_signer(key);

        let cert = builder.issue_certificate(request("CAM-1", 1)).await.unwrap();
        let block = store.get_block(cert.block_number).await.unwrap().unwrap();
        let seal = vcl_crypto::Signature::from_hex(cert.metadata_str(ISSUER_SIGNATURE_FIELD).unwrap())
            .unwrap();
        assert_eq!(cert.metadata_str(ISSUER_KEY_FIELD), Some(public.to_hex().as_str()));
        assert!(public.verify_seal(&cert.id, &block.hash, &seal).is_ok());
    }

    #[tokio::test]
    async fn issuance_publishes_events() {
        let events = Arc::new(EventRouter::new(16));
        let mut rx = events.subscribe(EventFilter::default());
        let builder = ChainBuilder::new(Arc::new(InMemoryLedgerStore::new()), fast_config())
            .with_events(Arc::clone(&events));

        builder.ensure_genesis().await.unwrap();
        let cert = builder.issue_certificate(request("CAM-7", 3)).await.unwrap();

        assert_eq!(
            rx.recv().await.unwrap(),
            LedgerEvent::GenesisCreated {
                hash: GENESIS_HASH.to_string()
            }
        );
        match rx.recv().await.unwrap() {
            LedgerEvent::CertificateIssued {
                certificate_id,
                block_number,
                ..
            } => {
                assert_eq!(certificate_id, cert.id);
                assert_eq!(block_number, 1);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }
}
