use std::sync::Arc;

use tracing::info;
use vcl_crypto::{SigningKey, VerifyingKey};
use vcl_store::{SharedStore, StoreConfig};
use vcl_types::{Block, Certificate, VerificationResult};

use crate::builder::{ChainBuilder, IssueRequest};
use crate::config::LedgerConfig;
use crate::error::LedgerResult;
use crate::events::{EventFilter, EventRouter, EventStream};
use crate::verifier::{ChainReport, Verifier};

/// Video certification ledger over one shared store.
///
/// Holds no chain state of its own. Any number of `Ledger` instances, in
/// one process or many, may share a store.
pub struct Ledger {
    store: SharedStore,
    builder: ChainBuilder,
    verifier: Verifier,
    events: Arc<EventRouter>,
}

impl Ledger {
    pub fn new(store: SharedStore, config: LedgerConfig) -> Self {
        let events = Arc::new(EventRouter::new(config.event_channel_capacity));
        let verifier =
            Verifier::new(Arc::clone(&store)).with_pending_window(config.pending_window());
        let builder =
            ChainBuilder::new(Arc::clone(&store), config).with_events(Arc::clone(&events));
        Self {
            store,
            builder,
            verifier,
            events,
        }
    }

    /// Open the configured store and make sure the genesis block exists.
    pub async fn open(store_config: &StoreConfig, config: LedgerConfig) -> LedgerResult<Self> {
        let store = store_config.open().await?;
        let ledger = Self::new(store, config);
        let genesis = ledger.initialize().await?;
        info!(genesis = %genesis.hash, "ledger ready");
        Ok(ledger)
    }

    /// Seal issued certificates with `signer`.
    pub fn with_signer(mut self, signer: SigningKey) -> Self {
        self.builder = self.builder.with_signer(signer);
        self
    }

    /// Require seals from `issuer` when verifying.
    pub fn with_trusted_issuer(mut self, issuer: VerifyingKey) -> Self {
        self.verifier = self.verifier.with_trusted_issuer(issuer);
        self
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    pub fn config(&self) -> &LedgerConfig {
        self.builder.config()
    }

    /// Idempotently create the genesis block.
    pub async fn initialize(&self) -> LedgerResult<Block> {
        self.builder.ensure_genesis().await
    }

    pub async fn issue(&self, request: IssueRequest) -> LedgerResult<Certificate> {
        self.builder.issue_certificate(request).await
    }

    pub async fn certificate(&self, id: &str) -> LedgerResult<Option<Certificate>> {
        Ok(self.store.get_certificate(id).await?)
    }

    pub async fn block(&self, block_number: u64) -> LedgerResult<Option<Block>> {
        Ok(self.store.get_block(block_number).await?)
    }

    pub async fn latest_block(&self) -> LedgerResult<Option<Block>> {
        Ok(self.store.latest_block().await?)
    }

    pub async fn verify_certificate(&self, id: &str) -> LedgerResult<VerificationResult> {
        self.verifier.verify_certificate(id).await
    }

    pub async fn verify_recording(
        &self,
        id: &str,
        presented_hash: &str,
    ) -> LedgerResult<VerificationResult> {
        self.verifier.verify_recording(id, presented_hash).await
    }

    pub async fn verify_chain(&self) -> LedgerResult<ChainReport> {
        self.verifier.verify_chain().await
    }

    /// Certificates for a camera, newest first.
    pub async fn certificates_by_camera(&self, camera_id: &str) -> LedgerResult<Vec<Certificate>> {
        Ok(self.store.certificates_by_camera(camera_id).await?)
    }

    pub async fn certificate_count(&self, camera_id: &str) -> LedgerResult<u64> {
        Ok(self.store.count_certificates_by_camera(camera_id).await?)
    }

    pub async fn last_certificate(&self, camera_id: &str) -> LedgerResult<Option<Certificate>> {
        Ok(self.store.latest_certificate_by_camera(camera_id).await?)
    }

    /// Receive events for certificates issued through this instance.
    pub fn subscribe(&self, filter: EventFilter) -> EventStream {
        self.events.subscribe(filter)
    }
}

impl std::fmt::Debug for Ledger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ledger")
            .field("builder", &self.builder)
            .field("verifier", &self.verifier)
            .field("events", &self.events)
            .finish()
    }
}
