//! Store wrapper that scripts contention, outages and slow writes.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use vcl_store::{InMemoryLedgerStore, LedgerStore, StoreError, StoreResult};
use vcl_types::{Block, Certificate};

#[derive(Default)]
pub(crate) struct ScriptedStore {
    pub inner: Arc<InMemoryLedgerStore>,
    /// Every non-genesis claim loses.
    pub always_contended: AtomicBool,
    /// Number of upcoming claims that fail as unavailable.
    pub failing_claims: AtomicU32,
    pub claim_attempts: AtomicU32,
    pub certificate_delay_ms: AtomicU64,
    /// Certificate writes fail as unavailable; block claims still succeed.
    pub certificate_writes_offline: AtomicBool,
}

impl ScriptedStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl LedgerStore for ScriptedStore {
    async fn get_block(&self, block_number: u64) -> StoreResult<Option<Block>> {
        self.inner.get_block(block_number).await
    }

    async fn latest_block(&self) -> StoreResult<Option<Block>> {
        self.inner.latest_block().await
    }

    async fn put_block_if_absent(&self, block: &Block) -> StoreResult<()> {
        if block.block_number > 0 {
            self.claim_attempts.fetch_add(1, Ordering::SeqCst);
            if self.always_contended.load(Ordering::SeqCst) {
                return Err(StoreError::AlreadyExists {
                    block_number: block.block_number,
                });
            }
            let failing = self
                .failing_claims
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
            if failing.is_ok() {
                return Err(StoreError::unavailable("put_block_if_absent", "scripted outage"));
            }
        }
        self.inner.put_block_if_absent(block).await
    }

    async fn get_certificate(&self, id: &str) -> StoreResult<Option<Certificate>> {
        self.inner.get_certificate(id).await
    }

    async fn put_certificate(&self, certificate: &Certificate) -> StoreResult<()> {
        let delay = self.certificate_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.certificate_writes_offline.load(Ordering::SeqCst) {
            return Err(StoreError::unavailable("put_certificate", "scripted outage"));
        }
        self.inner.put_certificate(certificate).await
    }

    async fn certificates_by_camera(&self, camera_id: &str) -> StoreResult<Vec<Certificate>> {
        self.inner.certificates_by_camera(camera_id).await
    }

    async fn all_blocks(&self) -> StoreResult<Vec<Block>> {
        self.inner.all_blocks().await
    }

    async fn all_certificates(&self) -> StoreResult<Vec<Certificate>> {
        self.inner.all_certificates().await
    }
}
