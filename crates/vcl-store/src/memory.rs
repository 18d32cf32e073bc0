use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;
use vcl_types::{Block, Certificate, Document};

use crate::codec::{block_from_document, certificate_from_document, sort_newest_first};
use crate::error::{StoreError, StoreResult};
use crate::traits::LedgerStore;

/// In-memory, map-based ledger store.
///
/// Intended for tests and embedding. Records are kept in their document
/// form behind a `RwLock`, so reads go through the same lenient decoding a
/// remote document store would. A configurable latency and an availability
/// switch let tests reproduce slow or failing backends.
pub struct InMemoryLedgerStore {
    inner: RwLock<MemoryState>,
    available: AtomicBool,
    latency_ms: AtomicU64,
}

#[derive(Default)]
struct MemoryState {
    blocks: BTreeMap<u64, Document>,
    certificates: HashMap<String, Document>,
}

impl InMemoryLedgerStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryState::default()),
            available: AtomicBool::new(true),
            latency_ms: AtomicU64::new(0),
        }
    }

    /// Make every subsequent operation fail with `Unavailable` (or succeed again).
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Delay every subsequent operation by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        self.latency_ms
            .store(latency.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn block_count(&self) -> usize {
        self.inner.read().map(|s| s.blocks.len()).unwrap_or(0)
    }

    pub fn certificate_count(&self) -> usize {
        self.inner.read().map(|s| s.certificates.len()).unwrap_or(0)
    }

    /// Raw stored document for a block.
    pub fn block_document(&self, block_number: u64) -> Option<Document> {
        self.inner
            .read()
            .ok()
            .and_then(|s| s.blocks.get(&block_number).cloned())
    }

    /// Replace a stored block document out-of-band, bypassing the append-only
    /// contract. Simulates direct edits to the backing database.
    pub fn overwrite_block_document(&self, block_number: u64, document: Document) {
        if let Ok(mut state) = self.inner.write() {
            state.blocks.insert(block_number, document);
        }
    }

    /// Delete a stored block out-of-band. Returns `true` if it existed.
    pub fn remove_block_document(&self, block_number: u64) -> bool {
        self.inner
            .write()
            .map(|mut s| s.blocks.remove(&block_number).is_some())
            .unwrap_or(false)
    }

    /// Raw stored document for a certificate.
    pub fn certificate_document(&self, id: &str) -> Option<Document> {
        self.inner
            .read()
            .ok()
            .and_then(|s| s.certificates.get(id).cloned())
    }

    /// Replace a stored certificate document out-of-band.
    pub fn overwrite_certificate_document(&self, id: &str, document: Document) {
        if let Ok(mut state) = self.inner.write() {
            state.certificates.insert(id.to_string(), document);
        }
    }

    async fn enter(&self, operation: &'static str) -> StoreResult<()> {
        let latency = self.latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }
        if !self.available.load(Ordering::SeqCst) {
            return Err(StoreError::unavailable(operation, "backend offline"));
        }
        Ok(())
    }

    fn read_state(&self, operation: &'static str) -> StoreResult<RwLockReadGuard<'_, MemoryState>> {
        self.inner
            .read()
            .map_err(|_| StoreError::unavailable(operation, "store read lock poisoned"))
    }

    fn write_state(
        &self,
        operation: &'static str,
    ) -> StoreResult<RwLockWriteGuard<'_, MemoryState>> {
        self.inner
            .write()
            .map_err(|_| StoreError::unavailable(operation, "store write lock poisoned"))
    }
}

impl Default for InMemoryLedgerStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn get_block(&self, block_number: u64) -> StoreResult<Option<Block>> {
        self.enter("get_block").await?;
        let state = self.read_state("get_block")?;
        Ok(state
            .blocks
            .get(&block_number)
            .map(|doc| block_from_document(block_number, doc)))
    }

    async fn latest_block(&self) -> StoreResult<Option<Block>> {
        self.enter("latest_block").await?;
        let state = self.read_state("latest_block")?;
        Ok(state
            .blocks
            .last_key_value()
            .map(|(n, doc)| block_from_document(*n, doc)))
    }

    async fn put_block_if_absent(&self, block: &Block) -> StoreResult<()> {
        self.enter("put_block_if_absent").await?;
        let mut state = self.write_state("put_block_if_absent")?;
        if state.blocks.contains_key(&block.block_number) {
            return Err(StoreError::AlreadyExists {
                block_number: block.block_number,
            });
        }
        state.blocks.insert(block.block_number, block.to_document());
        debug!(block = block.block_number, "block claimed");
        Ok(())
    }

    async fn get_certificate(&self, id: &str) -> StoreResult<Option<Certificate>> {
        self.enter("get_certificate").await?;
        let state = self.read_state("get_certificate")?;
        Ok(state
            .certificates
            .get(id)
            .map(|doc| certificate_from_document(id, doc)))
    }

    async fn put_certificate(&self, certificate: &Certificate) -> StoreResult<()> {
        self.enter("put_certificate").await?;
        let mut state = self.write_state("put_certificate")?;
        if state.certificates.contains_key(&certificate.id) {
            return Err(StoreError::CertificateExists {
                id: certificate.id.clone(),
            });
        }
        state
            .certificates
            .insert(certificate.id.clone(), certificate.to_document());
        Ok(())
    }

    async fn certificates_by_camera(&self, camera_id: &str) -> StoreResult<Vec<Certificate>> {
        self.enter("certificates_by_camera").await?;
        let state = self.read_state("certificates_by_camera")?;
        let mut matches: Vec<Certificate> = state
            .certificates
            .iter()
            .map(|(id, doc)| certificate_from_document(id, doc))
            .filter(|c| c.camera_id == camera_id)
            .collect();
        sort_newest_first(&mut matches);
        Ok(matches)
    }

    async fn all_certificates(&self) -> StoreResult<Vec<Certificate>> {
        self.enter("all_certificates").await?;
        let state = self.read_state("all_certificates")?;
        Ok(state
            .certificates
            .iter()
            .map(|(id, doc)| certificate_from_document(id, doc))
            .collect())
    }

    async fn all_blocks(&self) -> StoreResult<Vec<Block>> {
        self.enter("all_blocks").await?;
        let state = self.read_state("all_blocks")?;
        Ok(state
            .blocks
            .iter()
            .map(|(n, doc)| block_from_document(*n, doc))
            .collect())
    }
}

impl std::fmt::Debug for InMemoryLedgerStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryLedgerStore")
            .field("block_count", &self.block_count())
            .field("certificate_count", &self.certificate_count())
            .finish()
    }
}
