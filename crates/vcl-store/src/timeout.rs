use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;
use vcl_types::{Block, Certificate};

use crate::error::{StoreError, StoreResult};
use crate::traits::LedgerStore;

/// Decorator that bounds every store call by a deadline.
///
/// An expired call surfaces as [`StoreError::Unavailable`], the same as any
/// other transient backend failure. The inner future is dropped on expiry,
/// so a conditional block write that had not yet reached the backend
/// simply never happens.
#[derive(Debug)]
pub struct TimeoutStore<S> {
    inner: S,
    limit: Duration,
}

impl<S: LedgerStore> TimeoutStore<S> {
    pub fn new(inner: S, limit: Duration) -> Self {
        Self { inner, limit }
    }

    pub fn limit(&self) -> Duration {
        self.limit
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    async fn bounded<T>(
        &self,
        operation: &'static str,
        call: impl Future<Output = StoreResult<T>> + Send,
    ) -> StoreResult<T> {
        match tokio::time::timeout(self.limit, call).await {
            Ok(result) => result,
            Err(_) => {
                let limit_ms = self.limit.as_millis();
                warn!(operation, limit_ms, "store call timed out");
                Err(StoreError::unavailable(
                    operation,
                    format!("timed out after {limit_ms}ms"),
                ))
            }
        }
    }
}

#[async_trait]
impl<S: LedgerStore> LedgerStore for TimeoutStore<S> {
    async fn get_block(&self, block_number: u64) -> StoreResult<Option<Block>> {
        self.bounded("get_block", self.inner.get_block(block_number))
            .await
    }

    async fn latest_block(&self) -> StoreResult<Option<Block>> {
        self.bounded("latest_block", self.inner.latest_block()).await
    }

    async fn put_block_if_absent(&self, block: &Block) -> StoreResult<()> {
        self.bounded("put_block_if_absent", self.inner.put_block_if_absent(block))
            .await
    }

    async fn get_certificate(&self, id: &str) -> StoreResult<Option<Certificate>> {
        self.bounded("get_certificate", self.inner.get_certificate(id))
            .await
    }

    async fn put_certificate(&self, certificate: &Certificate) -> StoreResult<()> {
        self.bounded("put_certificate", self.inner.put_certificate(certificate))
            .await
    }

    async fn certificates_by_camera(&self, camera_id: &str) -> StoreResult<Vec<Certificate>> {
        self.bounded(
            "certificates_by_camera",
            self.inner.certificates_by_camera(camera_id),
        )
        .await
    }

    async fn all_blocks(&self) -> StoreResult<Vec<Block>> {
        self.bounded("all_blocks", self.inner.all_blocks()).await
    }

    async fn all_certificates(&self) -> StoreResult<Vec<Certificate>> {
        self.bounded("all_certificates", self.inner.all_certificates())
            .await
    }

    async fn count_certificates_by_camera(&self, camera_id: &str) -> StoreResult<u64> {
        self.bounded(
            "count_certificates_by_camera",
            self.inner.count_certificates_by_camera(camera_id),
        )
        .await
    }

    async fn latest_certificate_by_camera(&self, camera_id: &str) -> StoreResult<Option<Certificate>> {
        self.bounded(
            "latest_certificate_by_camera",
            self.inner.latest_certificate_by_camera(camera_id),
        )
        .await
    }
}
