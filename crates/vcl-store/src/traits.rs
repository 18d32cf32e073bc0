use std::sync::Arc;

use async_trait::async_trait;
use vcl_types::{Block, Certificate};

use crate::error::StoreResult;

/// Append-only persistence for blocks and certificates.
///
/// All implementations must satisfy these invariants:
/// - Blocks are addressed by block number, certificates by id.
/// - `put_block_if_absent` is atomic: of any number of concurrent writers
///   for one block number, exactly one succeeds and every other receives
///   [`StoreError::AlreadyExists`](crate::StoreError::AlreadyExists).
///   Certificate writes are create-if-absent on the id in the same way.
/// - Absence is `Ok(None)`; backend failures are
///   [`StoreError::Unavailable`](crate::StoreError::Unavailable).
/// - Nothing is updated or deleted once written.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Point lookup of a block.
    async fn get_block(&self, block_number: u64) -> StoreResult<Option<Block>>;

    /// Block with the highest block number, if any.
    async fn latest_block(&self) -> StoreResult<Option<Block>>;

    /// Create-if-absent keyed on `block.block_number`.
    async fn put_block_if_absent(&self, block: &Block) -> StoreResult<()>;

    /// Point lookup of a certificate.
    async fn get_certificate(&self, id: &str) -> StoreResult<Option<Certificate>>;

    /// Create-if-absent keyed on `certificate.id`. An existing certificate
    /// is never replaced; the write fails with
    /// [`StoreError::CertificateExists`](crate::StoreError::CertificateExists).
    async fn put_certificate(&self, certificate: &Certificate) -> StoreResult<()>;

    /// Certificates for one camera, newest `issued_at` first.
    async fn certificates_by_camera(&self, camera_id: &str) -> StoreResult<Vec<Certificate>>;

    /// Every block, ascending by block number.
    async fn all_blocks(&self) -> StoreResult<Vec<Block>>;

    /// Every certificate, in no particular order.
    async fn all_certificates(&self) -> StoreResult<Vec<Certificate>>;

    async fn block_exists(&self, block_number: u64) -> StoreResult<bool> {
        Ok(self.get_block(block_number).await?.is_some())
    }

    async fn certificate_exists(&self, id: &str) -> StoreResult<bool> {
        Ok(self.get_certificate(id).await?.is_some())
    }

    /// Number of certificates issued for a camera.
    ///
    /// Default implementation lists them. Backends with a native count
    /// query may override.
    async fn count_certificates_by_camera(&self, camera_id: &str) -> StoreResult<u64> {
        Ok(self.certificates_by_camera(camera_id).await?.len() as u64)
    }

    /// Most recently issued certificate for a camera.
    async fn latest_certificate_by_camera(&self, camera_id: &str) -> StoreResult<Option<Certificate>> {
        Ok(self.certificates_by_camera(camera_id).await?.into_iter().next())
    }
}

/// Shared, type-erased store handle.
pub type SharedStore = Arc<dyn LedgerStore>;

#[async_trait]
impl<S: LedgerStore + ?Sized> LedgerStore for Arc<S> {
    async fn get_block(&self, block_number: u64) -> StoreResult<Option<Block>> {
        (**self).get_block(block_number).await
    }

    async fn latest_block(&self) -> StoreResult<Option<Block>> {
        (**self).latest_block().await
    }

    async fn put_block_if_absent(&self, block: &Block) -> StoreResult<()> {
        (**self).put_block_if_absent(block).await
    }

    async fn get_certificate(&self, id: &str) -> StoreResult<Option<Certificate>> {
        (**self).get_certificate(id).await
    }

    async fn put_certificate(&self, certificate: &Certificate) -> StoreResult<()> {
        (**self).put_certificate(certificate).await
    }

    async fn certificates_by_camera(&self, camera_id: &str) -> StoreResult<Vec<Certificate>> {
        (**self).certificates_by_camera(camera_id).await
    }

    async fn all_blocks(&self) -> StoreResult<Vec<Block>> {
        (**self).all_blocks().await
    }

    async fn all_certificates(&self) -> StoreResult<Vec<Certificate>> {
        (**self).all_certificates().await
    }

    async fn block_exists(&self, block_number: u64) -> StoreResult<bool> {
        (**self).block_exists(block_number).await
    }

    async fn certificate_exists(&self, id: &str) -> StoreResult<bool> {
        (**self).certificate_exists(id).await
    }

    async fn count_certificates_by_camera(&self, camera_id: &str) -> StoreResult<u64> {
        (**self).count_certificates_by_camera(camera_id).await
    }

    async fn latest_certificate_by_camera(&self, camera_id: &str) -> StoreResult<Option<Certificate>> {
        (**self).latest_certificate_by_camera(camera_id).await
    }
}
