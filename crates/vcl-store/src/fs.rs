use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use vcl_types::{encode_document, parse_document, Block, Certificate, Document};

use crate::codec::{block_from_document, certificate_from_document, sort_newest_first};
use crate::error::{StoreError, StoreResult};
use crate::traits::LedgerStore;

const BLOCKS_DIR: &str = "blocks";
const CERTIFICATES_DIR: &str = "certificates";

/// Filesystem ledger store: one pretty-printed JSON document per record.
///
/// Layout:
///
/// ```text
/// <root>/blocks/<block_number>.json
/// <root>/certificates/<certificate_id>.json
/// ```
///
/// Every write goes to a private temp file that is then hard-linked to the
/// final name. Linking fails if the name exists, which makes create-if-absent
/// atomic across processes sharing the directory, and a reader never sees a
/// half-written record.
#[derive(Clone, Debug)]
pub struct FsLedgerStore {
    root: PathBuf,
}

impl FsLedgerStore {
    /// Open (creating if needed) a store rooted at `root`.
    pub async fn open(root: impl Into<PathBuf>) -> StoreResult<Self> {
        let root = root.into();
        for dir in [BLOCKS_DIR, CERTIFICATES_DIR] {
            tokio::fs::create_dir_all(root.join(dir))
                .await
                .map_err(StoreError::io("open"))?;
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn block_path(&self, block_number: u64) -> PathBuf {
        self.root
            .join(BLOCKS_DIR)
            .join(format!("{}.json", Block::document_key(block_number)))
    }

    fn certificate_path(&self, id: &str) -> StoreResult<PathBuf> {
        let valid = !id.is_empty()
            && id
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
        if !valid {
            return Err(StoreError::InvalidKey(id.to_string()));
        }
        Ok(self.root.join(CERTIFICATES_DIR).join(format!("{id}.json")))
    }

    fn temp_path(&self, dir: &str, stem: &str) -> PathBuf {
        let salt: u64 = rand::random();
        self.root.join(dir).join(format!(".{stem}.{salt:016x}.tmp"))
    }

    async fn read_document(
        path: &Path,
        operation: &'static str,
    ) -> StoreResult<Option<Document>> {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::io(operation)(e)),
        };
        match parse_document(&bytes) {
            Ok(doc) => Ok(Some(doc)),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "unreadable document, decoding as empty");
                Ok(Some(Document::new()))
            }
        }
    }

    async fn write_temp(path: &Path, bytes: &[u8], operation: &'static str) -> StoreResult<()> {
        let mut file = tokio::fs::File::create(path)
            .await
            .map_err(StoreError::io(operation))?;
        file.write_all(bytes).await.map_err(StoreError::io(operation))?;
        file.sync_all().await.map_err(StoreError::io(operation))?;
        Ok(())
    }

    /// Publish `bytes` at `target` unless a record is already there.
    /// Returns `false` if the name was taken.
    async fn create_new(
        &self,
        dir: &str,
        stem: &str,
        target: &Path,
        bytes: &[u8],
        operation: &'static str,
    ) -> StoreResult<bool> {
        let temp = self.temp_path(dir, stem);
        Self::write_temp(&temp, bytes, operation).await?;
        let linked = tokio::fs::hard_link(&temp, target).await;
        if let Err(e) = tokio::fs::remove_file(&temp).await {
            warn!(path = %temp.display(), error = %e, "failed to remove temp file");
        }
        match linked {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(StoreError::io(operation)(e)),
        }
    }

    async fn read_certificate(
        &self,
        stem: &str,
        operation: &'static str,
    ) -> StoreResult<Option<Certificate>> {
        let path = self.root.join(CERTIFICATES_DIR).join(format!("{stem}.json"));
        let doc = Self::read_document(&path, operation).await?;
        Ok(doc.map(|d| certificate_from_document(stem, &d)))
    }

    /// Record stems in a directory, skipping temp files.
    async fn list_stems(&self, dir: &str, operation: &'static str) -> StoreResult<Vec<String>> {
        let mut entries = tokio::fs::read_dir(self.root.join(dir))
            .await
            .map_err(StoreError::io(operation))?;
        let mut stems = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(StoreError::io(operation))? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if name.starts_with('.') {
                continue;
            }
            if let Some(stem) = name.strip_suffix(".json") {
                stems.push(stem.to_string());
            }
        }
        Ok(stems)
    }

    async fn block_numbers(&self, operation: &'static str) -> StoreResult<Vec<u64>> {
        let mut numbers: Vec<u64> = self
            .list_stems(BLOCKS_DIR, operation)
            .await?
            .iter()
            .filter_map(|s| s.parse().ok())
            .collect();
        numbers.sort_unstable();
        Ok(numbers)
    }
}

#[async_trait]
impl LedgerStore for FsLedgerStore {
    async fn get_block(&self, block_number: u64) -> StoreResult<Option<Block>> {
        let doc = Self::read_document(&self.block_path(block_number), "get_block").await?;
        Ok(doc.map(|d| block_from_document(block_number, &d)))
    }

    async fn latest_block(&self) -> StoreResult<Option<Block>> {
        // A block listed a moment ago cannot disappear: the store is append-only.
        match self.block_numbers("latest_block").await?.last() {
            Some(n) => self.get_block(*n).await,
            None => Ok(None),
        }
    }

    async fn put_block_if_absent(&self, block: &Block) -> StoreResult<()> {
        const OP: &str = "put_block_if_absent";
        let bytes = encode_document(&block.to_document())
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        let target = self.block_path(block.block_number);

        if self
            .create_new(BLOCKS_DIR, &block.key(), &target, &bytes, OP)
            .await?
        {
            debug!(block = block.block_number, "block claimed");
            Ok(())
        } else {
            Err(StoreError::AlreadyExists {
                block_number: block.block_number,
            })
        }
    }

    async fn get_certificate(&self, id: &str) -> StoreResult<Option<Certificate>> {
        match self.certificate_path(id) {
            Ok(_) => self.read_certificate(id, "get_certificate").await,
            // No record can exist under a key the backend refuses to store.
            Err(StoreError::InvalidKey(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn put_certificate(&self, certificate: &Certificate) -> StoreResult<()> {
        const OP: &str = "put_certificate";
        let target = self.certificate_path(&certificate.id)?;
        let bytes = encode_document(&certificate.to_document())
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        if self
            .create_new(CERTIFICATES_DIR, &certificate.id, &target, &bytes, OP)
            .await?
        {
            Ok(())
        } else {
            Err(StoreError::CertificateExists {
                id: certificate.id.clone(),
            })
        }
    }

    async fn certificates_by_camera(&self, camera_id: &str) -> StoreResult<Vec<Certificate>> {
        let mut matches: Vec<Certificate> = self
            .all_certificates()
            .await?
            .into_iter()
            .filter(|c| c.camera_id == camera_id)
            .collect();
        sort_newest_first(&mut matches);
        Ok(matches)
    }

    async fn all_certificates(&self) -> StoreResult<Vec<Certificate>> {
        const OP: &str = "all_certificates";
        let mut certificates = Vec::new();
        for stem in self.list_stems(CERTIFICATES_DIR, OP).await? {
            if let Some(cert) = self.read_certificate(&stem, OP).await? {
                certificates.push(cert);
            }
        }
        Ok(certificates)
    }

    async fn all_blocks(&self) -> StoreResult<Vec<Block>> {
        let mut blocks = Vec::new();
        for n in self.block_numbers("all_blocks").await? {
            if let Some(block) = self.get_block(n).await? {
                blocks.push(block);
            }
        }
        Ok(blocks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::Arc;

    fn block(n: u64, nonce: u64) -> Block {
        Block {
            block_number: n,
            timestamp: 5_000 + n as i64,
            payload_hash: "ab".repeat(32),
            previous_hash: "cd".repeat(32),
            hash: format!("{n:064x}"),
            nonce,
        }
    }

    fn cert(id: &str, camera: &str, issued_at: i64) -> Certificate {
        Certificate {
            id: id.into(),
            camera_id: camera.into(),
            camera_location: "Parking Nord".into(),
            issued_at,
            video_hash: "ef".repeat(32),
            block_number: 1,
            previous_block_hash: "cd".repeat(32),
            metadata: BTreeMap::new(),
            verified: true,
        }
    }

    #[tokio::test]
    async fn blocks_persist_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = FsLedgerStore::open(dir.path()).await.unwrap();
            for n in 0..3 {
                store.put_block_if_absent(&block(n, n)).await.unwrap();
            }
        }
        let store = FsLedgerStore::open(dir.path()).await.unwrap();
        assert_eq!(store.latest_block().await.unwrap(), Some(block(2, 2)));
        assert_eq!(store.all_blocks().await.unwrap().len(), 3);
        assert!(dir.path().join("blocks").join("1.json").exists());
    }

    #[tokio::test]
    async fn second_claim_is_already_exists_and_keeps_first_content() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsLedgerStore::open(dir.path()).await.unwrap();
        store.put_block_if_absent(&block(4, 1)).await.unwrap();
        let err = store.put_block_if_absent(&block(4, 2)).await.unwrap_err();
        assert_eq!(err, StoreError::AlreadyExists { block_number: 4 });
        assert_eq!(store.get_block(4).await.unwrap().unwrap().nonce, 1);
    }

    #[tokio::test]
    async fn temp_files_are_cleaned_up_and_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsLedgerStore::open(dir.path()).await.unwrap();
        store.put_block_if_absent(&block(0, 0)).await.unwrap();
        let _ = store.put_block_if_absent(&block(0, 9)).await;
        let names: Vec<String> = std::fs::read_dir(dir.path().join("blocks"))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["0.json".to_string()]);
    }

    #[tokio::test]
    async fn certificates_filter_and_sort() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsLedgerStore::open(dir.path()).await.unwrap();
        store.put_certificate(&cert("aaaa", "CAM-1", 10)).await.unwrap();
        store.put_certificate(&cert("bbbb", "CAM-1", 30)).await.unwrap();
        store.put_certificate(&cert("cccc", "CAM-2", 20)).await.unwrap();

        let ids: Vec<String> = store
            .certificates_by_camera("CAM-1")
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(ids, vec!["bbbb", "aaaa"]);
        assert_eq!(
            store.get_certificate("cccc").await.unwrap(),
            Some(cert("cccc", "CAM-2", 20))
        );
    }

    #[tokio::test]
    async fn path_like_ids_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsLedgerStore::open(dir.path()).await.unwrap();
        let err = store
            .put_certificate(&cert("../escape", "CAM-1", 1))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidKey(_)));
        assert!(store.get_certificate("../escape").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn corrupt_file_degrades_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsLedgerStore::open(dir.path()).await.unwrap();
        std::fs::write(dir.path().join("blocks").join("3.json"), b"{truncated").unwrap();
        let block = store.get_block(3).await.unwrap().unwrap();
        assert_eq!(block.hash, "");
        assert_eq!(block.block_number, 3);
        assert_eq!(store.latest_block().await.unwrap().unwrap().block_number, 3);
    }

    #[tokio::test]
    async fn existing_certificate_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsLedgerStore::open(dir.path()).await.unwrap();
        store.put_certificate(&cert("aaaa", "CAM-1", 10)).await.unwrap();
        let err = store
            .put_certificate(&cert("aaaa", "CAM-2", 99))
            .await
            .unwrap_err();
        assert_eq!(err, StoreError::CertificateExists { id: "aaaa".into() });
        assert_eq!(
            store.get_certificate("aaaa").await.unwrap(),
            Some(cert("aaaa", "CAM-1", 10))
        );

        let names: Vec<String> = std::fs::read_dir(dir.path().join("certificates"))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["aaaa.json".to_string()]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_claims_have_one_winner() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FsLedgerStore::open(dir.path()).await.unwrap());
        let mut tasks = Vec::new();
        for i in 0..12 {
            let store = Arc::clone(&store);
            tasks.push(tokio::spawn(async move {
                store.put_block_if_absent(&block(1, i)).await.is_ok()
            }));
        }
        let mut winners = 0;
        for t in tasks {
            if t.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }
}
