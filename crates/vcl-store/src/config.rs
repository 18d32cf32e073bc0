use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::StoreResult;
use crate::fs::FsLedgerStore;
use crate::memory::InMemoryLedgerStore;
use crate::timeout::TimeoutStore;
use crate::traits::SharedStore;

/// Which backend holds the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StoreBackend {
    /// Process-local maps. Contents are lost on exit.
    Memory,
    /// One JSON document per record under `root`.
    Filesystem { root: PathBuf },
}

impl Default for StoreBackend {
    fn default() -> Self {
        Self::Memory
    }
}

/// Store configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// Deadline applied to every store call, in milliseconds.
    pub timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            timeout_ms: 5_000,
        }
    }
}

impl StoreConfig {
    pub fn filesystem(root: impl Into<PathBuf>) -> Self {
        Self {
            backend: StoreBackend::Filesystem { root: root.into() },
            ..Self::default()
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Open the configured backend, wrapped in a [`TimeoutStore`].
    pub async fn open(&self) -> StoreResult<SharedStore> {
        let store: SharedStore = match &self.backend {
            StoreBackend::Memory => {
                info!(timeout_ms = self.timeout_ms, "opening in-memory ledger store");
                Arc::new(TimeoutStore::new(InMemoryLedgerStore::new(), self.timeout()))
            }
            StoreBackend::Filesystem { root } => {
                info!(root = %root.display(), timeout_ms = self.timeout_ms, "opening filesystem ledger store");
                let fs = FsLedgerStore::open(root.clone()).await?;
                Arc::new(TimeoutStore::new(fs, self.timeout()))
            }
        };
        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vcl_types::Block;

    #[test]
    fn defaults_to_memory() {
        let config: StoreConfig = toml::from_str("").unwrap();
        assert_eq!(config, StoreConfig::default());
        assert_eq!(config.timeout(), Duration::from_secs(5));
    }

    #[test]
    fn parses_filesystem_backend() {
        let config: StoreConfig = toml::from_str(
            r#"
            timeout_ms = 750

            [backend]
            kind = "filesystem"
            root = "/var/lib/vcl"
            "#,
        )
        .unwrap();
        assert_eq!(config.timeout_ms, 750);
        assert_eq!(
            config.backend,
            StoreBackend::Filesystem {
                root: PathBuf::from("/var/lib/vcl")
            }
        );
    }

    #[tokio::test]
    async fn opens_filesystem_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = StoreConfig::filesystem(dir.path()).open().await.unwrap();
        store.put_block_if_absent(&Block::genesis()).await.unwrap();
        assert!(dir.path().join("blocks").join("0.json").exists());
    }
}
