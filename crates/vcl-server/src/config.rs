use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use vcl_crypto::{SigningKey, VerifyingKey};
use vcl_ledger::LedgerConfig;
use vcl_store::{StoreBackend, StoreConfig};

use crate::error::{ServerError, ServerResult};

/// Environment variable overriding [`ServerConfig::bind_addr`].
pub const BIND_ADDR_ENV: &str = "VCL_BIND_ADDR";
/// Environment variable switching the store to a filesystem root.
pub const STORE_ROOT_ENV: &str = "VCL_STORE_ROOT";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub store: StoreConfig,
    pub ledger: LedgerConfig,
    /// Hex Ed25519 secret used to seal issued certificates.
    pub issuer_key_hex: Option<String>,
    /// Hex Ed25519 public key whose seal verification requires.
    pub trusted_issuer_hex: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, 8547)),
            store: StoreConfig::default(),
            ledger: LedgerConfig::default(),
            issuer_key_hex: None,
            trusted_issuer_hex: None,
        }
    }
}

impl ServerConfig {
    /// Load from a TOML file (defaults if it does not exist), then apply
    /// environment overrides.
    pub fn load(path: &Path) -> ServerResult<Self> {
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            Self::from_toml(&contents)?
        } else {
            Self::default()
        };
        config.apply_overrides(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    pub fn from_toml(contents: &str) -> ServerResult<Self> {
        toml::from_str(contents).map_err(|e| ServerError::Config(e.to_string()))
    }

    /// Apply overrides from a variable lookup.
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> ServerResult<()> {
        if let Some(addr) = lookup(BIND_ADDR_ENV) {
            self.bind_addr = addr
                .parse()
                .map_err(|e| ServerError::Config(format!("{BIND_ADDR_ENV}={addr}: {e}")))?;
        }
        if let Some(root) = lookup(STORE_ROOT_ENV) {
            self.store.backend = StoreBackend::Filesystem {
                root: PathBuf::from(root),
            };
        }
        Ok(())
    }

    pub fn signing_key(&self) -> ServerResult<Option<SigningKey>> {
        self.issuer_key_hex
            .as_deref()
            .map(|hex| {
                SigningKey::from_hex(hex)
                    .map_err(|e| ServerError::Config(format!("issuer_key_hex: {e}")))
            })
            .transpose()
    }

    pub fn trusted_issuer(&self) -> ServerResult<Option<VerifyingKey>> {
        self.trusted_issuer_hex
            .as_deref()
            .map(|hex| {
                VerifyingKey::from_hex(hex)
                    .map_err(|e| ServerError::Config(format!("trusted_issuer_hex: {e}")))
            })
            .transpose()
    }
}
