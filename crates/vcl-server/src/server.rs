use tokio::net::TcpListener;
use tracing::info;
use vcl_ledger::Ledger;

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::handler::AppState;
use crate::router::build_router;

/// VCL HTTP server.
pub struct VclServer {
    config: ServerConfig,
}

impl VclServer {
    pub fn new(config: ServerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Open the configured store, ensure genesis, and attach issuer keys.
    pub async fn open_ledger(&self) -> ServerResult<Ledger> {
        let mut ledger = Ledger::open(&self.config.store, self.config.ledger.clone()).await?;
        if let Some(signer) = self.config.signing_key()? {
            info!(issuer = %signer.verifying_key().to_hex(), "sealing issued certificates");
            ledger = ledger.with_signer(signer);
        }
        if let Some(issuer) = self.config.trusted_issuer()? {
            info!(issuer = %issuer.to_hex(), "requiring issuer seals");
            ledger = ledger.with_trusted_issuer(issuer);
        }
        Ok(ledger)
    }

    /// Build the router over a freshly opened ledger (useful for testing).
    pub async fn router(&self) -> ServerResult<axum::Router> {
        Ok(build_router(AppState::new(self.open_ledger().await?)))
    }

    /// Start serving requests until Ctrl-C.
    pub async fn serve(self) -> ServerResult<()> {
        let app = self.router().await?;
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        info!("VCL server listening on {}", self.config.bind_addr);
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("shutdown requested");
                }
            })
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))
    }
}
