use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use vcl_ledger::LedgerError;
use vcl_store::StoreError;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ServerError {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "RESOURCE_NOT_FOUND",
            Self::BadRequest(_) => "INVALID_REQUEST",
            Self::Ledger(e) => match e {
                LedgerError::StoreUnavailable { .. } => "STORE_UNAVAILABLE",
                LedgerError::ContentionExceeded { .. } => "CONTENTION_EXCEEDED",
                LedgerError::GenesisMissing => "LEDGER_NOT_INITIALIZED",
                LedgerError::InvalidInput(_) => "INVALID_REQUEST",
                LedgerError::CertificateIdExhausted { .. } => "CERTIFICATE_ID_EXHAUSTED",
                LedgerError::CorruptChainHead { .. } => "CHAIN_CORRUPTED",
                LedgerError::Internal(_) => "INTERNAL_ERROR",
            },
            Self::Store(e) if e.is_retryable() => "STORE_UNAVAILABLE",
            Self::Store(_) => "INTERNAL_ERROR",
            Self::Config(_) => "CONFIGURATION_ERROR",
            Self::Io(_) | Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Ledger(e) => match e {
                LedgerError::InvalidInput(_) => StatusCode::BAD_REQUEST,
                LedgerError::StoreUnavailable { .. }
                | LedgerError::ContentionExceeded { .. }
                | LedgerError::GenesisMissing => StatusCode::SERVICE_UNAVAILABLE,
                LedgerError::CertificateIdExhausted { .. }
                | LedgerError::CorruptChainHead { .. }
                | LedgerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Store(e) if e.is_retryable() => StatusCode::SERVICE_UNAVAILABLE,
            Self::Store(_) | Self::Config(_) | Self::Io(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!(code = self.code(), error = %self, "request failed");
        }
        let body = Json(json!({
            "error": {
                "code": self.code(),
                "message": self.to_string(),
            }
        }));
        (status, body).into_response()
    }
}

pub type ServerResult<T> = Result<T, ServerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ledger_errors_map_to_statuses() {
        let busy = ServerError::from(LedgerError::ContentionExceeded {
            block_number: 9,
            attempts: 17,
        });
        assert_eq!(busy.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(busy.code(), "CONTENTION_EXCEEDED");

        let bad = ServerError::from(LedgerError::InvalidInput("video hash".into()));
        assert_eq!(bad.status(), StatusCode::BAD_REQUEST);

        let down = ServerError::from(StoreError::unavailable("get_block", "timeout"));
        assert_eq!(down.status(), StatusCode::SERVICE_UNAVAILABLE);

        let corrupt = ServerError::from(LedgerError::CorruptChainHead {
            block_number: 3,
            reason: "hash mismatch".into(),
        });
        assert_eq!(corrupt.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(corrupt.code(), "CHAIN_CORRUPTED");
    }

    #[test]
    fn not_found_response() {
        let response = ServerError::NotFound("certificate abc".into()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
