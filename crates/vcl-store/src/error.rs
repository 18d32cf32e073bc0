/// Errors from ledger store operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// A conditional block write lost: the block number is already claimed.
    #[error("block {block_number} already exists")]
    AlreadyExists { block_number: u64 },

    /// A certificate with this id has already been written.
    #[error("certificate {id} already exists")]
    CertificateExists { id: String },

    /// I/O failure, timeout or other transient backend failure.
    #[error("store unavailable during {operation}: {reason}")]
    Unavailable {
        operation: &'static str,
        reason: String,
    },

    /// A record key cannot be represented by the backend.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// A record could not be encoded for writing.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl StoreError {
    pub fn unavailable(operation: &'static str, reason: impl Into<String>) -> Self {
        Self::Unavailable {
            operation,
            reason: reason.into(),
        }
    }

    /// Transient failures that a caller may retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }

    /// Adapter for `map_err` on I/O results.
    pub(crate) fn io(operation: &'static str) -> impl Fn(std::io::Error) -> Self {
        move |e| Self::unavailable(operation, e.to_string())
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
