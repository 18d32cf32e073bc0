use vcl_store::StoreError;

/// Errors produced by ledger operations.
///
/// Verification outcomes are not errors: `TAMPERED`, `CHAIN_BROKEN` and
/// `NOT_FOUND` come back as a `VerificationResult`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("store unavailable during {operation}: {reason}")]
    StoreUnavailable {
        operation: &'static str,
        reason: String,
    },

    #[error("could not claim block {block_number}: lost {attempts} races for the chain head")]
    ContentionExceeded { block_number: u64, attempts: u32 },

    #[error("genesis block missing; initialize the ledger first")]
    GenesisMissing,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("no unused certificate id after {attempts} attempts")]
    CertificateIdExhausted { attempts: u32 },

    /// The chain head fails its own hash check; new blocks are not linked to it.
    #[error("chain head block {block_number} is corrupt: {reason}")]
    CorruptChainHead { block_number: u64, reason: String },

    #[error("internal error: {0}")]
    Internal(String),
}

impl LedgerError {
    /// Transient failures worth retrying at a higher level.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::StoreUnavailable { .. } | Self::ContentionExceeded { .. }
        )
    }
}

impl From<StoreError> for LedgerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable { operation, reason } => {
                Self::StoreUnavailable { operation, reason }
            }
            StoreError::InvalidKey(key) => Self::InvalidInput(format!("invalid key: {key}")),
            // Contention is resolved inside the builder and never reaches here
            // through a normal path.
            StoreError::AlreadyExists { block_number } => {
                Self::Internal(format!("unexpected claim conflict on block {block_number}"))
            }
            StoreError::CertificateExists { id } => {
                Self::Internal(format!("certificate {id} was already written"))
            }
            StoreError::Serialization(reason) => Self::Internal(reason),
        }
    }
}

/// Result alias for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;
