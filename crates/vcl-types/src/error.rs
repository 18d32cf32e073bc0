use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("document is not a JSON object (found {0})")]
    NotAnObject(&'static str),

    #[error("serialization error: {0}")]
    Serialization(String),
}
