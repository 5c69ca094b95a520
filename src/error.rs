use thiserror::Error;

/// Errors surfaced by the store to its callers.
///
/// Encoding/decoding errors are passed through verbatim from the codec;
/// filesystem errors are collapsed into [`StoreError::NotFound`] or
/// [`StoreError::Io`] depending on whether the backend could distinguish
/// "missing" from a genuine I/O failure.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("path not found")]
    NotFound,

    #[error("failed to encode payload: {0}")]
    Encode(String),

    #[error("failed to decode payload: {0}")]
    Decode(String),

    #[error("filesystem backend error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store is shutting down")]
    Shutdown,
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound)
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
