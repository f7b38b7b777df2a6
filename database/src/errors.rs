use crate::types::RowKey;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("row {0:?} not found")]
    RowNotFound(RowKey),

    #[error("backend error: {0}")]
    Backend(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] Box<bincode::ErrorKind>),

    #[error("lock renewal failed before bulk write block {0}")]
    LockRenewalFailed(usize),

    #[error("transient backend error after retries exhausted: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

pub trait StoreResultExtensions<T> {
    /// Converts `RowNotFound` into `None`, panics on any other error.
    fn unwrap_option(self) -> Option<T>;
}

impl<T> StoreResultExtensions<T> for StoreResult<T> {
    fn unwrap_option(self) -> Option<T> {
        match self {
            Ok(value) => Some(value),
            Err(StoreError::RowNotFound(_)) => None,
            Err(err) => panic!("unexpected store error: {err:?}"),
        }
    }
}

/// Transient backend failures `bulk_write` retries internally with exponential
/// back-off, bounded by the caller-supplied lock expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransientKind {
    Aborted,
    DeadlineExceeded,
    ServiceUnavailable,
}
