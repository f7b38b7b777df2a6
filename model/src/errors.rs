use chunkedgraph_database::prelude::StoreError;
use chunkedgraph_ids::IdError;
use thiserror::Error;

/// Unified error surface for every chunkedgraph crate above `database`/`ids`,
/// collapsing the lower-level error enums into the seven categories named in
/// the system's error-handling contract.
#[derive(Error, Debug)]
pub enum GraphError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("precondition failed: {0}")]
    PreconditionFailed(String),

    #[error("postcondition failed: {0}")]
    PostconditionFailed(String),

    #[error("lock error: {0}")]
    Lock(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("value out of range: {0}")]
    OutOfRange(String),

    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
}

pub type GraphResult<T> = std::result::Result<T, GraphError>;

impl From<IdError> for GraphError {
    fn from(err: IdError) -> Self {
        match err {
            IdError::LayerOutOfRange { .. } | IdError::CoordinateOutOfRange { .. } | IdError::SegmentOutOfRange { .. } => {
                GraphError::OutOfRange(err.to_string())
            }
            IdError::InvalidLayer(..) => GraphError::BadRequest(err.to_string()),
            IdError::InvalidConfig(_) => GraphError::BadRequest(err.to_string()),
            IdError::SkipConnectionsUnsupported => GraphError::BadRequest(err.to_string()),
        }
    }
}

impl From<StoreError> for GraphError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::RowNotFound(_) => GraphError::NotFound(err.to_string()),
            StoreError::LockRenewalFailed(_) => GraphError::Lock(err.to_string()),
            StoreError::Unavailable(_) => GraphError::StoreUnavailable(err.to_string()),
            StoreError::Backend(_) | StoreError::Serialization(_) => GraphError::StoreUnavailable(err.to_string()),
        }
    }
}
