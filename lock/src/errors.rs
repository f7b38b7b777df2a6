use chunkedgraph_database::prelude::StoreError;
use chunkedgraph_ids::NodeId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LockError {
    #[error("could not acquire lock on root {0}")]
    AcquireFailed(NodeId),

    #[error("could not acquire locks on all of {0:?} within max_tries")]
    AcquireManyFailed(Vec<NodeId>),

    #[error("lock renewal failed for root {0}")]
    RenewFailed(NodeId),

    #[error("root {0} is already held by an indefinite lock")]
    IndefiniteLockHeld(NodeId),

    #[error("store error during lock operation: {0}")]
    Store(#[from] StoreError),

    #[error("failed to encode lock value: {0}")]
    Encoding(String),
}

pub type LockResult<T> = std::result::Result<T, LockError>;

impl From<LockError> for chunkedgraph_model::GraphError {
    fn from(err: LockError) -> Self {
        chunkedgraph_model::GraphError::Lock(err.to_string())
    }
}
