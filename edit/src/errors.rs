use chunkedgraph_lock::LockError;
use chunkedgraph_mincut::MinCutError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EditError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("precondition failed: {0}")]
    Precondition(String),

    #[error("postcondition failed: {0}")]
    Postcondition(String),

    #[error("no log row found for operation {0}")]
    LogNotFound(u64),

    #[error(transparent)]
    Lock(#[from] LockError),

    #[error(transparent)]
    MinCut(#[from] MinCutError),

    #[error("hierarchy error: {0}")]
    Hierarchy(String),

    #[error("store error: {0}")]
    Store(String),
}

pub type EditResult<T> = std::result::Result<T, EditError>;

impl From<chunkedgraph_hierarchy::HierarchyError> for EditError {
    fn from(err: chunkedgraph_hierarchy::HierarchyError) -> Self {
        EditError::Hierarchy(err.to_string())
    }
}

impl From<chunkedgraph_database::prelude::StoreError> for EditError {
    fn from(err: chunkedgraph_database::prelude::StoreError) -> Self {
        EditError::Store(err.to_string())
    }
}

impl From<chunkedgraph_ids::IdError> for EditError {
    fn from(err: chunkedgraph_ids::IdError) -> Self {
        EditError::BadRequest(err.to_string())
    }
}

impl From<chunkedgraph_model::GraphError> for EditError {
    fn from(err: chunkedgraph_model::GraphError) -> Self {
        EditError::Store(err.to_string())
    }
}

impl From<EditError> for chunkedgraph_model::GraphError {
    fn from(err: EditError) -> Self {
        use chunkedgraph_model::GraphError;
        match err {
            EditError::BadRequest(msg) => GraphError::BadRequest(msg),
            EditError::Precondition(msg) => GraphError::PreconditionFailed(msg),
            EditError::Postcondition(msg) => GraphError::PostconditionFailed(msg),
            EditError::LogNotFound(op) => GraphError::NotFound(format!("log row for operation {op}")),
            EditError::Lock(err) => err.into(),
            EditError::MinCut(err) => err.into(),
            EditError::Hierarchy(msg) => GraphError::BadRequest(msg),
            EditError::Store(msg) => GraphError::StoreUnavailable(msg),
        }
    }
}

/// Precondition (§4.7 step 1): merge endpoints must lie within Chebyshev
/// distance 3 of each other in chunk-space, or the request is malformed.
pub fn check_merge_distance(a_chunk: [u64; 3], b_chunk: [u64; 3]) -> EditResult<()> {
    let dist = a_chunk
        .iter()
        .zip(b_chunk.iter())
        .map(|(&x, &y)| (x as i64 - y as i64).unsigned_abs())
        .max()
        .unwrap_or(0);
    if dist > 3 {
        return Err(EditError::BadRequest(format!("merge endpoints {dist} chunks apart, exceeds Chebyshev distance 3")));
    }
    Ok(())
}
