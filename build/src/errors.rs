use chunkedgraph_ids::IdError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("malformed raw record: {0}")]
    MalformedRecord(String),

    #[error("zstd decompression failed: {0}")]
    Decompress(String),

    #[error(transparent)]
    Id(#[from] IdError),

    #[error(transparent)]
    Hierarchy(#[from] chunkedgraph_hierarchy::HierarchyError),

    #[error("store error: {0}")]
    Store(String),
}

pub type BuildResult<T> = std::result::Result<T, BuildError>;

impl From<chunkedgraph_database::prelude::StoreError> for BuildError {
    fn from(err: chunkedgraph_database::prelude::StoreError) -> Self {
        BuildError::Store(err.to_string())
    }
}

impl From<chunkedgraph_model::GraphError> for BuildError {
    fn from(err: chunkedgraph_model::GraphError) -> Self {
        BuildError::Store(err.to_string())
    }
}

impl From<BuildError> for chunkedgraph_model::GraphError {
    fn from(err: BuildError) -> Self {
        use chunkedgraph_model::GraphError;
        match err {
            BuildError::MalformedRecord(msg) => GraphError::BadRequest(msg),
            BuildError::Decompress(msg) => GraphError::BadRequest(msg),
            BuildError::Id(err) => err.into(),
            BuildError::Hierarchy(err) => err.into(),
            BuildError::Store(msg) => GraphError::StoreUnavailable(msg),
        }
    }
}
