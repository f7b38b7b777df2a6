use chunkedgraph_ids::NodeId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HierarchyError {
    #[error("node {0} has no current parent")]
    NoParent(NodeId),

    #[error("root not reached for {0} within retry budget")]
    RootNotFound(NodeId),
}

pub type HierarchyResult<T> = std::result::Result<T, HierarchyError>;

impl From<HierarchyError> for chunkedgraph_model::GraphError {
    fn from(err: HierarchyError) -> Self {
        match err {
            HierarchyError::NoParent(_) => chunkedgraph_model::GraphError::NotFound(err.to_string()),
            HierarchyError::RootNotFound(_) => chunkedgraph_model::GraphError::NotFound(err.to_string()),
        }
    }
}
