use thiserror::Error;

#[derive(Error, Debug)]
pub enum MinCutError {
    #[error("precondition failed: {0}")]
    Precondition(String),

    #[error("postcondition failed: {0}")]
    Postcondition(String),
}

pub type MinCutResult<T> = std::result::Result<T, MinCutError>;

impl From<MinCutError> for chunkedgraph_model::GraphError {
    fn from(err: MinCutError) -> Self {
        match err {
            MinCutError::Precondition(msg) => chunkedgraph_model::GraphError::PreconditionFailed(msg),
            MinCutError::Postcondition(msg) => chunkedgraph_model::GraphError::PostconditionFailed(msg),
        }
    }
}
