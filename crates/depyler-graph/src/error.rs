use thiserror::Error;

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("duplicate function address: {0}")]
    DuplicateAddress(String),
}
