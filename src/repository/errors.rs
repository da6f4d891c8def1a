use crate::domain::order::OrderError;

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Stored row is malformed: {0}")]
    MalformedRow(String),

    #[error("Stored order is invalid: {0}")]
    Corrupt(#[from] OrderError),
}

impl RepositoryError {
    pub(crate) fn unavailable(err: impl std::fmt::Display) -> Self {
        RepositoryError::Unavailable(err.to_string())
    }
}
