use crate::utils::CircuitBreakerError;

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Request to {url} failed: {message}")]
    Request { url: String, message: String },

    #[error("Request to {url} timed out")]
    Timeout { url: String },

    #[error("{url} responded with {status}: {body}")]
    Status { url: String, status: u16, body: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Circuit '{0}' is open")]
    CircuitOpen(String),
}

impl From<CircuitBreakerError<NotifyError>> for NotifyError {
    fn from(err: CircuitBreakerError<NotifyError>) -> Self {
        match err {
            CircuitBreakerError::Open(name) => NotifyError::CircuitOpen(name),
            CircuitBreakerError::Inner(inner) => inner,
        }
    }
}
