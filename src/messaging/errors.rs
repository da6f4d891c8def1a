use crate::utils::IsTransient;

#[derive(Debug, Clone, thiserror::Error)]
pub enum QueueError {
    #[error("Queue transport error: {message}")]
    Transport { message: String, transient: bool },

    #[error("Queue send timed out after {0} ms")]
    Timeout(u64),

    #[error("Queue setup failed: {0}")]
    Setup(String),

    #[error("Message encoding failed: {0}")]
    Encoding(String),
}

impl IsTransient for QueueError {
    fn is_transient(&self) -> bool {
        match self {
            QueueError::Transport { transient, .. } => *transient,
            QueueError::Timeout(_) => true,
            QueueError::Setup(_) | QueueError::Encoding(_) => false,
        }
    }
}

/// The queue could not take the order event within the retry budget.
#[derive(Debug, Clone, thiserror::Error)]
#[error("Queue publish failed after {attempts} attempt(s): {source}")]
pub struct QueuePublishFailed {
    pub attempts: u32,
    #[source]
    pub source: QueueError,
}
