use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use super::types::ChatRequest;

/// Failure of one completion call.
#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("completion request failed: {0}")]
    Transport(String),

    #[error("completion request timed out after {0:?}")]
    Timeout(Duration),

    #[error("completion API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("completion API returned an empty message")]
    Empty,
}

impl CompletionError {
    /// Transient failures are worth retrying; client-side errors are not.
    pub fn is_transient(&self) -> bool {
        match self {
            CompletionError::Transport(_) | CompletionError::Timeout(_) => true,
            CompletionError::Empty => true,
            CompletionError::Api { status, .. } => *status == 429 || (500..=599).contains(status),
        }
    }
}

#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// return the provider name (e.g. "groq")
    fn name(&self) -> &str;

    /// check if the provider is healthy/reachable
    async fn health_check(&self) -> bool;

    /// chat completion (non-streaming); returns the assistant message text
    async fn complete(&self, request: ChatRequest) -> Result<String, CompletionError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(CompletionError::Transport("reset".into()).is_transient());
        assert!(CompletionError::Timeout(Duration::from_secs(1)).is_transient());
        assert!(CompletionError::Empty.is_transient());
        assert!(CompletionError::Api {
            status: 503,
            message: "overloaded".into()
        }
        .is_transient());
        assert!(CompletionError::Api {
            status: 429,
            message: "rate limited".into()
        }
        .is_transient());
        assert!(!CompletionError::Api {
            status: 401,
            message: "bad key".into()
        }
        .is_transient());
    }
}
