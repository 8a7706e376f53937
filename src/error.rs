//! Error taxonomy for rerank calls

use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, RerankError>;

#[derive(Debug, Error)]
pub enum RerankError {
    /// Malformed request; rejected before any selection work
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The relevance source failed or returned unusable scores
    #[error("relevance scoring failed: {0}")]
    Relevance(String),

    #[error("failed to load relevance model: {0}")]
    ModelLoad(String),

    /// Selection could not run to completion (worker panicked or was cancelled)
    #[error("internal error: {0}")]
    Internal(String),

    #[error("rerank timed out after {0:?}")]
    Timeout(Duration),
}

impl RerankError {
    /// Client errors are the caller's fault and must not be retried as-is
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidInput(_))
    }
}
