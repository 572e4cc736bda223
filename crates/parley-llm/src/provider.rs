//! LLM Provider trait

use crate::types::{LlmRequest, StreamDelta};
use futures::Stream;
use std::pin::Pin;

/// Result type for LLM operations
pub type LlmResult<T> = Result<T, LlmError>;

/// LLM error types
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("request failed: {0}")]
    RequestFailed(String),

    #[error("authentication failed: {0}")]
    AuthFailed(String),

    #[error("rate limited: retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("stream error: {0}")]
    StreamError(String),

    #[error("network error: {0}")]
    NetworkError(#[from] reqwest::Error),
}

impl LlmError {
    /// Map a non-success HTTP status to the matching error.
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            401 | 403 => LlmError::AuthFailed(body),
            429 => LlmError::RateLimited { retry_after_ms: 60_000 },
            _ => LlmError::RequestFailed(format!("{}: {}", status, body)),
        }
    }
}

/// Stream type for LLM responses
pub type LlmStream = Pin<Box<dyn Stream<Item = LlmResult<StreamDelta>> + Send>>;

/// LLM Provider trait
///
/// Dropping the returned stream abandons the response; for HTTP providers
/// that closes the connection.
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Model this provider instance sends requests to.
    fn model(&self) -> &str;

    /// Stream a completion response.
    async fn complete_stream(&self, request: LlmRequest) -> LlmResult<LlmStream>;
}
