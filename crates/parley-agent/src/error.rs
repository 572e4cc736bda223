//! Agent-level errors

use parley_llm::LlmError;

#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error(transparent)]
    Provider(#[from] LlmError),

    #[error("stream error: {0}")]
    Stream(String),

    #[error("exceeded {0} tool iterations without a final answer")]
    ToolLoopExceeded(usize),

    #[error("terminal error: {0}")]
    Io(#[from] std::io::Error),
}

pub type AgentResult<T> = Result<T, AgentError>;
