//! The agent capability consumed by the streaming aggregator.

use crate::conversation::Conversation;
use crate::error::AgentError;
use futures::Stream;
use parley_tools::ToolRegistry;
use std::pin::Pin;
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FragmentKind {
    /// Incremental reply text.
    Text,
    /// A tool by this name is about to run.
    ToolStarted(String),
    /// The named tool finished; `text` holds its output.
    ToolFinished(String),
    /// The complete reply. Supersedes accumulated text.
    Final,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Fragment {
    pub kind: FragmentKind,
    pub text: String,
}

impl Fragment {
    pub fn text(text: impl Into<String>) -> Self {
        Self { kind: FragmentKind::Text, text: text.into() }
    }

    pub fn tool_started(name: impl Into<String>) -> Self {
        Self { kind: FragmentKind::ToolStarted(name.into()), text: String::new() }
    }

    pub fn tool_finished(name: impl Into<String>, output: impl Into<String>) -> Self {
        Self { kind: FragmentKind::ToolFinished(name.into()), text: output.into() }
    }

    pub fn final_text(text: impl Into<String>) -> Self {
        Self { kind: FragmentKind::Final, text: text.into() }
    }
}

pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<Fragment, AgentError>> + Send>>;

/// Produces a reply to the conversation as a lazy fragment stream.
///
/// Nothing runs until the stream is polled, and dropping it abandons the
/// work. Failures arrive as an `Err` item.
pub trait AgentCapability: Send + Sync {
    /// Name shown in the prompt (usually the model).
    fn name(&self) -> &str;

    fn stream_respond(&self, conversation: &Conversation, tools: Arc<ToolRegistry>) -> FragmentStream;
}
