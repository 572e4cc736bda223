//! MockProvider: deterministic LLM responses for tests and offline use
//!
//! Each call to `complete_stream` pops the next scripted behavior; when the
//! script runs out the provider echoes the last user message.

use crate::provider::{LlmError, LlmProvider, LlmResult, LlmStream};
use crate::types::{LlmRequest, StreamDelta};
use serde_json::Value;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::Mutex;

/// Mock behavior configuration
#[derive(Clone, Debug)]
pub enum MockBehavior {
    /// Return a text-only response, streamed in small chunks
    Text(String),
    /// Return a tool_use call with given name and args
    ToolCall { name: String, args: Value },
    /// Return text followed by a tool call
    TextThenTool {
        text: String,
        tool_name: String,
        tool_args: Value,
    },
    /// Stream some text, then fail mid-stream
    FailAfter { text: String, error: String },
    /// Fail before any stream is produced
    RequestError(String),
    /// Echo the most recent user message
    Echo,
    /// Replay these deltas verbatim
    Deltas(Vec<StreamDelta>),
}

pub struct MockProvider {
    behaviors: Mutex<VecDeque<MockBehavior>>,
    default_behavior: MockBehavior,
    call_count: Mutex<usize>,
    requests: Mutex<Vec<LlmRequest>>,
    chunk_size: usize,
    chunk_delay: Option<Duration>,
}

impl Default for MockProvider {
    fn default() -> Self { Self::constant(MockBehavior::Echo) }
}

impl MockProvider {
    /// Create a mock that always returns the same behavior
    pub fn constant(behavior: MockBehavior) -> Self {
        Self {
            behaviors: Mutex::new(VecDeque::new()),
            default_behavior: behavior,
            call_count: Mutex::new(0),
            requests: Mutex::new(Vec::new()),
            chunk_size: 16,
            chunk_delay: None,
        }
    }

    /// Create a mock with a sequence of behaviors (consumed in order)
    pub fn sequence(behaviors: Vec<MockBehavior>) -> Self {
        Self {
            behaviors: Mutex::new(behaviors.into()),
            ..Self::constant(MockBehavior::Echo)
        }
    }

    /// Split text responses into chunks of `size` characters.
    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size.max(1);
        self
    }

    /// Sleep between streamed chunks, like a slow model.
    pub fn with_chunk_delay(mut self, delay: Duration) -> Self {
        self.chunk_delay = Some(delay);
        self
    }

    /// Get the number of calls made
    pub async fn call_count(&self) -> usize {
        *self.call_count.lock().await
    }

    /// Requests received so far, oldest first.
    pub async fn requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().await.clone()
    }

    async fn next_behavior(&self) -> MockBehavior {
        *self.call_count.lock().await += 1;
        self.behaviors
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| self.default_behavior.clone())
    }

    fn chunks(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        chars
            .chunks(self.chunk_size)
            .map(|c| c.iter().collect())
            .collect()
    }
}

#[async_trait::async_trait]
impl LlmProvider for MockProvider {
    fn name(&self) -> &str { "mock" }

    fn model(&self) -> &str { "mock" }

    async fn complete_stream(&self, request: LlmRequest) -> LlmResult<LlmStream> {
        let behavior = self.next_behavior().await;
        let last_user = request
            .messages
            .iter()
            .rev()
            .find(|m| m.role == "user")
            .map(|m| m.text())
            .unwrap_or_default();
        self.requests.lock().await.push(request);

        let (text, tool, error) = match behavior {
            MockBehavior::Text(text) => (text, None, None),
            MockBehavior::ToolCall { name, args } => (String::new(), Some((name, args)), None),
            MockBehavior::TextThenTool { text, tool_name, tool_args } => {
                (text, Some((tool_name, tool_args)), None)
            }
            MockBehavior::FailAfter { text, error } => (text, None, Some(error)),
            MockBehavior::RequestError(e) => return Err(LlmError::RequestFailed(e)),
            MockBehavior::Echo => (format!("You said: {}", last_user), None, None),
            MockBehavior::Deltas(deltas) => {
                return Ok(Box::pin(futures::stream::iter(deltas.into_iter().map(Ok))));
            }
        };
        let chunks = self.chunks(&text);
        let delay = self.chunk_delay;
        let call = *self.call_count.lock().await;

        Ok(Box::pin(async_stream::stream! {
            for chunk in chunks {
                if let Some(d) = delay {
                    tokio::time::sleep(d).await;
                }
                yield Ok(StreamDelta::Text(chunk));
            }
            if let Some(error) = error {
                yield Err(LlmError::StreamError(error));
                return;
            }
            let stop_reason = if let Some((name, args)) = tool {
                let id = format!("toolu_mock_{}", call);
                yield Ok(StreamDelta::ToolCallStart { id: id.clone(), name });
                yield Ok(StreamDelta::ToolCallDelta { id: id.clone(), arguments: args.to_string() });
                yield Ok(StreamDelta::ToolCallEnd { id });
                "tool_use"
            } else {
                "end_turn"
            };
            yield Ok(StreamDelta::Done { stop_reason: Some(stop_reason.to_string()), usage: None });
        }))
    }
}
