//! LLM-backed agent capability: the tool-calling loop.
//!
//! Each iteration streams one completion. Text deltas pass straight through
//! as fragments; requested tools run on the blocking pool through the shared
//! registry and their results go back to the model. The loop ends when the
//! model answers without tools.

use crate::capability::{AgentCapability, Fragment, FragmentStream};
use crate::conversation::Conversation;
use crate::error::AgentError;
use futures::StreamExt;
use parley_llm::{
    AccumulatedToolCall, ContentBlock, LlmContent, LlmMessage, LlmProvider, LlmRequest, StreamDelta,
};
use parley_tools::{ToolRegistry, ToolResult};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

pub struct LlmAgentConfig {
    pub max_tool_iterations: usize,
    pub max_tokens: u32,
}

impl Default for LlmAgentConfig {
    fn default() -> Self {
        Self { max_tool_iterations: 8, max_tokens: 4096 }
    }
}

pub struct LlmAgent {
    provider: Arc<dyn LlmProvider>,
    config: LlmAgentConfig,
}

impl LlmAgent {
    pub fn new(provider: Arc<dyn LlmProvider>, config: LlmAgentConfig) -> Self {
        Self { provider, config }
    }
}

impl AgentCapability for LlmAgent {
    fn name(&self) -> &str { self.provider.model() }

    fn stream_respond(&self, conversation: &Conversation, tools: Arc<ToolRegistry>) -> FragmentStream {
        let provider = self.provider.clone();
        let mut messages = conversation.messages();
        let system = conversation.system_prompt().map(str::to_string);
        let max_iterations = self.config.max_tool_iterations;
        let max_tokens = self.config.max_tokens;

        Box::pin(async_stream::stream! {
            let definitions = tools.get_definitions();
            let mut iterations = 0;

            loop {
                iterations += 1;
                if iterations > max_iterations {
                    yield Err(AgentError::ToolLoopExceeded(max_iterations));
                    return;
                }

                let request = LlmRequest {
                    messages: messages.clone(),
                    tools: Some(definitions.clone()),
                    max_tokens: Some(max_tokens),
                    system: system.clone(),
                    ..Default::default()
                };

                let mut stream = match provider.complete_stream(request).await {
                    Ok(s) => s,
                    Err(e) => {
                        yield Err(AgentError::from(e));
                        return;
                    }
                };

                let mut text_content = String::new();
                let mut tool_calls: Vec<AccumulatedToolCall> = Vec::new();
                // Calls still receiving arguments, in announcement order.
                let mut open_calls: Vec<AccumulatedToolCall> = Vec::new();

                while let Some(delta) = stream.next().await {
                    match delta {
                        Ok(StreamDelta::Text(text)) => {
                            text_content.push_str(&text);
                            yield Ok(Fragment::text(text));
                        }
                        Ok(StreamDelta::Thinking(_)) => {}
                        Ok(StreamDelta::ToolCallStart { id, name }) => {
                            open_calls.push(AccumulatedToolCall { id, name, arguments: String::new() });
                        }
                        Ok(StreamDelta::ToolCallDelta { id, arguments }) => {
                            match open_calls.iter_mut().find(|c| c.id == id) {
                                Some(call) => call.arguments.push_str(&arguments),
                                None => debug!("Arguments for unknown tool call {}", id),
                            }
                        }
                        Ok(StreamDelta::ToolCallEnd { id }) => {
                            if let Some(pos) = open_calls.iter().position(|c| c.id == id) {
                                tool_calls.push(open_calls.remove(pos));
                            }
                        }
                        Ok(StreamDelta::Done { stop_reason, .. }) => {
                            debug!("Completion done: stop_reason={:?}", stop_reason);
                        }
                        Ok(StreamDelta::Error(e)) => {
                            yield Err(AgentError::Stream(e));
                            return;
                        }
                        Err(e) => {
                            yield Err(AgentError::from(e));
                            return;
                        }
                    }
                }

                if tool_calls.is_empty() {
                    info!("Agent reply complete after {} iteration(s)", iterations);
                    yield Ok(Fragment::final_text(text_content));
                    return;
                }

                let mut blocks = Vec::new();
                if !text_content.is_empty() {
                    blocks.push(ContentBlock::Text { text: text_content });
                }
                for tc in &tool_calls {
                    blocks.push(ContentBlock::ToolUse {
                        id: tc.id.clone(),
                        name: tc.name.clone(),
                        input: tc.parse_arguments().unwrap_or_default(),
                    });
                }
                messages.push(LlmMessage { role: "assistant".into(), content: LlmContent::Blocks(blocks) });

                let mut results = Vec::new();
                for tc in tool_calls {
                    yield Ok(Fragment::tool_started(tc.name.clone()));
                    let input = tool_input(&tc.parse_arguments().unwrap_or_default());
                    let registry = tools.clone();
                    let name = tc.name.clone();
                    let result = tokio::task::spawn_blocking(move || registry.execute(&name, &input))
                        .await
                        .unwrap_or_else(|e| ToolResult::Failed { name: tc.name.clone(), cause: e.to_string() });

                    let content = result.to_content_string();
                    yield Ok(Fragment::tool_finished(tc.name.clone(), content.clone()));
                    results.push(ContentBlock::ToolResult {
                        tool_use_id: tc.id,
                        content,
                        is_error: result.is_error().then_some(true),
                    });
                }
                messages.push(LlmMessage { role: "user".into(), content: LlmContent::Blocks(results) });

                debug!("Tool calls executed, continuing loop (iteration {})", iterations);
            }
        })
    }
}

/// Tool input from the model's arguments: the `input` string when present,
/// otherwise the raw JSON.
fn tool_input(args: &Value) -> String {
    match args.get("input") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) => String::new(),
        Some(other) => other.to_string(),
        None => match args {
            Value::Object(map) if map.is_empty() => String::new(),
            Value::Null => String::new(),
            other => other.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn tool_input_extraction() {
        assert_eq!(tool_input(&json!({"input": "notes.txt"})), "notes.txt");
        assert_eq!(tool_input(&json!({})), "");
        assert_eq!(tool_input(&json!({"input": null})), "");
        assert_eq!(tool_input(&json!({"input": 5})), "5");
        assert_eq!(tool_input(&json!({"path": "a"})), r#"{"path":"a"}"#);
    }
}
