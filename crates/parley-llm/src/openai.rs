//! OpenAI-compatible Chat Completions provider (OpenAI, OpenRouter, Groq, Ollama)

use crate::provider::{LlmError, LlmProvider, LlmResult, LlmStream};
use crate::sse::{sse_events, SseEvent};
use crate::types::{ContentBlock, LlmContent, LlmMessage, LlmRequest, StreamDelta, Usage};
use futures::{Stream, StreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, error};

const CHAT_COMPLETIONS_PATH: &str = "/chat/completions";

pub struct OpenAiCompatProvider {
    client: Client,
    name: String,
    api_key: Option<String>,
    base_url: String,
    model: String,
}

impl OpenAiCompatProvider {
    /// `base_url` is the API root, e.g. `https://api.openai.com/v1`.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            name: name.into(),
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}{}", self.base_url, CHAT_COMPLETIONS_PATH)
    }
}

#[async_trait::async_trait]
impl LlmProvider for OpenAiCompatProvider {
    fn name(&self) -> &str { &self.name }

    fn model(&self) -> &str { &self.model }

    async fn complete_stream(&self, request: LlmRequest) -> LlmResult<LlmStream> {
        let model = if request.model.is_empty() { self.model.clone() } else { request.model.clone() };
        let body = ChatCompletionRequest {
            model,
            stream: true,
            messages: to_chat_messages(request.system.as_deref(), &request.messages),
            tools: request.tools.as_ref().filter(|t| !t.is_empty()).map(|tools| {
                tools.iter().map(|t| ChatToolDefinition {
                    tool_type: "function",
                    function: ChatToolFunction {
                        name: t.name.clone(),
                        description: t.description.clone(),
                        parameters: t.input_schema.clone(),
                    },
                }).collect()
            }),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        debug!("{} request: model={} messages={}", self.name, body.model, body.messages.len());

        let mut builder = self.client
            .post(self.endpoint())
            .header("accept", "text/event-stream")
            .json(&body);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }
        let response = builder.send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("{} error {}: {}", self.name, status, error_text);
            return Err(LlmError::from_status(status.as_u16(), error_text));
        }

        Ok(Box::pin(parse_chunk_stream(sse_events(response.bytes_stream()))))
    }
}

/// Flatten our Anthropic-shaped history into chat-completions messages.
fn to_chat_messages(system: Option<&str>, messages: &[LlmMessage]) -> Vec<ChatMessage> {
    let mut out = Vec::with_capacity(messages.len() + 1);
    if let Some(system) = system.filter(|s| !s.is_empty()) {
        out.push(ChatMessage::text("system", system));
    }
    for message in messages {
        match &message.content {
            LlmContent::Text(text) => out.push(ChatMessage::text(&message.role, text)),
            LlmContent::Blocks(blocks) => {
                let mut text = String::new();
                let mut tool_calls = Vec::new();
                for block in blocks {
                    match block {
                        ContentBlock::Text { text: t } => text.push_str(t),
                        ContentBlock::ToolUse { id, name, input } => tool_calls.push(ChatToolCall {
                            id: id.clone(),
                            tool_type: "function",
                            function: ChatToolCallFunction {
                                name: name.clone(),
                                arguments: input.to_string(),
                            },
                        }),
                        ContentBlock::ToolResult { tool_use_id, content, .. } => out.push(ChatMessage {
                            role: "tool".into(),
                            content: Some(content.clone()),
                            tool_calls: None,
                            tool_call_id: Some(tool_use_id.clone()),
                        }),
                    }
                }
                if !text.is_empty() || !tool_calls.is_empty() {
                    out.push(ChatMessage {
                        role: message.role.clone(),
                        content: (!text.is_empty()).then_some(text),
                        tool_calls: (!tool_calls.is_empty()).then_some(tool_calls),
                        tool_call_id: None,
                    });
                }
            }
        }
    }
    out
}

/// Translate chat-completion chunks into [`StreamDelta`]s.
///
/// Tool call fragments are keyed by their `index`; a call is announced when
/// its id and name first appear and closed when the choice finishes.
pub(crate) fn parse_chunk_stream(
    events: impl Stream<Item = LlmResult<SseEvent>> + Send + 'static,
) -> impl Stream<Item = LlmResult<StreamDelta>> + Send {
    async_stream::stream! {
        let mut open_calls: BTreeMap<u32, String> = BTreeMap::new();
        let mut finish_reason: Option<String> = None;
        let mut usage: Option<Usage> = None;

        tokio::pin!(events);

        while let Some(event) = events.next().await {
            let event = match event {
                Ok(e) => e,
                Err(e) => {
                    yield Err(e);
                    return;
                }
            };
            if event.data.trim() == "[DONE]" {
                break;
            }
            let chunk: ChatChunk = match serde_json::from_str(&event.data) {
                Ok(c) => c,
                Err(e) => {
                    yield Err(LlmError::InvalidResponse(format!("bad chunk: {}", e)));
                    return;
                }
            };
            if let Some(err) = chunk.error {
                yield Err(LlmError::StreamError(err.message));
                return;
            }
            if let Some(u) = chunk.usage {
                usage = Some(Usage { input_tokens: u.prompt_tokens, output_tokens: u.completion_tokens });
            }
            for choice in chunk.choices {
                if let Some(text) = choice.delta.content.filter(|t| !t.is_empty()) {
                    yield Ok(StreamDelta::Text(text));
                }
                for call in choice.delta.tool_calls.unwrap_or_default() {
                    if !open_calls.contains_key(&call.index) {
                        let id = call.id.clone().unwrap_or_else(|| format!("call_{}", call.index));
                        let name = call.function.as_ref().and_then(|f| f.name.clone()).unwrap_or_default();
                        open_calls.insert(call.index, id.clone());
                        yield Ok(StreamDelta::ToolCallStart { id, name });
                    }
                    let args = call.function.and_then(|f| f.arguments).filter(|a| !a.is_empty());
                    if let (Some(arguments), Some(id)) = (args, open_calls.get(&call.index)) {
                        yield Ok(StreamDelta::ToolCallDelta { id: id.clone(), arguments });
                    }
                }
                if let Some(reason) = choice.finish_reason {
                    for (_, id) in std::mem::take(&mut open_calls) {
                        yield Ok(StreamDelta::ToolCallEnd { id });
                    }
                    finish_reason = Some(reason);
                }
            }
        }

        for (_, id) in std::mem::take(&mut open_calls) {
            yield Ok(StreamDelta::ToolCallEnd { id });
        }
        debug!("Chat completion finished: {:?}", finish_reason);
        yield Ok(StreamDelta::Done { stop_reason: finish_reason, usage });
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    stream: bool,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<ChatToolDefinition>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize, PartialEq)]
struct ChatMessage {
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ChatToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

impl ChatMessage {
    fn text(role: &str, content: &str) -> Self {
        Self {
            role: role.to_string(),
            content: Some(content.to_string()),
            tool_calls: None,
            tool_call_id: None,
        }
    }
}

#[derive(Debug, Serialize, PartialEq)]
struct ChatToolCall {
    id: String,
    #[serde(rename = "type")]
    tool_type: &'static str,
    function: ChatToolCallFunction,
}

#[derive(Debug, Serialize, PartialEq)]
struct ChatToolCallFunction {
    name: String,
    arguments: String,
}

#[derive(Debug, Serialize)]
struct ChatToolDefinition {
    #[serde(rename = "type")]
    tool_type: &'static str,
    function: ChatToolFunction,
}

#[derive(Debug, Serialize)]
struct ChatToolFunction {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Debug, Deserialize)]
struct ChatChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
    usage: Option<ChunkUsage>,
    error: Option<ChunkError>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: ChunkDelta,
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ChunkDelta {
    content: Option<String>,
    tool_calls: Option<Vec<ChunkToolCall>>,
}

#[derive(Debug, Deserialize)]
struct ChunkToolCall {
    #[serde(default)]
    index: u32,
    id: Option<String>,
    function: Option<ChunkFunction>,
}

#[derive(Debug, Deserialize)]
struct ChunkFunction {
    name: Option<String>,
    arguments: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChunkUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChunkError {
    message: String,
}
