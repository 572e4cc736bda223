//! Anthropic Messages API provider with SSE streaming

use crate::provider::{LlmError, LlmProvider, LlmResult, LlmStream};
use crate::sse::{sse_events, SseEvent};
use crate::types::{LlmContent, LlmRequest, StreamDelta, Usage};
use futures::{Stream, StreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

pub struct AnthropicProvider {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl AnthropicProvider {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: ANTHROPIC_API_URL.to_string(),
            model: model.into(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

#[async_trait::async_trait]
impl LlmProvider for AnthropicProvider {
    fn name(&self) -> &str { "anthropic" }

    fn model(&self) -> &str { &self.model }

    async fn complete_stream(&self, request: LlmRequest) -> LlmResult<LlmStream> {
        let model = if request.model.is_empty() { self.model.clone() } else { request.model.clone() };
        let body = AnthropicRequest {
            model,
            messages: request.messages.iter().map(|m| AnthropicMessage {
                role: m.role.clone(),
                content: match &m.content {
                    LlmContent::Text(s) => serde_json::json!(s),
                    LlmContent::Blocks(blocks) => serde_json::to_value(blocks).unwrap_or_default(),
                },
            }).collect(),
            max_tokens: request.max_tokens.unwrap_or(4096),
            stream: true,
            system: request.system.clone(),
            temperature: request.temperature,
            tools: request.tools.as_ref().filter(|t| !t.is_empty()).map(|tools| {
                tools.iter().map(|t| AnthropicTool {
                    name: t.name.clone(),
                    description: t.description.clone(),
                    input_schema: t.input_schema.clone(),
                }).collect()
            }),
        };

        debug!("Anthropic request: model={} messages={}", body.model, body.messages.len());

        let response = self.client
            .post(&self.base_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("Anthropic error {}: {}", status, error_text);
            return Err(LlmError::from_status(status.as_u16(), error_text));
        }

        Ok(Box::pin(parse_sse_stream(sse_events(response.bytes_stream()))))
    }
}

/// Translate Anthropic stream events into [`StreamDelta`]s.
pub(crate) fn parse_sse_stream(
    events: impl Stream<Item = LlmResult<SseEvent>> + Send + 'static,
) -> impl Stream<Item = LlmResult<StreamDelta>> + Send {
    async_stream::stream! {
        let mut current_tool_id: Option<String> = None;
        let mut stop_reason: Option<String> = None;
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

            match event.event.as_str() {
                "content_block_start" => {
                    if let Ok(data) = serde_json::from_str::<ContentBlockStart>(&event.data) {
                        if let ContentBlockType::ToolUse { id, name } = data.content_block {
                            current_tool_id = Some(id.clone());
                            yield Ok(StreamDelta::ToolCallStart { id, name });
                        }
                    }
                }
                "content_block_delta" => {
                    if let Ok(data) = serde_json::from_str::<ContentBlockDelta>(&event.data) {
                        match data.delta {
                            DeltaType::TextDelta { text } => {
                                yield Ok(StreamDelta::Text(text));
                            }
                            DeltaType::ThinkingDelta { thinking } => {
                                yield Ok(StreamDelta::Thinking(thinking));
                            }
                            DeltaType::InputJsonDelta { partial_json } => {
                                if let Some(id) = &current_tool_id {
                                    yield Ok(StreamDelta::ToolCallDelta {
                                        id: id.clone(),
                                        arguments: partial_json,
                                    });
                                }
                            }
                            DeltaType::Other => {}
                        }
                    }
                }
                "content_block_stop" => {
                    if let Some(id) = current_tool_id.take() {
                        yield Ok(StreamDelta::ToolCallEnd { id });
                    }
                }
                "message_delta" => {
                    if let Ok(data) = serde_json::from_str::<MessageDelta>(&event.data) {
                        if let Some(reason) = data.delta.stop_reason {
                            debug!("Message complete: stop_reason={}", reason);
                            stop_reason = Some(reason);
                        }
                        if data.usage.is_some() {
                            usage = data.usage;
                        }
                    }
                }
                "message_stop" => {
                    yield Ok(StreamDelta::Done {
                        stop_reason: stop_reason.take().or_else(|| Some("end_turn".to_string())),
                        usage: usage.take(),
                    });
                }
                "error" => {
                    let message = serde_json::from_str::<ErrorEvent>(&event.data)
                        .map(|e| e.error.message)
                        .unwrap_or(event.data);
                    yield Err(LlmError::StreamError(message));
                    return;
                }
                _ => {}
            }
        }
    }
}

#[derive(Serialize)]
struct AnthropicRequest {
    model: String,
    messages: Vec<AnthropicMessage>,
    max_tokens: u32,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<AnthropicTool>>,
}

#[derive(Serialize)]
struct AnthropicMessage {
    role: String,
    content: serde_json::Value,
}

#[derive(Serialize)]
struct AnthropicTool {
    name: String,
    description: String,
    input_schema: serde_json::Value,
}

#[derive(Deserialize)]
struct ContentBlockStart {
    content_block: ContentBlockType,
}

#[derive(Deserialize)]
#[serde(tag = "type")]
enum ContentBlockType {
    #[serde(rename = "tool_use")]
    ToolUse { id: String, name: String },
    #[serde(other)]
    Other,
}

#[derive(Deserialize)]
struct ContentBlockDelta {
    delta: DeltaType,
}

#[derive(Deserialize)]
#[serde(tag = "type")]
enum DeltaType {
    #[serde(rename = "text_delta")]
    TextDelta { text: String },
    #[serde(rename = "thinking_delta")]
    ThinkingDelta { thinking: String },
    #[serde(rename = "input_json_delta")]
    InputJsonDelta { partial_json: String },
    #[serde(other)]
    Other,
}

#[derive(Deserialize)]
struct MessageDelta {
    delta: MessageDeltaContent,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct MessageDeltaContent {
    stop_reason: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEvent {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(name: &str, data: &str) -> LlmResult<SseEvent> {
        Ok(SseEvent { event: name.to_string(), data: data.to_string() })
    }

    async fn collect(events: Vec<LlmResult<SseEvent>>) -> Vec<LlmResult<StreamDelta>> {
        parse_sse_stream(futures::stream::iter(events)).collect().await
    }

    #[tokio::test]
    async fn text_and_tool_call_sequence() {
        let deltas = collect(vec![
            event("message_start", r#"{"type":"message_start"}"#),
            event("content_block_start", r#"{"index":0,"content_block":{"type":"text","text":""}}"#),
            event("content_block_delta", r#"{"index":0,"delta":{"type":"text_delta","text":"Let me check"}}"#),
            event("content_block_stop", r#"{"index":0}"#),
            event("content_block_start", r#"{"index":1,"content_block":{"type":"tool_use","id":"tu_1","name":"GetTime","input":{}}}"#),
            event("content_block_delta", r#"{"index":1,"delta":{"type":"input_json_delta","partial_json":"{\"input\":\"\"}"}}"#),
            event("content_block_stop", r#"{"index":1}"#),
            event("message_delta", r#"{"delta":{"stop_reason":"tool_use"},"usage":{"input_tokens":3,"output_tokens":9}}"#),
            event("message_stop", r#"{"type":"message_stop"}"#),
        ]).await;

        let deltas: Vec<StreamDelta> = deltas.into_iter().map(|d| d.unwrap()).collect();
        assert!(matches!(&deltas[0], StreamDelta::Text(t) if t == "Let me check"));
        assert!(matches!(&deltas[1], StreamDelta::ToolCallStart { id, name } if id == "tu_1" && name == "GetTime"));
        assert!(matches!(&deltas[2], StreamDelta::ToolCallDelta { arguments, .. } if arguments == "{\"input\":\"\"}"));
        assert!(matches!(&deltas[3], StreamDelta::ToolCallEnd { id } if id == "tu_1"));
        match &deltas[4] {
            StreamDelta::Done { stop_reason, usage } => {
                assert_eq!(stop_reason.as_deref(), Some("tool_use"));
                assert_eq!(usage.as_ref().map(|u| u.output_tokens), Some(9));
            }
            other => panic!("expected Done, got {:?}", other),
        }
        assert_eq!(deltas.len(), 5);
    }

    #[tokio::test]
    async fn error_event_ends_stream() {
        let deltas = collect(vec![
            event("error", r#"{"type":"error","error":{"type":"overloaded_error","message":"Overloaded"}}"#),
            event("content_block_delta", r#"{"index":0,"delta":{"type":"text_delta","text":"late"}}"#),
        ]).await;
        assert_eq!(deltas.len(), 1);
        assert!(matches!(&deltas[0], Err(LlmError::StreamError(m)) if m == "Overloaded"));
    }

    #[tokio::test]
    async fn transport_error_is_forwarded() {
        let deltas = collect(vec![Err(LlmError::StreamError("reset".into()))]).await;
        assert!(matches!(&deltas[0], Err(LlmError::StreamError(m)) if m == "reset"));
    }
}
