//! Server-sent event framing shared by the HTTP providers

use crate::provider::{LlmError, LlmResult};
use eventsource_stream::Eventsource;
use futures::{Stream, StreamExt};

/// One decoded SSE event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SseEvent {
    /// `event:` field; "message" when the server omits it.
    pub event: String,
    pub data: String,
}

/// Decode a raw byte stream into SSE events. Transport errors surface as
/// `LlmError::StreamError`; events without data are skipped.
pub fn sse_events<S, B, E>(bytes: S) -> impl Stream<Item = LlmResult<SseEvent>> + Send
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send,
    E: std::fmt::Display + Send,
{
    bytes.eventsource().filter_map(|item| async move {
        match item {
            Ok(event) if event.data.is_empty() => None,
            Ok(event) => Some(Ok(SseEvent {
                event: event.event,
                data: event.data,
            })),
            Err(e) => Some(Err(LlmError::StreamError(e.to_string()))),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunks(parts: &[&'static str]) -> impl Stream<Item = Result<&'static [u8], std::io::Error>> {
        futures::stream::iter(parts.iter().map(|p| Ok(p.as_bytes())).collect::<Vec<_>>())
    }

    #[tokio::test]
    async fn events_split_across_chunks() {
        let events: Vec<_> = sse_events(chunks(&[
            "event: ping\ndata: {\"a\"",
            ":1}\n\nevent: done\ndata: x\n\n",
        ]))
        .collect()
        .await;
        assert_eq!(events.len(), 2);
        let first = events[0].as_ref().unwrap();
        assert_eq!(first.event, "ping");
        assert_eq!(first.data, "{\"a\":1}");
        assert_eq!(events[1].as_ref().unwrap().event, "done");
    }

    #[tokio::test]
    async fn events_without_data_are_skipped() {
        let events: Vec<_> = sse_events(chunks(&[": keepalive\n\n", "data: hi\n\n"]))
            .collect()
            .await;
        assert_eq!(events.len(), 1);
        let only = events[0].as_ref().unwrap();
        assert_eq!(only.data, "hi");
    }
}
