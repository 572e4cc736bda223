//! Streaming aggregator: drives one agent turn to a [`TurnResult`].
//!
//! Fragments are pulled one at a time. The cancellation signal is checked
//! before the first pull and after every fragment arrives, and the wait for
//! the next fragment is abandoned as soon as a cancellation is requested.

use crate::cancel::CancellationSignal;
use crate::capability::{AgentCapability, FragmentKind};
use crate::conversation::Conversation;
use crate::indicator::ActivityIndicator;
use futures::StreamExt;
use parley_tools::ToolRegistry;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const THINKING_LABEL: &str = "thinking";

/// Outcome of every turn-level operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TurnResult {
    Completed(String),
    Cancelled,
    Failed(String),
}

/// Reply text for one turn.
#[derive(Debug, Default)]
pub struct StreamAccumulator {
    fragments: Vec<String>,
    final_text: Option<String>,
}

impl StreamAccumulator {
    pub fn new() -> Self { Self::default() }

    pub fn push(&mut self, text: impl Into<String>) {
        self.fragments.push(text.into());
    }

    pub fn set_final(&mut self, text: impl Into<String>) {
        self.final_text = Some(text.into());
    }

    pub fn fragment_count(&self) -> usize { self.fragments.len() }

    /// The final text if one was given, otherwise the fragments in order.
    pub fn finalize(self) -> String {
        self.final_text.unwrap_or_else(|| self.fragments.concat())
    }
}

pub struct StreamingAggregator {
    agent: Arc<dyn AgentCapability>,
    signal: Arc<CancellationSignal>,
}

impl StreamingAggregator {
    pub fn new(agent: Arc<dyn AgentCapability>, signal: Arc<CancellationSignal>) -> Self {
        Self { agent, signal }
    }

    pub async fn run(
        &self,
        conversation: &Conversation,
        tools: Arc<ToolRegistry>,
        indicator: &mut ActivityIndicator,
    ) -> TurnResult {
        if self.signal.is_requested() {
            info!("Turn cancelled before the first fragment");
            return TurnResult::Cancelled;
        }

        let mut stream = self.agent.stream_respond(conversation, tools);
        let mut acc = StreamAccumulator::new();

        loop {
            let next = tokio::select! {
                biased;
                _ = self.signal.requested() => None,
                item = stream.next() => Some(item),
            };
            let Some(item) = next else {
                info!("Turn cancelled after {} fragment(s)", acc.fragment_count());
                return TurnResult::Cancelled;
            };
            if self.signal.is_requested() {
                info!("Turn cancelled after {} fragment(s)", acc.fragment_count());
                return TurnResult::Cancelled;
            }

            let fragment = match item {
                None => break,
                Some(Ok(fragment)) => fragment,
                Some(Err(e)) => {
                    warn!("Agent capability failed: {}", e);
                    return TurnResult::Failed(e.to_string());
                }
            };

            match fragment.kind {
                FragmentKind::Text => acc.push(fragment.text),
                FragmentKind::ToolStarted(name) => {
                    debug!("Tool started: {}", name);
                    indicator.tool_in_use(name);
                }
                FragmentKind::ToolFinished(name) => {
                    debug!("Tool finished: {}", name);
                    indicator.start(THINKING_LABEL);
                }
                FragmentKind::Final => acc.set_final(fragment.text),
            }
        }

        TurnResult::Completed(acc.finalize())
    }
}
