//! Conversation buffer: the system prompt plus completed exchanges.
//!
//! A turn's user input is held as pending until the turn finishes; only
//! completed turns are committed, so cancelled or failed turns leave no
//! dangling user message behind.

use parley_llm::LlmMessage;

#[derive(Clone, Debug, Default)]
pub struct Conversation {
    system_prompt: Option<String>,
    history: Vec<LlmMessage>,
    pending: Option<String>,
}

impl Conversation {
    pub fn new(system_prompt: impl Into<String>) -> Self {
        let prompt = system_prompt.into();
        Self {
            system_prompt: if prompt.trim().is_empty() { None } else { Some(prompt) },
            ..Default::default()
        }
    }

    pub fn system_prompt(&self) -> Option<&str> { self.system_prompt.as_deref() }

    /// Start a turn with `input` as the pending user message.
    pub fn begin(&mut self, input: impl Into<String>) {
        self.pending = Some(input.into());
    }

    /// Commit the pending exchange with the assistant's `reply`.
    pub fn commit(&mut self, reply: impl Into<String>) {
        if let Some(input) = self.pending.take() {
            self.history.push(LlmMessage::user(input));
            self.history.push(LlmMessage::assistant(reply));
        }
    }

    /// Drop the pending user message.
    pub fn abandon(&mut self) {
        self.pending = None;
    }

    pub fn pending(&self) -> Option<&str> { self.pending.as_deref() }

    /// Committed history followed by the pending user message, if any.
    pub fn messages(&self) -> Vec<LlmMessage> {
        let mut messages = self.history.clone();
        if let Some(input) = &self.pending {
            messages.push(LlmMessage::user(input.clone()));
        }
        messages
    }

    /// Number of committed messages.
    pub fn len(&self) -> usize { self.history.len() }

    pub fn is_empty(&self) -> bool { self.history.is_empty() }
}
