//! Session loop: read a line, route it, render the outcome, repeat.
//!
//! Lines naming a registered tool (or starting with `/`) are dispatched to
//! the registry; everything else becomes an agent turn driven by the
//! [`StreamingAggregator`]. The exit debounce is watched the whole time:
//! `Armed` prints the confirmation notice (and cancels a running agent
//! turn), `Terminated` unwinds the loop at once.

use crate::aggregator::{StreamingAggregator, TurnResult, THINKING_LABEL};
use crate::cancel::CancellationSignal;
use crate::capability::AgentCapability;
use crate::conversation::Conversation;
use crate::debounce::{DebounceState, ExitDebounce};
use crate::error::AgentResult;
use crate::indicator::ActivityIndicator;
use crate::keys::{KeyListener, KeySource};
use crate::terminal::{RawModeGuard, SharedWriter};
use parley_core::SessionSettings;
use parley_tools::{split_command, ToolRegistry, ToolResult};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};
use tokio::sync::watch;
use tracing::{debug, info};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    ToolTurn,
    AgentTurn,
    Exiting,
}

/// Why the loop returned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionExit {
    /// An exit keyword was entered.
    UserExit,
    /// Double interrupt confirmed.
    Terminated,
    /// Input closed.
    EndOfInput,
}

pub struct SessionConfig {
    pub exit_keywords: Vec<String>,
    pub assistant_name: String,
    pub system_prompt: String,
    pub indicator_interval: Duration,
    /// Switch the terminal to raw mode during agent turns so the key
    /// listener sees Esc and Ctrl+C.
    pub raw_mode: bool,
}

impl From<&SessionSettings> for SessionConfig {
    fn from(settings: &SessionSettings) -> Self {
        Self {
            exit_keywords: settings.exit_keywords.clone(),
            assistant_name: settings.assistant_name.clone(),
            system_prompt: settings.system_prompt.clone(),
            indicator_interval: settings.indicator_interval(),
            raw_mode: false,
        }
    }
}

impl SessionConfig {
    fn is_exit_keyword(&self, input: &str) -> bool {
        self.exit_keywords.iter().any(|k| k.eq_ignore_ascii_case(input))
    }
}

enum Input {
    Line(String),
    Eof,
    Terminated,
}

pub struct Session {
    config: SessionConfig,
    agent: Arc<dyn AgentCapability>,
    tools: Arc<ToolRegistry>,
    conversation: Conversation,
    signal: Arc<CancellationSignal>,
    debounce: ExitDebounce,
    out: SharedWriter,
    keys: Option<KeyListener>,
    state: SessionState,
}

impl Session {
    pub fn new(
        config: SessionConfig,
        agent: Arc<dyn AgentCapability>,
        tools: Arc<ToolRegistry>,
        debounce: ExitDebounce,
        out: SharedWriter,
    ) -> Self {
        let conversation = Conversation::new(config.system_prompt.clone());
        Self {
            config,
            agent,
            tools,
            conversation,
            signal: Arc::new(CancellationSignal::new()),
            debounce,
            out,
            keys: None,
            state: SessionState::Idle,
        }
    }

    /// Attach a key listener reading from `source`.
    pub fn with_key_listener(mut self, source: impl KeySource) -> std::io::Result<Self> {
        self.keys = Some(KeyListener::spawn(source, self.signal.clone(), self.debounce.clone())?);
        Ok(self)
    }

    pub fn signal(&self) -> Arc<CancellationSignal> { self.signal.clone() }

    pub fn debounce(&self) -> &ExitDebounce { &self.debounce }

    pub fn state(&self) -> SessionState { self.state }

    pub fn conversation(&self) -> &Conversation { &self.conversation }

    /// Run until an exit keyword, end of input, or a confirmed double interrupt.
    pub async fn run<R>(&mut self, input: R) -> AgentResult<SessionExit>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = input.lines();
        let mut exit_rx = self.debounce.subscribe();
        info!("Session started (model={})", self.agent.name());

        let exit = loop {
            self.state = SessionState::Idle;
            if self.debounce.is_terminated() {
                break SessionExit::Terminated;
            }

            self.out.prompt(self.agent.name())?;
            let line = match self.read_line(&mut lines, &mut exit_rx).await? {
                Input::Line(line) => line,
                Input::Eof => {
                    self.out.newline()?;
                    break SessionExit::EndOfInput;
                }
                Input::Terminated => break SessionExit::Terminated,
            };

            let input = line.trim();
            if input.is_empty() {
                continue;
            }
            if self.config.is_exit_keyword(input) {
                break SessionExit::UserExit;
            }

            if let Some(command) = input.strip_prefix('/') {
                self.tool_turn(command)?;
            } else if self.tools.contains(split_command(input).0) {
                self.tool_turn(input)?;
            } else if !self.agent_turn(input, &mut exit_rx).await? {
                break SessionExit::Terminated;
            }

            // Turn boundary
            self.signal.clear();
        };

        self.shutdown();
        info!("Session ended: {:?}", exit);
        Ok(exit)
    }

    async fn read_line<R>(
        &self,
        lines: &mut Lines<R>,
        exit_rx: &mut watch::Receiver<DebounceState>,
    ) -> AgentResult<Input>
    where
        R: AsyncBufRead + Unpin,
    {
        loop {
            tokio::select! {
                biased;
                Ok(()) = exit_rx.changed() => {
                    let state = *exit_rx.borrow_and_update();
                    match state {
                        DebounceState::Armed => {
                            self.out.newline()?;
                            self.exit_notice()?;
                            self.out.prompt(self.agent.name())?;
                        }
                        DebounceState::Terminated => {
                            self.out.newline()?;
                            return Ok(Input::Terminated);
                        }
                        DebounceState::Idle => {}
                    }
                }
                line = lines.next_line() => {
                    return Ok(match line? {
                        Some(line) => Input::Line(line),
                        None => Input::Eof,
                    });
                }
            }
        }
    }

    fn tool_turn(&mut self, command: &str) -> AgentResult<()> {
        self.state = SessionState::ToolTurn;
        let command = command.trim();
        if command.is_empty() || command == "help" {
            self.out.tool_output(&self.tools.help())?;
            return Ok(());
        }

        debug!("Tool turn: {}", split_command(command).0);
        match self.tools.dispatch(command) {
            ToolResult::Text(text) => self.out.tool_output(&text)?,
            ToolResult::Failed { name, cause } => self.out.error(&format!("{} failed: {}", name, cause))?,
            not_found => self.out.error(&not_found.to_content_string())?,
        }
        Ok(())
    }

    /// Run one agent turn. Returns `false` when the session must terminate.
    async fn agent_turn(
        &mut self,
        input: &str,
        exit_rx: &mut watch::Receiver<DebounceState>,
    ) -> AgentResult<bool> {
        self.state = SessionState::AgentTurn;
        self.conversation.begin(input);

        let raw = if self.config.raw_mode {
            RawModeGuard::enable()
                .map_err(|e| debug!("Raw mode unavailable: {}", e))
                .ok()
        } else {
            None
        };
        if let Some(keys) = &self.keys {
            keys.resume();
        }

        let mut indicator = ActivityIndicator::new(self.out.clone(), self.config.indicator_interval);
        indicator.start(THINKING_LABEL);
        let aggregator = StreamingAggregator::new(self.agent.clone(), self.signal.clone());

        let outcome = {
            let turn = aggregator.run(&self.conversation, self.tools.clone(), &mut indicator);
            tokio::pin!(turn);
            loop {
                tokio::select! {
                    biased;
                    Ok(()) = exit_rx.changed() => {
                        let state = *exit_rx.borrow_and_update();
                        match state {
                            DebounceState::Armed => self.signal.request(),
                            DebounceState::Terminated => {
                                self.signal.request();
                                break None;
                            }
                            DebounceState::Idle => {}
                        }
                    }
                    result = &mut turn => break Some(result),
                }
            }
        };

        indicator.stop().await;
        drop(raw);
        if let Some(keys) = &self.keys {
            keys.pause().await;
        }

        let Some(outcome) = outcome else {
            info!("Agent turn abandoned: exit confirmed");
            self.conversation.abandon();
            self.out.newline()?;
            return Ok(false);
        };

        match outcome {
            TurnResult::Completed(text) => {
                info!("Agent turn completed ({} chars)", text.len());
                self.out.reply(&self.config.assistant_name, &text)?;
                self.conversation.commit(text);
            }
            TurnResult::Cancelled => {
                info!("Agent turn cancelled");
                self.conversation.abandon();
                self.out.cancelled()?;
            }
            TurnResult::Failed(e) => {
                info!("Agent turn failed: {}", e);
                self.conversation.abandon();
                self.out.error(&e)?;
            }
        }

        if self.debounce.state() == DebounceState::Armed {
            self.exit_notice()?;
        }
        Ok(true)
    }

    fn exit_notice(&self) -> AgentResult<()> {
        self.out.notice(&format!(
            "Press Ctrl+C again within {} seconds to confirm exit.",
            self.debounce.window().as_secs()
        ))?;
        Ok(())
    }

    fn shutdown(&mut self) {
        self.state = SessionState::Exiting;
        if let Some(mut keys) = self.keys.take() {
            keys.shutdown();
        }
    }
}
