//! Activity indicator: a spinner line redrawn on a fixed cadence while a
//! turn runs. Rendering happens on its own task, so updating the label never
//! blocks the caller.

use crate::terminal::SharedWriter;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub const SPINNER: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IndicatorState {
    Idle,
    Thinking(String),
    ToolInUse(String),
    Stopped,
}

impl IndicatorState {
    fn line(&self) -> Option<String> {
        match self {
            Self::Thinking(label) => Some(format!("{}...", label)),
            Self::ToolInUse(label) => Some(format!("using {}...", label)),
            Self::Idle | Self::Stopped => None,
        }
    }
}

pub struct ActivityIndicator {
    out: SharedWriter,
    interval: Duration,
    state: watch::Sender<IndicatorState>,
    render: Option<(CancellationToken, JoinHandle<()>)>,
}

impl ActivityIndicator {
    pub fn new(out: SharedWriter, interval: Duration) -> Self {
        let (state, _) = watch::channel(IndicatorState::Idle);
        Self { out, interval, state, render: None }
    }

    pub fn state(&self) -> IndicatorState { self.state.borrow().clone() }

    /// Show `label` as the generation phase. Replaces any current label.
    pub fn start(&mut self, label: impl Into<String>) {
        self.set(IndicatorState::Thinking(label.into()));
    }

    /// Show that a tool named `label` is running.
    pub fn tool_in_use(&mut self, label: impl Into<String>) {
        self.set(IndicatorState::ToolInUse(label.into()));
    }

    /// Halt rendering and clear the line.
    pub async fn stop(&mut self) {
        if let Some((token, handle)) = self.render.take() {
            token.cancel();
            let _ = handle.await;
            if let Err(e) = self.out.clear_line() {
                debug!("Indicator clear failed: {}", e);
            }
        }
        self.state.send_replace(IndicatorState::Stopped);
    }

    fn set(&mut self, state: IndicatorState) {
        self.state.send_replace(state);
        if self.render.is_none() {
            let token = CancellationToken::new();
            let handle = tokio::spawn(render_loop(
                self.out.clone(),
                self.interval,
                self.state.subscribe(),
                token.clone(),
            ));
            self.render = Some((token, handle));
        }
    }
}

impl Drop for ActivityIndicator {
    fn drop(&mut self) {
        if let Some((token, _)) = self.render.take() {
            token.cancel();
        }
    }
}

async fn render_loop(
    out: SharedWriter,
    interval: Duration,
    state: watch::Receiver<IndicatorState>,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut frame = 0usize;

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                let line = state.borrow().line();
                let Some(line) = line else { continue };
                let text = format!("{} {}", SPINNER[frame % SPINNER.len()], line);
                frame += 1;
                if let Err(e) = out.status_line(&text) {
                    debug!("Indicator render failed: {}", e);
                    break;
                }
            }
        }
    }
}
