//! Double-interrupt exit confirmation.
//!
//! The first interrupt arms a confirmation window; a second one inside the
//! window escalates to `Terminated`. A one-shot timer disarms the window when
//! it lapses. Every interrupt source goes through [`ExitDebounce::interrupt`],
//! which serializes transitions on one mutex, so a second interrupt racing the
//! timer resolves to whichever takes the lock first.
//!
//! Nothing here exits the process: observers read the state from a
//! `watch` channel and decide what to do.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DebounceState {
    Idle,
    Armed,
    Terminated,
}

/// What a single interrupt did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InterruptOutcome {
    /// Window opened; the user must confirm.
    Armed,
    /// Second interrupt inside the window (or already terminated).
    Terminated,
}

enum Phase {
    Idle,
    Armed { at: Instant },
    Terminated,
}

struct Inner {
    phase: Phase,
    /// Pending timeout; cancelled whenever a new one is scheduled.
    timer: Option<CancellationToken>,
    generation: u64,
}

struct Shared {
    inner: Mutex<Inner>,
    tx: watch::Sender<DebounceState>,
    window: Duration,
    runtime: Handle,
}

#[derive(Clone)]
pub struct ExitDebounce {
    shared: Arc<Shared>,
}

impl ExitDebounce {
    /// `runtime` hosts the timeout tasks; interrupts may come from any thread.
    pub fn new(window: Duration, runtime: Handle) -> Self {
        let (tx, _) = watch::channel(DebounceState::Idle);
        Self {
            shared: Arc::new(Shared {
                inner: Mutex::new(Inner { phase: Phase::Idle, timer: None, generation: 0 }),
                tx,
                window,
                runtime,
            }),
        }
    }

    pub fn window(&self) -> Duration { self.shared.window }

    pub fn state(&self) -> DebounceState { *self.shared.tx.borrow() }

    pub fn subscribe(&self) -> watch::Receiver<DebounceState> { self.shared.tx.subscribe() }

    pub fn is_terminated(&self) -> bool { self.state() == DebounceState::Terminated }

    /// Record one interrupt.
    pub fn interrupt(&self) -> InterruptOutcome {
        let mut inner = self.shared.lock();
        let armed_at = match inner.phase {
            Phase::Terminated => return InterruptOutcome::Terminated,
            Phase::Armed { at } => Some(at),
            Phase::Idle => None,
        };

        match armed_at {
            Some(at) if at.elapsed() < self.shared.window => {
                if let Some(timer) = inner.timer.take() {
                    timer.cancel();
                }
                inner.phase = Phase::Terminated;
                info!("Second interrupt within {:?}: terminating", self.shared.window);
                self.shared.tx.send_replace(DebounceState::Terminated);
                InterruptOutcome::Terminated
            }
            // Idle, or a window whose timer has not run yet.
            _ => {
                self.arm(&mut inner);
                InterruptOutcome::Armed
            }
        }
    }

    /// Resolve once the state reaches `Terminated`.
    pub async fn terminated(&self) {
        let mut rx = self.subscribe();
        // The sender lives in `self.shared`.
        let _ = rx.wait_for(|s| *s == DebounceState::Terminated).await;
    }

    fn arm(&self, inner: &mut Inner) {
        if let Some(old) = inner.timer.take() {
            old.cancel();
        }
        inner.generation += 1;
        inner.phase = Phase::Armed { at: Instant::now() };

        let token = CancellationToken::new();
        inner.timer = Some(token.clone());
        let generation = inner.generation;
        let shared = self.shared.clone();
        self.shared.runtime.spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(shared.window) => shared.expire(generation),
            }
        });

        debug!("Exit confirmation armed for {:?}", self.shared.window);
        self.shared.tx.send_replace(DebounceState::Armed);
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn expire(&self, generation: u64) {
        let mut inner = self.lock();
        if inner.generation != generation || !matches!(inner.phase, Phase::Armed { .. }) {
            return;
        }
        inner.phase = Phase::Idle;
        inner.timer = None;
        debug!("Exit confirmation window lapsed");
        self.tx.send_replace(DebounceState::Idle);
    }
}
