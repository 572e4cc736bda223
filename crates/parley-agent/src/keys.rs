//! Key listener: a background thread watching raw key events during
//! agent turns.
//!
//! `Esc` requests cancellation of the running turn; `Ctrl+C` (which raw mode
//! delivers as a key rather than a signal) goes to the exit debounce. The
//! listener re-arms after every key and lives as long as the session.

use crate::cancel::CancellationSignal;
use crate::debounce::ExitDebounce;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{debug, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(50);
/// Upper bound on waiting for the thread to leave a key read.
const PAUSE_ACK_TIMEOUT: Duration = Duration::from_millis(500);

/// Where the listener reads keys from.
pub trait KeySource: Send + 'static {
    /// Wait up to `timeout` for the next key event.
    fn next_key(&mut self, timeout: Duration) -> io::Result<Option<KeyEvent>>;
}

/// Keys from the real terminal.
pub struct CrosstermKeySource;

impl KeySource for CrosstermKeySource {
    fn next_key(&mut self, timeout: Duration) -> io::Result<Option<KeyEvent>> {
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                return Ok(Some(key));
            }
        }
        Ok(None)
    }
}

/// Keys pushed through a channel.
pub struct ChannelKeySource(mpsc::Receiver<KeyEvent>);

impl ChannelKeySource {
    pub fn channel() -> (mpsc::Sender<KeyEvent>, Self) {
        let (tx, rx) = mpsc::channel();
        (tx, Self(rx))
    }
}

impl KeySource for ChannelKeySource {
    fn next_key(&mut self, timeout: Duration) -> io::Result<Option<KeyEvent>> {
        match self.0.recv_timeout(timeout) {
            Ok(key) => Ok(Some(key)),
            Err(mpsc::RecvTimeoutError::Timeout) => Ok(None),
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                thread::sleep(timeout);
                Ok(None)
            }
        }
    }
}

/// What a key means to the session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyAction {
    Cancel,
    Interrupt,
    Ignore,
}

pub fn classify(key: &KeyEvent) -> KeyAction {
    if key.kind != KeyEventKind::Press {
        return KeyAction::Ignore;
    }
    match key.code {
        KeyCode::Esc => KeyAction::Cancel,
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => KeyAction::Interrupt,
        _ => KeyAction::Ignore,
    }
}

/// Set by the thread whenever it is not inside `next_key`.
#[derive(Default)]
struct Idle {
    flag: AtomicBool,
    notify: Notify,
}

impl Idle {
    fn set(&self, idle: bool) {
        self.flag.store(idle, Ordering::SeqCst);
        if idle {
            self.notify.notify_waiters();
        }
    }
}

pub struct KeyListener {
    listening: Arc<AtomicBool>,
    idle: Arc<Idle>,
    shutdown: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl KeyListener {
    /// Start the listener thread, initially paused.
    pub fn spawn(
        mut source: impl KeySource,
        signal: Arc<CancellationSignal>,
        debounce: ExitDebounce,
    ) -> io::Result<Self> {
        let listening = Arc::new(AtomicBool::new(false));
        let idle = Arc::new(Idle::default());
        idle.set(true);
        let shutdown = Arc::new(AtomicBool::new(false));

        let handle = {
            let listening = listening.clone();
            let idle = idle.clone();
            let shutdown = shutdown.clone();
            thread::Builder::new().name("parley-keys".into()).spawn(move || {
                debug!("Key listener started");
                while !shutdown.load(Ordering::SeqCst) {
                    if !listening.load(Ordering::SeqCst) {
                        idle.set(true);
                        thread::sleep(POLL_INTERVAL);
                        continue;
                    }
                    // Leave idle before the re-check so a concurrent pause()
                    // either sees us busy or stops us here.
                    idle.set(false);
                    if !listening.load(Ordering::SeqCst) {
                        continue;
                    }
                    match source.next_key(POLL_INTERVAL) {
                        Ok(Some(key)) => match classify(&key) {
                            KeyAction::Cancel => signal.request(),
                            KeyAction::Interrupt => {
                                debounce.interrupt();
                            }
                            KeyAction::Ignore => {}
                        },
                        Ok(None) => {}
                        Err(e) => {
                            warn!("Key read failed: {}", e);
                            thread::sleep(POLL_INTERVAL);
                        }
                    }
                }
                idle.set(true);
                debug!("Key listener stopped");
            })?
        };

        Ok(Self { listening, idle, shutdown, handle: Some(handle) })
    }

    /// Start consuming keys (agent turn begins).
    pub fn resume(&self) { self.listening.store(true, Ordering::SeqCst); }

    /// Stop consuming keys so line input gets them. Resolves once the thread
    /// has left any key read in progress.
    pub async fn pause(&self) {
        self.listening.store(false, Ordering::SeqCst);
        let acked = tokio::time::timeout(PAUSE_ACK_TIMEOUT, async {
            loop {
                let notified = self.idle.notify.notified();
                tokio::pin!(notified);
                notified.as_mut().enable();
                if self.is_idle() {
                    return;
                }
                notified.await;
            }
        })
        .await;
        if acked.is_err() {
            warn!("Key listener did not acknowledge pause");
        }
    }

    fn is_idle(&self) -> bool {
        self.idle.flag.load(Ordering::SeqCst) || self.handle.as_ref().map_or(true, |h| h.is_finished())
    }

    pub fn is_listening(&self) -> bool { self.listening.load(Ordering::SeqCst) }

    /// Stop the thread and wait for it.
    pub fn shutdown(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("Key listener thread panicked");
            }
        }
    }
}

impl Drop for KeyListener {
    fn drop(&mut self) { self.shutdown(); }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEventState;
    use tokio::runtime::Handle;

    fn key(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    #[test]
    fn classify_keys() {
        assert_eq!(classify(&key(KeyCode::Esc, KeyModifiers::NONE)), KeyAction::Cancel);
        assert_eq!(classify(&key(KeyCode::Char('c'), KeyModifiers::CONTROL)), KeyAction::Interrupt);
        assert_eq!(classify(&key(KeyCode::Char('c'), KeyModifiers::NONE)), KeyAction::Ignore);
        let release = KeyEvent {
            code: KeyCode::Esc,
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Release,
            state: KeyEventState::NONE,
        };
        assert_eq!(classify(&release), KeyAction::Ignore);
    }

    #[tokio::test]
    async fn esc_sets_signal_every_time() {
        let signal = Arc::new(CancellationSignal::new());
        let debounce = ExitDebounce::new(Duration::from_secs(10), Handle::current());
        let (tx, source) = ChannelKeySource::channel();
        let mut listener = KeyListener::spawn(source, signal.clone(), debounce.clone()).unwrap();
        listener.resume();

        for _ in 0..2 {
            tx.send(key(KeyCode::Esc, KeyModifiers::NONE)).unwrap();
            tokio::time::timeout(Duration::from_secs(5), signal.requested()).await.unwrap();
            signal.clear();
        }
        assert_eq!(debounce.state(), crate::debounce::DebounceState::Idle);

        listener.shutdown();
        assert!(listener.handle.is_none());
    }

    /// Records whether a read is in progress.
    struct SlowSource {
        reading: Arc<AtomicBool>,
        reads: Arc<std::sync::atomic::AtomicUsize>,
    }

    impl KeySource for SlowSource {
        fn next_key(&mut self, timeout: Duration) -> io::Result<Option<KeyEvent>> {
            self.reading.store(true, Ordering::SeqCst);
            self.reads.fetch_add(1, Ordering::SeqCst);
            thread::sleep(timeout);
            self.reading.store(false, Ordering::SeqCst);
            Ok(None)
        }
    }

    #[tokio::test]
    async fn pause_waits_for_read_in_progress() {
        let reading = Arc::new(AtomicBool::new(false));
        let reads = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let source = SlowSource { reading: reading.clone(), reads: reads.clone() };
        let debounce = ExitDebounce::new(Duration::from_secs(10), Handle::current());
        let listener = KeyListener::spawn(source, Arc::new(CancellationSignal::new()), debounce).unwrap();

        for _ in 0..3 {
            listener.resume();
            tokio::time::timeout(Duration::from_secs(5), async {
                while !reading.load(Ordering::SeqCst) {
                    tokio::time::sleep(Duration::from_millis(1)).await;
                }
            })
            .await
            .unwrap();

            listener.pause().await;
            assert!(!reading.load(Ordering::SeqCst), "still inside a key read after pause");
            let after_pause = reads.load(Ordering::SeqCst);
            tokio::time::sleep(POLL_INTERVAL * 3).await;
            assert_eq!(reads.load(Ordering::SeqCst), after_pause);
        }
    }

    #[tokio::test]
    async fn ctrl_c_key_drives_debounce() {
        let signal = Arc::new(CancellationSignal::new());
        let debounce = ExitDebounce::new(Duration::from_secs(10), Handle::current());
        let (tx, source) = ChannelKeySource::channel();
        let listener = KeyListener::spawn(source, signal.clone(), debounce.clone()).unwrap();
        listener.resume();

        tx.send(key(KeyCode::Char('c'), KeyModifiers::CONTROL)).unwrap();
        tx.send(key(KeyCode::Char('c'), KeyModifiers::CONTROL)).unwrap();
        tokio::time::timeout(Duration::from_secs(5), debounce.terminated()).await.unwrap();
        assert!(!signal.is_requested());
    }
}
