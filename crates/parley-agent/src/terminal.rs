//! Terminal surface: a shareable line writer, raw-mode guard and the
//! styled lines the session prints.

use crossterm::style::Stylize;
use crossterm::{cursor, queue, terminal};
use std::io::{self, Write};
use std::sync::{Arc, Mutex, MutexGuard};

/// Marker rendered in place of a cancelled reply.
pub const CANCELLED_MARKER: &str = "[cancelled]";

pub type Sink = Box<dyn Write + Send>;

/// Writer shared by the session and the activity indicator.
#[derive(Clone)]
pub struct SharedWriter(Arc<Mutex<Sink>>);

impl SharedWriter {
    pub fn new(writer: impl Write + Send + 'static) -> Self {
        Self(Arc::new(Mutex::new(Box::new(writer))))
    }

    pub fn stdout() -> Self { Self::new(io::stdout()) }

    /// In-memory terminal; the buffer sees everything written.
    pub fn capture() -> (Self, CaptureBuffer) {
        let buffer = CaptureBuffer::default();
        (Self::new(buffer.clone()), buffer)
    }

    fn lock(&self) -> MutexGuard<'_, Sink> {
        self.0.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Run `f` with exclusive access and flush afterwards.
    pub fn with<R>(&self, f: impl FnOnce(&mut Sink) -> io::Result<R>) -> io::Result<R> {
        let mut w = self.lock();
        let out = f(&mut w)?;
        w.flush()?;
        Ok(out)
    }

    pub fn prompt(&self, model: &str) -> io::Result<()> {
        self.with(|w| write!(w, "{} ", format!("You ({})>", model).bold()))
    }

    pub fn reply(&self, assistant: &str, text: &str) -> io::Result<()> {
        self.with(|w| writeln!(w, "{} {}", format!("{}:", assistant).cyan().bold(), text))
    }

    pub fn tool_output(&self, text: &str) -> io::Result<()> {
        self.with(|w| writeln!(w, "{}", text.green()))
    }

    pub fn cancelled(&self) -> io::Result<()> {
        self.with(|w| writeln!(w, "{}", CANCELLED_MARKER.yellow()))
    }

    pub fn error(&self, message: &str) -> io::Result<()> {
        self.with(|w| writeln!(w, "{}", format!("Error: {}", message).red()))
    }

    pub fn notice(&self, message: &str) -> io::Result<()> {
        self.with(|w| writeln!(w, "{}", message.dim()))
    }

    /// Overwrite the current line with `text` without advancing.
    pub fn status_line(&self, text: &str) -> io::Result<()> {
        self.with(|w| {
            queue!(w, cursor::MoveToColumn(0), terminal::Clear(terminal::ClearType::CurrentLine))?;
            write!(w, "{}", text.dim())
        })
    }

    pub fn clear_line(&self) -> io::Result<()> {
        self.with(|w| queue!(w, cursor::MoveToColumn(0), terminal::Clear(terminal::ClearType::CurrentLine)))
    }

    pub fn newline(&self) -> io::Result<()> {
        self.with(|w| writeln!(w))
    }
}

/// Byte sink behind [`SharedWriter::capture`].
#[derive(Clone, Default)]
pub struct CaptureBuffer(Arc<Mutex<Vec<u8>>>);

impl CaptureBuffer {
    pub fn contents(&self) -> String {
        let bytes = self.0.lock().unwrap_or_else(|e| e.into_inner());
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl Write for CaptureBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap_or_else(|e| e.into_inner()).extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> { Ok(()) }
}

/// Raw mode for the lifetime of the guard.
pub struct RawModeGuard(());

impl RawModeGuard {
    pub fn enable() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(Self(()))
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}
