//! OS interrupt (SIGINT / Ctrl+C) forwarding into the exit debounce.

use crate::debounce::{ExitDebounce, InterruptOutcome};
use futures::stream::BoxStream;
use futures::{Stream, StreamExt};
use std::io;
use tokio::task::JoinHandle;
use tracing::debug;

/// Forward every OS interrupt to `debounce` for the rest of the process.
///
/// The handler is installed before this returns, replacing the default
/// "terminate on SIGINT" behavior, so the debounce is the only way an
/// interrupt ends the session.
pub fn forward_os_interrupts(debounce: ExitDebounce) -> io::Result<JoinHandle<()>> {
    Ok(forward_interrupts(debounce, os_interrupts()?))
}

/// Feed each item of `interrupts` to `debounce` until it confirms exit or
/// the stream ends.
pub fn forward_interrupts<S>(debounce: ExitDebounce, interrupts: S) -> JoinHandle<()>
where
    S: Stream<Item = ()> + Send + 'static,
{
    tokio::spawn(async move {
        tokio::pin!(interrupts);
        while interrupts.next().await.is_some() {
            match debounce.interrupt() {
                InterruptOutcome::Armed => debug!("SIGINT: exit confirmation armed"),
                InterruptOutcome::Terminated => {
                    debug!("SIGINT: exit confirmed");
                    break;
                }
            }
        }
    })
}

#[cfg(unix)]
fn os_interrupts() -> io::Result<BoxStream<'static, ()>> {
    use tokio::signal::unix::{signal, SignalKind};
    let mut sigint = signal(SignalKind::interrupt())?;
    Ok(futures::stream::poll_fn(move |cx| sigint.poll_recv(cx)).boxed())
}

#[cfg(not(unix))]
fn os_interrupts() -> io::Result<BoxStream<'static, ()>> {
    Ok(async_stream::stream! {
        while tokio::signal::ctrl_c().await.is_ok() {
            yield ();
        }
    }
    .boxed())
}
