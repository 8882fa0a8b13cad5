// Signal handling: hangups are ignored, interrupt/terminate request shutdown

use crate::error::{AuthdError, Result};
use std::fmt;
use tokio::sync::oneshot;

/// A termination request delivered by the operating system
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownSignal {
    Interrupt,
    Terminate,
}

impl fmt::Display for ShutdownSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShutdownSignal::Interrupt => write!(f, "SIGINT"),
            ShutdownSignal::Terminate => write!(f, "SIGTERM"),
        }
    }
}

/// Ignore SIGHUP so the daemon outlives the terminal that started it
#[cfg(unix)]
pub fn ignore_hangup() -> Result<()> {
    use nix::sys::signal::{signal, SigHandler, Signal};

    // SAFETY: SigIgn installs no handler code.
    unsafe { signal(Signal::SIGHUP, SigHandler::SigIgn) }
        .map(|_| ())
        .map_err(|e| AuthdError::Signal(format!("Failed to ignore SIGHUP: {}", e)))
}

#[cfg(not(unix))]
pub fn ignore_hangup() -> Result<()> {
    Ok(())
}

/// Listen for SIGTERM and SIGINT.
///
/// Must be called from within a tokio runtime. The handlers are in place
/// when this returns; the first signal received is sent on the channel.
#[cfg(unix)]
pub fn shutdown_channel() -> Result<oneshot::Receiver<ShutdownSignal>> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| AuthdError::Signal(format!("Failed to setup SIGTERM handler: {}", e)))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| AuthdError::Signal(format!("Failed to setup SIGINT handler: {}", e)))?;

    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        let received = tokio::select! {
            _ = sigterm.recv() => ShutdownSignal::Terminate,
            _ = sigint.recv() => ShutdownSignal::Interrupt,
        };
        tracing::info!("Received {}", received);
        let _ = tx.send(received);
    });

    Ok(rx)
}

#[cfg(not(unix))]
pub fn shutdown_channel() -> Result<oneshot::Receiver<ShutdownSignal>> {
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = tx.send(ShutdownSignal::Interrupt);
        }
    });

    Ok(rx)
}
