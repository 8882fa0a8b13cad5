// Session identity and liveness checks

use crate::error::{AuthdError, Result};
use std::path::PathBuf;

/// The session this daemon serves: the session leader's pid and the
/// command line it had when the daemon started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionHandle {
    pid: i32,
    fingerprint: Vec<u8>,
}

impl SessionHandle {
    /// Build a handle from an already-known fingerprint
    pub fn new(pid: i32, fingerprint: impl Into<Vec<u8>>) -> Self {
        Self {
            pid,
            fingerprint: fingerprint.into(),
        }
    }

    /// Capture the current command line of `pid` as the fingerprint.
    ///
    /// Fails if the process is gone or its command line is unreadable;
    /// without it the daemon has nothing to watch.
    pub fn capture(pid: i32) -> Result<Self> {
        let fingerprint =
            read_cmdline(pid).map_err(|source| AuthdError::CommandLine { pid, source })?;
        Ok(Self { pid, fingerprint })
    }

    pub fn pid(&self) -> i32 {
        self.pid
    }

    pub fn fingerprint(&self) -> &[u8] {
        &self.fingerprint
    }

    /// The token naming this session's pidfile
    pub fn token(&self) -> String {
        self.pid.to_string()
    }
}

/// Session id of the calling process
#[cfg(unix)]
pub fn current_session_id() -> Result<i32> {
    nix::unistd::getsid(None)
        .map(|pid| pid.as_raw())
        .map_err(|e| AuthdError::SessionLookup(e.to_string()))
}

#[cfg(not(unix))]
pub fn current_session_id() -> Result<i32> {
    Err(AuthdError::SessionLookup(
        "Sessions are only supported on Unix systems".to_string(),
    ))
}

fn cmdline_path(pid: i32) -> PathBuf {
    PathBuf::from(format!("/proc/{}/cmdline", pid))
}

/// Raw command line bytes of `pid`, NUL separators included
pub fn read_cmdline(pid: i32) -> std::io::Result<Vec<u8>> {
    std::fs::read(cmdline_path(pid))
}

/// Watches one session for its end.
///
/// Process ids are recycled, so a live pid alone does not prove the
/// session is still there; the command line must match as well.
#[derive(Debug, Default)]
pub struct SessionMonitor;

impl SessionMonitor {
    pub fn new() -> Self {
        Self
    }

    /// `true` only while the session pid exists, is signalable by us and
    /// still carries the captured command line
    pub fn is_alive(&self, handle: &SessionHandle) -> bool {
        if !probe(handle.pid) {
            tracing::debug!("Session process {} no longer reachable", handle.pid);
            return false;
        }

        match read_cmdline(handle.pid) {
            Ok(current) if current == handle.fingerprint => true,
            Ok(_) => {
                tracing::info!(
                    "Process {} no longer matches the captured session command line",
                    handle.pid
                );
                false
            }
            Err(e) => {
                tracing::debug!("Cannot re-read command line of {}: {}", handle.pid, e);
                false
            }
        }
    }
}

/// Zero-signal probe: does `pid` exist and may we signal it
#[cfg(unix)]
fn probe(pid: i32) -> bool {
    use nix::unistd::Pid;

    if pid <= 0 {
        return false;
    }
    nix::sys::signal::kill(Pid::from_raw(pid), None).is_ok()
}

#[cfg(not(unix))]
fn probe(_pid: i32) -> bool {
    false
}

/// Whether `pid` currently names a live process, regardless of owner
#[cfg(unix)]
pub fn process_exists(pid: u32) -> bool {
    use nix::errno::Errno;
    use nix::unistd::Pid;

    let Ok(raw) = i32::try_from(pid) else {
        return false;
    };
    if raw <= 0 {
        return false;
    }
    match nix::sys::signal::kill(Pid::from_raw(raw), None) {
        Ok(()) => true,
        Err(Errno::EPERM) => true, // Exists but belongs to someone else
        Err(_) => false,
    }
}

#[cfg(not(unix))]
pub fn process_exists(_pid: u32) -> bool {
    true
}
