// Detaching from the invoking terminal

use crate::error::{AuthdError, Result};
use std::fs::File;
use std::io::Write;

/// Lets the background child report its startup result to the parent,
/// which is still waiting on the operator's terminal.
#[derive(Debug)]
pub struct Readiness {
    pipe: Option<File>,
}

impl Readiness {
    /// No parent is waiting (foreground mode)
    pub fn foreground() -> Self {
        Self { pipe: None }
    }

    /// Startup succeeded; the parent exits with status 0
    pub fn ready(self) {
        self.send(0);
    }

    /// Startup failed; the parent exits with status 1
    pub fn failed(self) {
        self.send(1);
    }

    fn send(mut self, status: u8) {
        if let Some(mut pipe) = self.pipe.take() {
            let _ = pipe.write_all(&[status]);
        }
    }
}

/// Fork into the background.
///
/// Returns in the child only. The parent waits until the child calls
/// [`Readiness::ready`] or [`Readiness::failed`] (or exits) and then exits
/// itself with the matching status. The child keeps the caller's session
/// and standard streams so startup errors still reach the terminal; call
/// [`detach_stdio`] once startup is complete.
#[cfg(unix)]
pub fn daemonize() -> Result<Readiness> {
    use nix::unistd::{fork, pipe, ForkResult};
    use std::io::Read;

    let (read_end, write_end) =
        pipe().map_err(|e| AuthdError::Daemonize(format!("pipe failed: {}", e)))?;

    // SAFETY: no runtime or other threads exist yet; the child continues
    // with a single thread.
    match unsafe { fork() } {
        Ok(ForkResult::Parent { child }) => {
            drop(write_end);
            let mut status = [1u8];
            let mut pipe = File::from(read_end);
            let code = match pipe.read(&mut status) {
                Ok(1) => i32::from(status[0]),
                _ => {
                    tracing::debug!("Background process {} exited during startup", child);
                    1
                }
            };
            std::process::exit(code);
        }
        Ok(ForkResult::Child) => {
            drop(read_end);
            Ok(Readiness {
                pipe: Some(File::from(write_end)),
            })
        }
        Err(e) => Err(AuthdError::Daemonize(format!("fork failed: {}", e))),
    }
}

#[cfg(not(unix))]
pub fn daemonize() -> Result<Readiness> {
    Err(AuthdError::Daemonize(
        "Daemonization is only supported on Unix systems".to_string(),
    ))
}

/// Move to `/` and point stdin, stdout and stderr at /dev/null
#[cfg(unix)]
pub fn detach_stdio() -> Result<()> {
    use nix::libc;
    use std::fs::OpenOptions;
    use std::os::unix::io::AsRawFd;

    // Change working directory to root to avoid keeping any directory in use
    std::env::set_current_dir("/")
        .map_err(|e| AuthdError::Daemonize(format!("Failed to change directory to /: {}", e)))?;

    let devnull = OpenOptions::new()
        .read(true)
        .write(true)
        .open("/dev/null")
        .map_err(|e| AuthdError::Daemonize(format!("Failed to open /dev/null: {}", e)))?;
    let devnull_fd = devnull.as_raw_fd();

    for target in [libc::STDIN_FILENO, libc::STDOUT_FILENO, libc::STDERR_FILENO] {
        // SAFETY: both descriptors are open for the duration of the call.
        if unsafe { libc::dup2(devnull_fd, target) } == -1 {
            return Err(AuthdError::Daemonize(format!(
                "Failed to redirect fd {}: {}",
                target,
                std::io::Error::last_os_error()
            )));
        }
    }

    Ok(())
}

#[cfg(not(unix))]
pub fn detach_stdio() -> Result<()> {
    Ok(())
}
