// Daemon supervisor - lifecycle state machine and main loop

use super::pid::{Claim, PidFile};
use super::signals::ShutdownSignal;
use crate::config::Config;
use crate::error::Result;
use crate::renew::{CommandSpec, RenewalOutcome, RenewalSchedule, Renewer, Tick};
use crate::session::{SessionHandle, SessionMonitor};
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::sleep;
use tracing::{debug, error, info};

/// Lifecycle phase of the daemon
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Starting,
    Detached,
    Running,
    ShuttingDown,
    Terminated,
}

/// Why the main loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// The watched session process is gone or was replaced
    SessionEnded,
    /// A termination signal arrived
    Signal(ShutdownSignal),
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitReason::SessionEnded => write!(f, "session ended"),
            ExitReason::Signal(signal) => write!(f, "received {}", signal),
        }
    }
}

/// What a finished run did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub reason: ExitReason,
    pub renewals: u32,
    pub failed_renewals: u32,
}

/// Keeps one session's credentials fresh until the session ends.
///
/// Owns the pidfile record from a successful [`Supervisor::claim`] until
/// [`Supervisor::run`] returns; the record is released on every exit path
/// of `run`.
pub struct Supervisor {
    session: SessionHandle,
    pid_file: PidFile,
    monitor: SessionMonitor,
    schedule: RenewalSchedule,
    renewer: Renewer,
    phase: Phase,
}

impl Supervisor {
    pub fn new(
        session: SessionHandle,
        pid_file: PidFile,
        schedule: RenewalSchedule,
        renewer: Renewer,
    ) -> Self {
        Self {
            session,
            pid_file,
            monitor: SessionMonitor::new(),
            schedule,
            renewer,
            phase: Phase::Starting,
        }
    }

    /// Build a supervisor with the intervals and commands from `config`
    pub fn from_config(config: &Config, session: SessionHandle, pid_file: PidFile) -> Result<Self> {
        let schedule = RenewalSchedule::new(config.poll_interval(), config.renew_interval());
        let renewer = Renewer::new(
            CommandSpec::from_argv(&config.ticket_command)?,
            CommandSpec::from_argv(&config.token_command)?,
        );
        Ok(Self::new(session, pid_file, schedule, renewer))
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    pub fn pid_file(&self) -> &PidFile {
        &self.pid_file
    }

    /// Record that the process is now running in the background
    pub fn mark_detached(&mut self) {
        self.transition(Phase::Detached);
    }

    /// Claim the session's pidfile for this process
    pub fn claim(&mut self) -> Result<Claim> {
        let claim = self.pid_file.claim()?;
        match claim {
            Claim::Claimed => info!(
                "Serving session {} (pidfile {})",
                self.session.pid(),
                self.pid_file.path().display()
            ),
            Claim::AlreadyOwned(pid) => info!(
                "Session {} is already served by pid {}",
                self.session.pid(),
                pid
            ),
        }
        Ok(claim)
    }

    /// Run until the session ends or `shutdown` fires, then release the
    /// pidfile.
    ///
    /// A shutdown signal interrupts both the sleep between checks and a
    /// renewal in progress. If the sender side is dropped without sending,
    /// the loop keeps running.
    pub async fn run(
        mut self,
        shutdown: oneshot::Receiver<ShutdownSignal>,
    ) -> Result<RunSummary> {
        let shutdown = async move {
            match shutdown.await {
                Ok(signal) => signal,
                Err(_) => std::future::pending().await,
            }
        };
        tokio::pin!(shutdown);

        self.transition(Phase::Running);
        info!(
            "Watching session {} (check every {:?}, renew every {:?})",
            self.session.pid(),
            self.schedule.poll_interval(),
            self.schedule.renew_interval()
        );

        let mut renewals = 0;
        let mut failed_renewals = 0;

        let reason = loop {
            if !self.monitor.is_alive(&self.session) {
                info!("Session {} has ended", self.session.pid());
                break ExitReason::SessionEnded;
            }

            let pause = sleep(self.schedule.poll_interval());
            if let Err(signal) = interruptible(&mut shutdown, pause).await {
                break ExitReason::Signal(signal);
            }

            if self.schedule.tick() == Tick::Renew {
                renewals += 1;
                match interruptible(&mut shutdown, self.renewer.renew()).await {
                    Ok(RenewalOutcome::Success) => {}
                    Ok(RenewalOutcome::Failure) => failed_renewals += 1,
                    Err(signal) => break ExitReason::Signal(signal),
                }
            }
        };

        self.shutdown(reason)?;

        Ok(RunSummary {
            reason,
            renewals,
            failed_renewals,
        })
    }

    fn shutdown(&mut self, reason: ExitReason) -> Result<()> {
        self.transition(Phase::ShuttingDown);
        info!("Shutting down: {}", reason);

        if let Err(e) = self.pid_file.release() {
            error!("Failed to release pidfile: {}", e);
            return Err(e);
        }

        self.transition(Phase::Terminated);
        Ok(())
    }

    fn transition(&mut self, next: Phase) {
        debug!("Daemon phase {:?} -> {:?}", self.phase, next);
        self.phase = next;
    }

    pub fn poll_interval(&self) -> Duration {
        self.schedule.poll_interval()
    }
}

/// Drive `work` to completion unless `shutdown` resolves first
async fn interruptible<S, W>(
    shutdown: &mut S,
    work: W,
) -> std::result::Result<W::Output, ShutdownSignal>
where
    S: Future<Output = ShutdownSignal> + Unpin,
    W: Future,
{
    tokio::select! {
        biased;
        signal = shutdown => Err(signal),
        output = work => Ok(output),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn supervisor(dir: &TempDir) -> Supervisor {
        let session = SessionHandle::capture(std::process::id() as i32).unwrap();
        let pid_file = PidFile::locate(dir.path(), "tester", &session.token()).unwrap();
        let schedule = RenewalSchedule::new(Duration::from_millis(10), Duration::from_secs(3600));
        let renewer = Renewer::new(
            CommandSpec::new("true", Vec::<String>::new()),
            CommandSpec::new("true", Vec::<String>::new()),
        );
        Supervisor::new(session, pid_file, schedule, renewer)
    }

    #[test]
    fn test_from_config() {
        let dir = TempDir::new().unwrap();
        let session = SessionHandle::new(1, b"init".to_vec());
        let pid_file = PidFile::locate(dir.path(), "tester", "1").unwrap();

        let supervisor = Supervisor::from_config(&Config::default(), session, pid_file).unwrap();
        assert_eq!(supervisor.phase(), Phase::Starting);
        assert_eq!(supervisor.poll_interval(), Duration::from_secs(60));
    }

    #[test]
    fn test_claim_transitions() {
        let dir = TempDir::new().unwrap();
        let mut supervisor = supervisor(&dir);

        supervisor.mark_detached();
        assert_eq!(supervisor.phase(), Phase::Detached);
        assert_eq!(supervisor.claim().unwrap(), Claim::Claimed);
        assert!(supervisor.pid_file().exists());
    }

    #[tokio::test]
    async fn test_signal_releases_pidfile() {
        let dir = TempDir::new().unwrap();
        let mut supervisor = supervisor(&dir);
        supervisor.claim().unwrap();
        let pid_file = supervisor.pid_file().clone();

        let (tx, rx) = oneshot::channel();
        tx.send(ShutdownSignal::Terminate).unwrap();

        let summary = supervisor.run(rx).await.unwrap();
        assert_eq!(summary.reason, ExitReason::Signal(ShutdownSignal::Terminate));
        assert!(!pid_file.exists());
    }

    #[tokio::test]
    async fn test_dropped_sender_does_not_stop_loop() {
        let dir = TempDir::new().unwrap();
        let supervisor = supervisor(&dir);

        let (tx, rx) = oneshot::channel::<ShutdownSignal>();
        drop(tx);

        let result = tokio::time::timeout(Duration::from_millis(100), supervisor.run(rx)).await;
        assert!(result.is_err(), "loop should still be running");
    }
}
