// CLI module - argument parsing and the daemon startup sequence

mod output;

pub use output::print_error;

use crate::config::Config;
use crate::daemon::{
    daemonize, detach_stdio, ignore_hangup, shutdown_channel, Claim, PidFile, Readiness,
    Supervisor,
};
use crate::error::Result;
use crate::logs;
use crate::session::{current_session_id, process_exists, SessionHandle};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

/// authd - keep session credentials fresh
#[derive(Parser, Debug)]
#[command(name = "authd")]
#[command(version, about, long_about = LONG_ABOUT)]
pub struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Stay in the foreground instead of detaching
    #[arg(short, long)]
    pub foreground: bool,

    /// Watch this process instead of the current session leader
    #[arg(short, long, value_name = "PID")]
    pub session_pid: Option<i32>,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long)]
    pub verbose: bool,
}

const LONG_ABOUT: &str = "authd is a daemon responsible for keeping kerberos and AFS tokens \
fresh for the duration of their lifetime or the session, whichever is shorter.";

impl Cli {
    /// Parse the command line and run the daemon.
    ///
    /// Help and version output exit with success; any other usage error
    /// exits with failure.
    pub fn run() -> Result<ExitCode> {
        let cli = match Cli::try_parse() {
            Ok(cli) => cli,
            Err(e) => {
                let code = if e.use_stderr() {
                    ExitCode::FAILURE
                } else {
                    ExitCode::SUCCESS
                };
                let _ = e.print();
                return Ok(code);
            }
        };
        cli.execute()
    }

    /// Start the daemon for the selected session
    pub fn execute(&self) -> Result<ExitCode> {
        let config = Config::load(self.config.as_deref())?;
        logs::init(config.log_file.as_deref(), self.verbose)?;

        let session_pid = match self.session_pid {
            Some(pid) => pid,
            None => current_session_id()?,
        };
        let session = SessionHandle::capture(session_pid)?;
        let pid_file =
            PidFile::locate_from_env(&config.runtime_dir, &config.owner_env, &session.token())?;
        let mut supervisor = Supervisor::from_config(&config, session, pid_file)?;

        // Fork before any runtime threads exist
        let readiness = self.detach(&mut supervisor)?;
        ignore_hangup()?;

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        runtime.block_on(self.serve(supervisor, readiness))
    }

    /// Fork into the background unless running in the foreground
    fn detach(&self, supervisor: &mut Supervisor) -> Result<Readiness> {
        if self.foreground {
            tracing::debug!("Staying in the foreground");
            return Ok(Readiness::foreground());
        }

        let readiness = daemonize()?;
        supervisor.mark_detached();
        Ok(readiness)
    }

    async fn serve(&self, mut supervisor: Supervisor, readiness: Readiness) -> Result<ExitCode> {
        let shutdown = shutdown_channel()?;

        if let Claim::AlreadyOwned(pid) = supervisor.claim()? {
            output::print_already_running(pid, supervisor.pid_file().path(), process_exists(pid));
            readiness.failed();
            return Ok(ExitCode::FAILURE);
        }

        output::print_started(std::process::id(), supervisor.session().pid());

        if !self.foreground {
            if let Err(e) = detach_stdio() {
                let _ = supervisor.pid_file().release();
                return Err(e);
            }
        }
        readiness.ready();

        let summary = supervisor.run(shutdown).await?;
        tracing::info!(
            "authd exiting: {} ({} renewals, {} failed)",
            summary.reason,
            summary.renewals,
            summary.failed_renewals
        );

        Ok(ExitCode::SUCCESS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn test_no_arguments() {
        let cli = Cli::try_parse_from(["authd"]).unwrap();
        assert!(cli.config.is_none());
        assert!(!cli.foreground);
        assert!(cli.session_pid.is_none());
    }

    #[test]
    fn test_all_options() {
        let cli = Cli::try_parse_from([
            "authd",
            "--config",
            "/etc/authd.toml",
            "-f",
            "--session-pid",
            "1234",
            "-v",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/etc/authd.toml")));
        assert!(cli.foreground);
        assert_eq!(cli.session_pid, Some(1234));
        assert!(cli.verbose);
    }

    #[test]
    fn test_help_is_not_an_error() {
        let err = Cli::try_parse_from(["authd", "--help"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DisplayHelp);
        assert!(!err.use_stderr());

        let err = Cli::try_parse_from(["authd", "-h"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_foreground_stays_attached() {
        use crate::daemon::Phase;
        use crate::renew::{CommandSpec, RenewalSchedule, Renewer};
        use std::time::Duration;

        let dir = tempfile::TempDir::new().unwrap();
        let session = SessionHandle::new(1, b"init".to_vec());
        let pid_file = PidFile::locate(dir.path(), "tester", "1").unwrap();
        let mut supervisor = Supervisor::new(
            session,
            pid_file,
            RenewalSchedule::new(Duration::from_secs(60), Duration::from_secs(3600)),
            Renewer::new(
                CommandSpec::new("true", Vec::<String>::new()),
                CommandSpec::new("true", Vec::<String>::new()),
            ),
        );

        let cli = Cli::try_parse_from(["authd", "--foreground"]).unwrap();
        cli.detach(&mut supervisor).unwrap().ready();
        assert_eq!(supervisor.phase(), Phase::Starting);
    }

    #[test]
    fn test_unknown_argument_rejected() {
        let err = Cli::try_parse_from(["authd", "--bogus"]).unwrap_err();
        assert!(err.use_stderr());

        let err = Cli::try_parse_from(["authd", "extra"]).unwrap_err();
        assert!(err.use_stderr());
    }
}
