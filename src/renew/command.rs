use crate::error::{AuthdError, Result};
use std::fmt;
use std::process::Stdio;
use tokio::process::Command;

/// An external program plus its fixed arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    program: String,
    args: Vec<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Build from a `[program, args...]` list as found in the config file
    pub fn from_argv(argv: &[String]) -> Result<Self> {
        let (program, args) = argv.split_first().ok_or_else(|| {
            AuthdError::ConfigValidationError("command must name a program".to_string())
        })?;
        Ok(Self::new(program.clone(), args.iter().cloned()))
    }

    /// Run to completion with all output discarded; `true` on exit status 0.
    ///
    /// There is no timeout: a command that never exits stalls the caller.
    /// Dropping the future kills the command.
    pub async fn run_quiet(&self) -> bool {
        let status = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .status()
            .await;

        match status {
            Ok(status) if status.success() => true,
            Ok(status) => {
                tracing::debug!("{} exited with {}", self, status);
                false
            }
            Err(e) => {
                tracing::warn!("Failed to run {}: {}", self, e);
                false
            }
        }
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Outcome of one renewal attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenewalOutcome {
    Success,
    Failure,
}

/// Refreshes the ticket and then the token derived from it
#[derive(Debug, Clone)]
pub struct Renewer {
    ticket: CommandSpec,
    token: CommandSpec,
}

impl Renewer {
    pub fn new(ticket: CommandSpec, token: CommandSpec) -> Self {
        Self { ticket, token }
    }

    /// Renew the ticket; derive a fresh token only if that succeeded.
    ///
    /// The ticket renewal alone decides the outcome.
    pub async fn renew(&self) -> RenewalOutcome {
        tracing::debug!("Renewing ticket: {}", self.ticket);
        if !self.ticket.run_quiet().await {
            tracing::warn!("Ticket renewal failed; retrying at the next interval");
            return RenewalOutcome::Failure;
        }

        if !self.token.run_quiet().await {
            tracing::warn!("Token derivation failed: {}", self.token);
        }

        tracing::info!("Credentials renewed");
        RenewalOutcome::Success
    }
}
