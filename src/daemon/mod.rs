// Daemon module - pidfile, detaching, signals and the supervisor loop

pub mod daemonize;
pub mod pid;
pub mod signals;
pub mod supervisor;

pub use daemonize::{daemonize, detach_stdio, Readiness};
pub use pid::{Claim, PidFile};
pub use signals::{ignore_hangup, shutdown_channel, ShutdownSignal};
pub use supervisor::{ExitReason, Phase, RunSummary, Supervisor};
