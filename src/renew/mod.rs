// Credential renewal - schedule and external commands

pub mod command;
pub mod schedule;

pub use command::{CommandSpec, RenewalOutcome, Renewer};
pub use schedule::{RenewalSchedule, Tick};
