// Library exports for authd, the per-session credential renewal daemon

pub mod cli;
pub mod config;
pub mod daemon;
pub mod error;
pub mod logs;
pub mod renew;
pub mod session;
