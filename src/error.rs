use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the authd session daemon
#[derive(Debug, Error)]
pub enum AuthdError {
    // Session identity errors
    #[error("Cannot determine the session owner: ${0} is not set")]
    MissingOwner(String),

    #[error("Cannot determine the current session id: {0}")]
    SessionLookup(String),

    #[error("Cannot read the command line of process {pid}: {source}")]
    CommandLine {
        pid: i32,
        #[source]
        source: std::io::Error,
    },

    // PID file errors
    #[error("PID file error: {0}")]
    PidFile(String),

    #[error("Invalid PID in {path}: {reason}")]
    InvalidPidFile { path: PathBuf, reason: String },

    #[error("authd appears to already be running in this session with pid {pid}")]
    AlreadyRunning { pid: u32, path: PathBuf },

    // Process plumbing errors
    #[error("Failed to detach from the terminal: {0}")]
    Daemonize(String),

    #[error("Signal error: {0}")]
    Signal(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid configuration file: {0}")]
    InvalidConfig(String),

    #[error("Configuration validation failed: {0}")]
    ConfigValidationError(String),

    // IO errors (automatically converted from std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for authd operations
pub type Result<T> = std::result::Result<T, AuthdError>;
