// Logging setup for the daemon

use crate::error::{AuthdError, Result};
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence; otherwise the level is `info`, or `debug`
/// when `verbose` is set. With a `log_file` the output is appended there,
/// since the detached daemon's stderr points at /dev/null.
pub fn init(log_file: Option<&Path>, verbose: bool) -> Result<()> {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let installed = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| {
                    AuthdError::ConfigError(format!(
                        "Failed to open log file {}: {}",
                        path.display(),
                        e
                    ))
                })?;
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
        }
        None => builder.with_writer(std::io::stderr).try_init(),
    };

    // A subscriber may already be installed (tests, embedding); keep it.
    if let Err(e) = installed {
        tracing::debug!("Tracing subscriber already installed: {}", e);
    }

    Ok(())
}
