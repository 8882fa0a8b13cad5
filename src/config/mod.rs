use crate::error::{AuthdError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Daemon configuration: timing, locations and the renewal commands
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Seconds between liveness checks
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Seconds between credential renewals
    #[serde(default = "default_renew_interval")]
    pub renew_interval_secs: u64,

    /// Root under which the per-owner pidfile directory is created
    #[serde(default = "default_runtime_dir")]
    pub runtime_dir: PathBuf,

    /// Environment variable naming the session owner
    #[serde(default = "default_owner_env")]
    pub owner_env: String,

    /// Ticket renewal command (program followed by fixed arguments)
    #[serde(default = "default_ticket_command")]
    pub ticket_command: Vec<String>,

    /// Token derivation command, run only after a successful ticket renewal
    #[serde(default = "default_token_command")]
    pub token_command: Vec<String>,

    /// Append logs to this file instead of stderr
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

// Default value functions for serde
fn default_poll_interval() -> u64 {
    60
}

fn default_renew_interval() -> u64 {
    3600
}

fn default_runtime_dir() -> PathBuf {
    PathBuf::from("/tmp")
}

fn default_owner_env() -> String {
    "LOGNAME".to_string()
}

fn default_ticket_command() -> Vec<String> {
    vec!["kinit".to_string(), "-R".to_string()]
}

fn default_token_command() -> Vec<String> {
    vec!["aklog".to_string()]
}

impl Default for Config {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            renew_interval_secs: default_renew_interval(),
            runtime_dir: default_runtime_dir(),
            owner_env: default_owner_env(),
            ticket_command: default_ticket_command(),
            token_command: default_token_command(),
            log_file: None,
        }
    }
}

impl Config {
    /// Load and validate a TOML configuration file
    pub fn from_file(path: &Path) -> Result<Config> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AuthdError::ConfigError(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        let config = Self::parse_toml(&contents)?;
        config.validate()?;
        Ok(config)
    }

    fn parse_toml(contents: &str) -> Result<Config> {
        toml::from_str(contents)
            .map_err(|e| AuthdError::InvalidConfig(format!("Failed to parse TOML: {}", e)))
    }

    /// Load the file if one was given, otherwise fall back to defaults
    pub fn load(path: Option<&Path>) -> Result<Config> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Config::default()),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_secs == 0 {
            return Err(AuthdError::ConfigValidationError(
                "poll_interval_secs must be greater than 0".to_string(),
            ));
        }

        if self.renew_interval_secs == 0 {
            return Err(AuthdError::ConfigValidationError(
                "renew_interval_secs must be greater than 0".to_string(),
            ));
        }

        if self.owner_env.trim().is_empty() {
            return Err(AuthdError::ConfigValidationError(
                "owner_env cannot be empty".to_string(),
            ));
        }

        for (field, command) in [
            ("ticket_command", &self.ticket_command),
            ("token_command", &self.token_command),
        ] {
            match command.first() {
                Some(program) if !program.trim().is_empty() => {}
                _ => {
                    return Err(AuthdError::ConfigValidationError(format!(
                        "{} must name a program",
                        field
                    )))
                }
            }
        }

        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn renew_interval(&self) -> Duration {
        Duration::from_secs(self.renew_interval_secs)
    }
}
