// PID file store - one daemon per (owner, session)

use crate::error::{AuthdError, Result};
use crate::session::process_exists;
use std::fs::{self, DirBuilder, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

#[cfg(unix)]
use std::os::unix::fs::{DirBuilderExt, OpenOptionsExt};

/// Prefix of the per-owner directory under the runtime root
const DIR_PREFIX: &str = "authd-";

/// Result of trying to take ownership of a session's pidfile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Claim {
    /// The record now holds our pid
    Claimed,
    /// Another daemon's record was already there; 0 when its content
    /// could not be read as a pid
    AlreadyOwned(u32),
}

/// A session's pidfile: `<root>/authd-<owner>/<token>`.
///
/// Its existence is what marks a session as served. Creation is exclusive,
/// so the filesystem decides which of several racing daemons wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PidFile {
    path: PathBuf,
}

impl PidFile {
    /// Derive the pidfile location for `owner` and `token` under `root`.
    ///
    /// A relative `root` is resolved against the current directory now, so
    /// the path stays valid after the daemon changes directory to `/`.
    pub fn locate(root: &Path, owner: &str, token: &str) -> Result<Self> {
        if owner.is_empty() || owner.contains('/') {
            return Err(AuthdError::PidFile(format!("Invalid owner name: {:?}", owner)));
        }
        if token.is_empty() || token.contains('/') {
            return Err(AuthdError::PidFile(format!("Invalid session token: {:?}", token)));
        }

        let root = if root.is_absolute() {
            root.to_path_buf()
        } else {
            std::env::current_dir()
                .map_err(|e| {
                    AuthdError::PidFile(format!("Cannot resolve {}: {}", root.display(), e))
                })?
                .join(root)
        };

        Ok(Self {
            path: root.join(format!("{}{}", DIR_PREFIX, owner)).join(token),
        })
    }

    /// Like [`PidFile::locate`], reading the owner from the environment
    /// variable `owner_env`
    pub fn locate_from_env(root: &Path, owner_env: &str, token: &str) -> Result<Self> {
        let owner = std::env::var(owner_env)
            .ok()
            .filter(|owner| !owner.is_empty())
            .ok_or_else(|| AuthdError::MissingOwner(owner_env.to_string()))?;
        Self::locate(root, &owner, token)
    }

    /// Claim the record for the current process
    pub fn claim(&self) -> Result<Claim> {
        self.claim_for(std::process::id())
    }

    /// Claim the record on behalf of `pid`.
    ///
    /// Creates the owner directory (mode 0700) when missing, then publishes
    /// the record (mode 0600) holding `pid`. The record is written to a
    /// staging file and hard-linked into place, so it appears exclusively
    /// and already complete. If a record exists, reports the pid stored in it.
    pub fn claim_for(&self, pid: u32) -> Result<Claim> {
        // A daemon shutting down at the same moment can remove the record
        // (and the owner directory) between our attempt and the read.
        for _ in 0..2 {
            self.ensure_dir()?;
            match self.publish(pid) {
                Ok(()) => {
                    tracing::debug!("Claimed {} for pid {}", self.path.display(), pid);
                    return Ok(Claim::Claimed);
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => match self.read_owner_pid() {
                    Ok(Some(owner)) => return Ok(Claim::AlreadyOwned(owner)),
                    Ok(None) => {}
                    Err(AuthdError::InvalidPidFile { reason, .. }) => {
                        // Still a record; its owner is just unknown
                        tracing::warn!("Unreadable record {}: {}", self.path.display(), reason);
                        return Ok(Claim::AlreadyOwned(0));
                    }
                    Err(e) => return Err(e),
                },
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(AuthdError::PidFile(format!(
                        "Failed to create {}: {}",
                        self.path.display(),
                        e
                    )))
                }
            }
        }

        Err(AuthdError::PidFile(format!(
            "{} keeps appearing and disappearing",
            self.path.display()
        )))
    }

    /// Read the pid recorded in the file, `None` when there is no record
    pub fn read_owner_pid(&self) -> Result<Option<u32>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(AuthdError::PidFile(format!(
                    "Failed to read {}: {}",
                    self.path.display(),
                    e
                )))
            }
        };

        let line = content.lines().next().unwrap_or("").trim();
        line.parse::<u32>()
            .map(Some)
            .map_err(|e| AuthdError::InvalidPidFile {
                path: self.path.clone(),
                reason: format!("{:?}: {}", line, e),
            })
    }

    /// Remove the record, then the owner directory if that left it empty.
    ///
    /// Releasing a record that does not exist is not an error.
    pub fn release(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!("Removed {}", self.path.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                return Err(AuthdError::PidFile(format!(
                    "Failed to remove {}: {}",
                    self.path.display(),
                    e
                )))
            }
        }

        // Other sessions of the same owner may still have records here
        if let Some(dir) = self.path.parent() {
            self.sweep_staging(dir);
            let _ = fs::remove_dir(dir);
        }

        Ok(())
    }

    /// Check if the PID file exists
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Get the path to the PID file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn ensure_dir(&self) -> Result<()> {
        let Some(dir) = self.path.parent() else {
            return Ok(());
        };

        let mut builder = DirBuilder::new();
        #[cfg(unix)]
        builder.mode(0o700);

        match builder.create(dir) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(()),
            Err(e) => Err(AuthdError::PidFile(format!(
                "Failed to create {}: {}",
                dir.display(),
                e
            ))),
        }
    }

    fn staging_path(&self, pid: u32) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.path.with_file_name(format!(".{}.{}.tmp", name, pid))
    }

    /// Remove staging files of this session left by processes that died
    /// before publishing
    fn sweep_staging(&self, dir: &Path) {
        let Some(name) = self.path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            return;
        };
        let prefix = format!(".{}.", name);
        let Ok(entries) = fs::read_dir(dir) else {
            return;
        };

        for entry in entries.flatten() {
            let file_name = entry.file_name();
            let file_name = file_name.to_string_lossy();
            let Some(pid) = file_name
                .strip_prefix(&prefix)
                .and_then(|rest| rest.strip_suffix(".tmp"))
                .and_then(|pid| pid.parse::<u32>().ok())
            else {
                continue;
            };
            if !process_exists(pid) {
                tracing::debug!("Removing leftover staging file {}", file_name);
                let _ = fs::remove_file(entry.path());
            }
        }
    }

    fn publish(&self, pid: u32) -> std::io::Result<()> {
        let staging = self.staging_path(pid);

        let written = (|| {
            let mut options = OpenOptions::new();
            options.write(true).create(true).truncate(true);
            #[cfg(unix)]
            options.mode(0o600);
            let mut file = options.open(&staging)?;
            writeln!(file, "{}", pid)?;
            file.sync_all()
        })();

        let linked = written.and_then(|_| fs::hard_link(&staging, &self.path));
        let _ = fs::remove_file(&staging);
        linked
    }
}
