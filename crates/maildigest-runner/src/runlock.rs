//! Per-profile run lock.
//!
//! A lock file holding the PID of the running digest. A second `run` for
//! the same profile fails while the holder is alive; files left behind by
//! a dead process, or holding garbage, are replaced. A file naming PID 0 or
//! this process's own PID counts as stale.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process;

use maildigest_core::UserProfile;
use tracing::{debug, info, warn};

use crate::error::{RunnerError, RunnerResult};

/// Held for the duration of a run; removes the lock file on drop.
#[derive(Debug)]
pub struct RunLock {
    path: PathBuf,
}

impl RunLock {
    /// Acquires the lock at `path`.
    pub fn acquire(path: impl Into<PathBuf>) -> RunnerResult<Self> {
        let path = path.into();

        if path.exists() {
            match read_pid(&path) {
                Some(pid) if is_held_by_other(pid) => {
                    return Err(RunnerError::already_running(path.to_string_lossy()));
                }
                Some(pid) => {
                    warn!(path = %path.display(), pid, "removing stale run lock");
                    fs::remove_file(&path)?;
                }
                None => {
                    warn!(path = %path.display(), "removing unreadable run lock");
                    fs::remove_file(&path)?;
                }
            }
        }

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let pid = process::id();
        let mut file = File::create_new(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::AlreadyExists {
                RunnerError::already_running(path.to_string_lossy())
            } else {
                RunnerError::Io(e)
            }
        })?;
        writeln!(file, "{pid}")?;
        file.sync_all()?;

        debug!(path = %path.display(), pid, "acquired run lock");
        Ok(Self { path })
    }

    /// Acquires the lock for `profile` under `state_dir`.
    pub fn for_profile(state_dir: &Path, profile: Option<&UserProfile>) -> RunnerResult<Self> {
        Self::acquire(lock_path(state_dir, profile))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), error = %e, "failed to remove run lock");
        } else {
            info!(path = %self.path.display(), "released run lock");
        }
    }
}

/// `<state_dir>/maildigest-<profile>.lock`, or `maildigest.lock` without a profile.
pub fn lock_path(state_dir: &Path, profile: Option<&UserProfile>) -> PathBuf {
    match profile {
        Some(p) => state_dir.join(format!("maildigest-{}.lock", p.safe_name())),
        None => state_dir.join("maildigest.lock"),
    }
}

fn read_pid(path: &Path) -> Option<u32> {
    fs::read_to_string(path).ok()?.trim().parse().ok()
}

/// Whether `pid` names a live process other than this one.
fn is_held_by_other(pid: u32) -> bool {
    pid != 0 && pid != process::id() && is_process_running(pid)
}

#[cfg(unix)]
fn is_process_running(pid: u32) -> bool {
    let Ok(pid) = libc::pid_t::try_from(pid) else {
        return false;
    };
    // Signal 0 only probes for existence.
    unsafe { libc::kill(pid, 0) == 0 }
}

#[cfg(not(unix))]
fn is_process_running(_pid: u32) -> bool {
    true
}
