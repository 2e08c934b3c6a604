//! Scheduled-trigger invoker.
//!
//! Turns a scheduler tick into `maildigest run <window>` with the profile
//! in the child's environment and both output streams appended to
//! `<log_dir>/cron_<window>.log`. The child's exit code is returned as is;
//! nothing is retried.

use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};

use chrono::Utc;
use maildigest_core::{DigestWindow, UserProfile};
use maildigest_core::profile::USER_PROFILE_ENV;
use tokio::process::Command;
use tracing::{error, info};

use crate::error::{RunnerError, RunnerResult};

/// One scheduled invocation of the digest program.
#[derive(Debug, Clone)]
pub struct Invocation {
    program: PathBuf,
    leading_args: Vec<OsString>,
    profile: Option<UserProfile>,
    window: DigestWindow,
    log_dir: PathBuf,
}

/// Result of a finished invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationOutcome {
    pub exit_code: i32,
    pub log_path: PathBuf,
}

impl InvocationOutcome {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

impl Invocation {
    pub fn new(program: impl Into<PathBuf>, window: DigestWindow) -> Self {
        Self {
            program: program.into(),
            leading_args: Vec::new(),
            profile: None,
            window,
            log_dir: PathBuf::from("."),
        }
    }

    pub fn with_profile(mut self, profile: Option<UserProfile>) -> Self {
        self.profile = profile;
        self
    }

    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = dir.into();
        self
    }

    /// Arguments placed before `run <window>` (e.g. `--config FILE`).
    pub fn with_leading_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.leading_args = args.into_iter().map(Into::into).collect();
        self
    }

    /// `<log_dir>/cron_<window>.log`.
    pub fn log_path(&self) -> PathBuf {
        log_path(&self.log_dir, self.window)
    }

    /// Full argument list passed to the program.
    pub fn args(&self) -> Vec<OsString> {
        let mut args = self.leading_args.clone();
        args.push("run".into());
        if let Some(label) = self.window.label() {
            args.push(label.into());
        }
        args
    }

    /// Runs the program to completion and returns its exit code.
    pub async fn run(&self) -> RunnerResult<InvocationOutcome> {
        let log_path = self.log_path();
        let mut log = open_log(&log_path)?;

        let profile = self.profile.as_ref().map(|p| p.name()).unwrap_or("-");
        writeln!(
            log,
            "=== {} profile={} window={} ===",
            Utc::now().format("%Y-%m-%dT%H:%M:%SZ"),
            profile,
            self.window
        )?;
        log.flush()?;

        let mut command = Command::new(&self.program);
        command
            .args(self.args())
            .stdin(Stdio::null())
            .stdout(Stdio::from(log.try_clone()?))
            .stderr(Stdio::from(log.try_clone()?));
        if let Some(ref p) = self.profile {
            command.env(USER_PROFILE_ENV, p.name());
        }

        info!(program = %self.program.display(), window = %self.window, log = %log_path.display(), "invoking digest run");

        let status = match command.status().await {
            Ok(status) => status,
            Err(e) => {
                let program = self.program.display().to_string();
                error!(%program, error = %e, "failed to start digest run");
                writeln!(log, "failed to start {program}: {e}")?;
                return Err(RunnerError::Spawn { program, source: e });
            }
        };

        let exit_code = exit_code(status);
        if exit_code == 0 {
            info!(window = %self.window, "digest run finished");
        } else {
            error!(window = %self.window, exit_code, "digest run failed");
        }

        Ok(InvocationOutcome { exit_code, log_path })
    }
}

/// `cron_<window>.log` under `dir`.
pub fn log_path(dir: &Path, window: DigestWindow) -> PathBuf {
    dir.join(format!("cron_{}.log", window.as_str()))
}

fn open_log(path: &Path) -> RunnerResult<File> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    Ok(OpenOptions::new().create(true).append(true).open(path)?)
}

#[cfg(unix)]
fn exit_code(status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    status
        .code()
        .or_else(|| status.signal().map(|s| 128 + s))
        .unwrap_or(1)
}

#[cfg(not(unix))]
fn exit_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(1)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const SCRIPT: &str = "echo \"args: $* profile: $USER_PROFILE\"; echo warning >&2; exit ${EXIT:-0}";

    fn shell(window: DigestWindow, dir: &Path) -> Invocation {
        Invocation::new("/bin/sh", window)
            .with_leading_args(["-c", SCRIPT, "sh"])
            .with_profile(UserProfile::new("amr"))
            .with_log_dir(dir)
    }

    #[test]
    fn args_for_each_window() {
        let args = |w| Invocation::new("maildigest", w).args();
        assert_eq!(args(DigestWindow::Morning), vec!["run", "morning"]);
        assert_eq!(args(DigestWindow::Afternoon), vec!["run", "afternoon"]);
        assert_eq!(args(DigestWindow::Daily), vec!["run"]);
    }

    #[test]
    fn log_file_per_window() {
        let dir = Path::new("/var/log/maildigest");
        assert_eq!(log_path(dir, DigestWindow::Morning), dir.join("cron_morning.log"));
        assert_eq!(log_path(dir, DigestWindow::Afternoon), dir.join("cron_afternoon.log"));
        assert_eq!(log_path(dir, DigestWindow::Daily), dir.join("cron_daily.log"));
    }

    #[tokio::test]
    async fn appends_output_with_profile() {
        let dir = tempdir().unwrap();
        let outcome = shell(DigestWindow::Morning, dir.path()).run().await.unwrap();

        assert!(outcome.success());
        assert_eq!(outcome.log_path, dir.path().join("cron_morning.log"));
        let log = fs::read_to_string(&outcome.log_path).unwrap();
        assert!(log.contains("profile=amr window=morning ==="));
        assert!(log.contains("args: run morning profile: amr\n"));
        assert!(log.contains("warning\n"));
    }

    #[tokio::test]
    async fn successive_runs_are_appended_in_order() {
        let dir = tempdir().unwrap();
        let first = shell(DigestWindow::Afternoon, dir.path()).with_profile(UserProfile::new("first"));
        let second = shell(DigestWindow::Afternoon, dir.path()).with_profile(UserProfile::new("second"));

        first.run().await.unwrap();
        second.run().await.unwrap();

        let log = fs::read_to_string(dir.path().join("cron_afternoon.log")).unwrap();
        let a = log.find("profile: first").unwrap();
        let b = log.find("profile: second").unwrap();
        assert!(a < b);
        assert_eq!(log.matches("===").count(), 4);
    }

    #[tokio::test]
    async fn propagates_exit_code() {
        let dir = tempdir().unwrap();
        let outcome = Invocation::new("/bin/sh", DigestWindow::Daily)
            .with_leading_args(["-c", "exit 3", "sh"])
            .with_log_dir(dir.path())
            .run()
            .await
            .unwrap();
        assert_eq!(outcome.exit_code, 3);
        assert!(!outcome.success());
        assert!(dir.path().join("cron_daily.log").exists());
    }

    #[tokio::test]
    async fn spawn_failure_is_logged() {
        let dir = tempdir().unwrap();
        let result = Invocation::new(dir.path().join("missing-binary"), DigestWindow::Morning)
            .with_log_dir(dir.path())
            .run()
            .await;

        assert!(matches!(result, Err(RunnerError::Spawn { .. })));
        let log = fs::read_to_string(dir.path().join("cron_morning.log")).unwrap();
        assert!(log.contains("failed to start"));
    }
}
