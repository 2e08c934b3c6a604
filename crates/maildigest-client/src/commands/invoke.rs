//! `maildigest invoke`: the scheduled-job entry point.

use std::ffi::OsString;
use std::path::PathBuf;

use maildigest_core::{DigestWindow, TracingOutputFormat};
use maildigest_runner::Invocation;

use crate::cli::Cli;
use crate::error::{ClientError, ClientResult};
use crate::settings::Settings;

/// Global flags passed on to the child `run`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChildFlags {
    pub config: Option<PathBuf>,
    pub debug: bool,
    pub log_format: Option<TracingOutputFormat>,
}

impl ChildFlags {
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            config: cli.config.clone(),
            debug: cli.debug,
            log_format: cli.log_format,
        }
    }

    /// Arguments placed before `run`.
    pub fn args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = Vec::new();
        if let Some(ref path) = self.config {
            args.push("--config".into());
            args.push(path.as_os_str().to_owned());
        }
        if self.debug {
            args.push("--debug".into());
        }
        if let Some(format) = self.log_format {
            args.push("--log-format".into());
            args.push(format.as_str().into());
        }
        args
    }
}

/// Runs `maildigest run <window>` as a child process with output appended
/// to `cron_<window>.log`, and fails with the child's exit code.
pub async fn invoke(
    settings: &Settings,
    window: Option<&str>,
    log_dir: Option<PathBuf>,
    flags: &ChildFlags,
) -> ClientResult<()> {
    let window = DigestWindow::from_label(window);
    let program = std::env::current_exe()?;
    let invocation = invocation(program, window, settings, log_dir, flags);

    let outcome = invocation.run().await?;
    if outcome.success() {
        Ok(())
    } else {
        Err(ClientError::ChildFailed(outcome.exit_code))
    }
}

fn invocation(
    program: PathBuf,
    window: DigestWindow,
    settings: &Settings,
    log_dir: Option<PathBuf>,
    flags: &ChildFlags,
) -> Invocation {
    Invocation::new(program, window)
        .with_profile(settings.profile.clone())
        .with_log_dir(log_dir.unwrap_or_else(|| settings.log_dir.clone()))
        .with_leading_args(flags.args())
}
