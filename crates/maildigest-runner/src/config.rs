//! Run configuration.
//!
//! Assembled once by the binary from flags, environment, env files and
//! `config.toml`, then passed down. Nothing below this reads the
//! environment.

use std::path::PathBuf;

use chrono::{DateTime, Local, NaiveDate, Utc};
use maildigest_core::{
    DigestWindow, EmailFormat, ReplyLinkMode, TimeWindow, UserProfile, WindowHours, WindowTimezone,
};

use crate::error::{RunnerError, RunnerResult};

/// What to do with the rendered digest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Delivery {
    /// Send it to the recipient.
    #[default]
    Send,
    /// Return the HTML without sending.
    DryRun,
}

/// Configuration for one digest run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Profile whose mailbox and token are used.
    pub profile: Option<UserProfile>,
    /// Window to cover.
    pub window: DigestWindow,
    /// Morning/afternoon boundary hours.
    pub hours: WindowHours,
    /// Timezone the boundary hours are in.
    pub timezone: WindowTimezone,
    /// Digest recipient.
    pub recipient: Option<String>,
    /// HTML layout.
    pub email_format: EmailFormat,
    /// Reply button link style.
    pub link_mode: ReplyLinkMode,
    /// Send or dry-run.
    pub delivery: Delivery,
    /// Directory holding the run lock.
    pub state_dir: PathBuf,
    /// Whether to take the per-profile run lock.
    pub use_lock: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            profile: None,
            window: DigestWindow::Daily,
            hours: WindowHours::default(),
            timezone: WindowTimezone::Utc,
            recipient: None,
            email_format: EmailFormat::Modern,
            link_mode: ReplyLinkMode::OutlookOffice,
            delivery: Delivery::Send,
            state_dir: std::env::temp_dir(),
            use_lock: true,
        }
    }
}

impl RunConfig {
    /// Creates a configuration for `window` with defaults elsewhere.
    pub fn new(window: DigestWindow) -> Self {
        Self {
            window,
            ..Default::default()
        }
    }

    pub fn with_profile(mut self, profile: Option<UserProfile>) -> Self {
        self.profile = profile;
        self
    }

    pub fn with_recipient(mut self, recipient: impl Into<String>) -> Self {
        self.recipient = Some(recipient.into());
        self
    }

    pub fn with_hours(mut self, hours: WindowHours) -> Self {
        self.hours = hours;
        self
    }

    pub fn with_timezone(mut self, timezone: WindowTimezone) -> Self {
        self.timezone = timezone;
        self
    }

    pub fn with_email_format(mut self, format: EmailFormat) -> Self {
        self.email_format = format;
        self
    }

    pub fn with_link_mode(mut self, mode: ReplyLinkMode) -> Self {
        self.link_mode = mode;
        self
    }

    pub fn with_delivery(mut self, delivery: Delivery) -> Self {
        self.delivery = delivery;
        self
    }

    pub fn with_state_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.state_dir = dir.into();
        self
    }

    pub fn with_lock(mut self, use_lock: bool) -> Self {
        self.use_lock = use_lock;
        self
    }

    /// Checks the configuration before any network call is made.
    pub fn validate(&self) -> RunnerResult<()> {
        self.hours.validate()?;
        if self.delivery == Delivery::Send && self.recipient().is_none() {
            return Err(RunnerError::config("Missing TO_EMAIL (digest recipient)"));
        }
        Ok(())
    }

    /// Non-blank recipient address.
    pub fn recipient(&self) -> Option<&str> {
        self.recipient.as_deref().map(str::trim).filter(|r| !r.is_empty())
    }

    /// Resolves the window relative to `now`.
    pub fn time_window(&self, now: DateTime<Utc>) -> RunnerResult<TimeWindow> {
        Ok(self.window.resolve_in(now, self.timezone, self.hours)?)
    }

    /// Calendar date shown in the subject line.
    pub fn digest_date(&self, now: DateTime<Utc>) -> NaiveDate {
        match self.timezone {
            WindowTimezone::Utc => now.date_naive(),
            WindowTimezone::Local => now.with_timezone(&Local).date_naive(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn send_requires_recipient() {
        let config = RunConfig::new(DigestWindow::Morning);
        assert!(matches!(config.validate(), Err(RunnerError::Config { .. })));

        let config = config.with_recipient("  ");
        assert!(config.validate().is_err());

        let config = config.with_recipient("me@example.com");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn dry_run_needs_no_recipient() {
        let config = RunConfig::new(DigestWindow::Daily).with_delivery(Delivery::DryRun);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn invalid_hours_rejected() {
        let config = RunConfig::new(DigestWindow::Morning)
            .with_recipient("me@example.com")
            .with_hours(WindowHours {
                split_hour: 15,
                close_hour: 14,
            });
        assert!(matches!(config.validate(), Err(RunnerError::Window(_))));
    }

    #[test]
    fn resolves_window_and_date() {
        let now = Utc.with_ymd_and_hms(2025, 3, 12, 9, 30, 0).unwrap();
        let config = RunConfig::new(DigestWindow::Afternoon);
        let window = config.time_window(now).unwrap();
        assert_eq!(window.start, Utc.with_ymd_and_hms(2025, 3, 12, 9, 0, 0).unwrap());
        assert_eq!(window.end, Utc.with_ymd_and_hms(2025, 3, 12, 14, 0, 0).unwrap());
        assert_eq!(config.digest_date(now), NaiveDate::from_ymd_opt(2025, 3, 12).unwrap());
    }
}
