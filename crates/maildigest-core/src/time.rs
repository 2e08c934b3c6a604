//! Time types for digest runs.
//!
//! This module provides [`DigestWindow`], the named window a scheduled run
//! covers ("morning", "afternoon" or the default daily look-back), and
//! [`TimeWindow`], the concrete UTC range it resolves to at run time.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Local, NaiveDate, SubsecRound, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// Errors produced while parsing or resolving a digest window.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WindowError {
    /// The label is not one of the known windows.
    #[error("unknown digest window '{0}' (expected 'morning' or 'afternoon')")]
    UnknownLabel(String),

    /// The configured boundary hours are out of order or out of range.
    #[error("invalid window hours: split {split}:00 must be before close {close}:00")]
    InvalidHours {
        /// Hour separating the morning and afternoon windows.
        split: u32,
        /// Hour closing the afternoon window.
        close: u32,
    },

    /// A boundary does not exist in the chosen timezone (DST gap).
    #[error("local time {0} does not exist in the configured timezone")]
    NonexistentLocalTime(String),
}

/// A half-open time range `[start, end)` in UTC.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    /// Start of the window (inclusive).
    pub start: DateTime<Utc>,
    /// End of the window (exclusive).
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// Creates a new time window, swapping the bounds if given in reverse.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        if start <= end {
            Self { start, end }
        } else {
            Self {
                start: end,
                end: start,
            }
        }
    }

    /// Creates a window covering `duration` up to (and excluding) `end`.
    pub fn ending_at(end: DateTime<Utc>, duration: Duration) -> Self {
        Self::new(end - duration, end)
    }

    /// Returns the duration of this time window.
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Checks if a datetime falls within this window.
    pub fn contains(&self, dt: DateTime<Utc>) -> bool {
        self.start <= dt && dt < self.end
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} .. {}",
            self.start.format("%Y-%m-%dT%H:%M:%SZ"),
            self.end.format("%Y-%m-%dT%H:%M:%SZ")
        )
    }
}

/// Boundary hours shared by the morning and afternoon windows.
///
/// Morning covers `close` yesterday to `split` today; afternoon covers
/// `split` to `close` today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowHours {
    /// Hour ending the morning window and starting the afternoon one.
    pub split_hour: u32,
    /// Hour ending the afternoon window (and starting the next morning's).
    pub close_hour: u32,
}

impl Default for WindowHours {
    fn default() -> Self {
        Self {
            split_hour: 9,
            close_hour: 14,
        }
    }
}

impl WindowHours {
    /// Validates that `split_hour < close_hour < 24`.
    pub fn validate(&self) -> Result<(), WindowError> {
        if self.split_hour < self.close_hour && self.close_hour < 24 {
            Ok(())
        } else {
            Err(WindowError::InvalidHours {
                split: self.split_hour,
                close: self.close_hour,
            })
        }
    }
}

/// Which timezone the window boundaries are expressed in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowTimezone {
    /// Boundaries are UTC wall-clock hours.
    #[default]
    Utc,
    /// Boundaries follow the host's local timezone.
    Local,
}

/// The named window a digest run covers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DigestWindow {
    /// From the previous afternoon's close to this morning's split hour.
    Morning,
    /// From this morning's split hour to the afternoon close.
    Afternoon,
    /// The 24 hours before the run. Used when no label is given.
    #[default]
    Daily,
}

impl DigestWindow {
    /// Length of the default look-back window.
    pub const DAILY_LOOKBACK_HOURS: i64 = 24;

    /// Resolves an optional command-line label. No label, or a label that
    /// is not a known window, means [`DigestWindow::Daily`].
    pub fn from_label(label: Option<&str>) -> Self {
        let Some(label) = label else {
            return Self::Daily;
        };
        label.parse().unwrap_or_else(|e: WindowError| {
            warn!(label, error = %e, "falling back to the daily window");
            Self::Daily
        })
    }

    /// Returns the label passed on the command line, if any.
    pub fn label(&self) -> Option<&'static str> {
        match self {
            Self::Morning => Some("morning"),
            Self::Afternoon => Some("afternoon"),
            Self::Daily => None,
        }
    }

    /// Returns a stable lowercase name, also used for log file names.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Morning => "morning",
            Self::Afternoon => "afternoon",
            Self::Daily => "daily",
        }
    }

    /// Returns the capitalized period used in the digest subject line.
    pub fn period_name(&self) -> &'static str {
        match self {
            Self::Morning => "Morning",
            Self::Afternoon => "Afternoon",
            Self::Daily => "Daily",
        }
    }

    /// Resolves the window in the configured timezone.
    pub fn resolve_in(
        &self,
        now: DateTime<Utc>,
        timezone: WindowTimezone,
        hours: WindowHours,
    ) -> Result<TimeWindow, WindowError> {
        match timezone {
            WindowTimezone::Utc => self.resolve(now, &Utc, hours),
            WindowTimezone::Local => self.resolve(now, &Local, hours),
        }
    }

    /// Resolves the window relative to `now`, with boundaries in `tz`.
    pub fn resolve<Tz: TimeZone>(
        &self,
        now: DateTime<Utc>,
        tz: &Tz,
        hours: WindowHours,
    ) -> Result<TimeWindow, WindowError> {
        hours.validate()?;
        let today = now.with_timezone(tz).date_naive();

        match self {
            Self::Morning => {
                let yesterday = today.pred_opt().unwrap_or(today);
                let start = local_hour(tz, yesterday, hours.close_hour)?;
                let end = local_hour(tz, today, hours.split_hour)?;
                Ok(TimeWindow::new(start, end))
            }
            Self::Afternoon => {
                let start = local_hour(tz, today, hours.split_hour)?;
                let end = local_hour(tz, today, hours.close_hour)?;
                Ok(TimeWindow::new(start, end))
            }
            Self::Daily => Ok(TimeWindow::ending_at(
                now.trunc_subsecs(0),
                Duration::hours(Self::DAILY_LOOKBACK_HOURS),
            )),
        }
    }
}

impl fmt::Display for DigestWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DigestWindow {
    type Err = WindowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "morning" => Ok(Self::Morning),
            "afternoon" => Ok(Self::Afternoon),
            "daily" => Ok(Self::Daily),
            _ => Err(WindowError::UnknownLabel(s.to_string())),
        }
    }
}

/// Converts `date` at `hour:00` in `tz` to UTC, taking the earlier instant
/// when the local time is ambiguous.
fn local_hour<Tz: TimeZone>(tz: &Tz, date: NaiveDate, hour: u32) -> Result<DateTime<Utc>, WindowError> {
    let naive = date
        .and_hms_opt(hour, 0, 0)
        .ok_or_else(|| WindowError::NonexistentLocalTime(format!("{date} {hour:02}:00")))?;
    tz.from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| WindowError::NonexistentLocalTime(naive.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap()
    }

    mod digest_window {
        use super::*;

        #[test]
        fn parse_labels() {
            assert_eq!("morning".parse::<DigestWindow>().unwrap(), DigestWindow::Morning);
            assert_eq!(" Afternoon ".parse::<DigestWindow>().unwrap(), DigestWindow::Afternoon);
            assert_eq!(DigestWindow::from_label(None), DigestWindow::Daily);
            assert_eq!(DigestWindow::from_label(Some("afternoon")), DigestWindow::Afternoon);
            assert_eq!(
                "evening".parse::<DigestWindow>(),
                Err(WindowError::UnknownLabel("evening".to_string()))
            );
        }

        #[test]
        fn labels_and_period_names() {
            assert_eq!(DigestWindow::Morning.label(), Some("morning"));
            assert_eq!(DigestWindow::Daily.label(), None);
            assert_eq!(DigestWindow::Afternoon.period_name(), "Afternoon");
            assert_eq!(DigestWindow::Daily.as_str(), "daily");
        }

        #[test]
        fn morning_spans_yesterday_close_to_today_split() {
            let now = utc(2025, 3, 12, 9, 0, 4);
            let window = DigestWindow::Morning
                .resolve(now, &Utc, WindowHours::default())
                .unwrap();
            assert_eq!(window.start, utc(2025, 3, 11, 14, 0, 0));
            assert_eq!(window.end, utc(2025, 3, 12, 9, 0, 0));
            assert_eq!(window.duration(), Duration::hours(19));
        }

        #[test]
        fn morning_crosses_month_boundary() {
            let now = utc(2025, 3, 1, 9, 0, 0);
            let window = DigestWindow::Morning
                .resolve(now, &Utc, WindowHours::default())
                .unwrap();
            assert_eq!(window.start, utc(2025, 2, 28, 14, 0, 0));
        }

        #[test]
        fn afternoon_spans_split_to_close() {
            let now = utc(2025, 3, 12, 14, 0, 30);
            let window = DigestWindow::Afternoon
                .resolve(now, &Utc, WindowHours::default())
                .unwrap();
            assert_eq!(window.start, utc(2025, 3, 12, 9, 0, 0));
            assert_eq!(window.end, utc(2025, 3, 12, 14, 0, 0));
        }

        #[test]
        fn daily_looks_back_24_hours() {
            let now = utc(2025, 3, 12, 7, 45, 10) + Duration::milliseconds(250);
            let window = DigestWindow::Daily
                .resolve(now, &Utc, WindowHours::default())
                .unwrap();
            assert_eq!(window.end, utc(2025, 3, 12, 7, 45, 10));
            assert_eq!(window.start, utc(2025, 3, 11, 7, 45, 10));
        }

        #[test]
        fn unknown_label_runs_the_daily_window() {
            let window = DigestWindow::from_label(Some("evening"));
            assert_eq!(window, DigestWindow::Daily);
            assert_eq!(window.label(), None);

            let now = utc(2025, 3, 12, 18, 30, 0);
            let range = window.resolve(now, &Utc, WindowHours::default()).unwrap();
            assert_eq!(range.start, utc(2025, 3, 11, 18, 30, 0));
            assert_eq!(range.end, now);
        }

        #[test]
        fn boundaries_follow_timezone() {
            // 09:00 at UTC+2 is 07:00 UTC.
            let tz = FixedOffset::east_opt(2 * 3600).unwrap();
            let now = utc(2025, 3, 12, 12, 0, 0);
            let window = DigestWindow::Afternoon
                .resolve(now, &tz, WindowHours::default())
                .unwrap();
            assert_eq!(window.start, utc(2025, 3, 12, 7, 0, 0));
            assert_eq!(window.end, utc(2025, 3, 12, 12, 0, 0));
        }

        #[test]
        fn custom_hours() {
            let hours = WindowHours {
                split_hour: 8,
                close_hour: 17,
            };
            let now = utc(2025, 3, 12, 8, 0, 0);
            let window = DigestWindow::Morning.resolve(now, &Utc, hours).unwrap();
            assert_eq!(window.start, utc(2025, 3, 11, 17, 0, 0));
            assert_eq!(window.end, utc(2025, 3, 12, 8, 0, 0));
        }

        #[test]
        fn rejects_inverted_hours() {
            let hours = WindowHours {
                split_hour: 15,
                close_hour: 9,
            };
            let result = DigestWindow::Afternoon.resolve(Utc::now(), &Utc, hours);
            assert!(matches!(result, Err(WindowError::InvalidHours { .. })));
        }
    }

    mod time_window {
        use super::*;

        #[test]
        fn contains_is_half_open() {
            let window = TimeWindow::new(utc(2025, 2, 5, 9, 0, 0), utc(2025, 2, 5, 14, 0, 0));
            assert!(window.contains(utc(2025, 2, 5, 9, 0, 0)));
            assert!(window.contains(utc(2025, 2, 5, 13, 59, 59)));
            assert!(!window.contains(utc(2025, 2, 5, 14, 0, 0)));
            assert!(!window.contains(utc(2025, 2, 5, 8, 59, 59)));
        }

        #[test]
        fn reversed_bounds_are_swapped() {
            let window = TimeWindow::new(utc(2025, 2, 5, 14, 0, 0), utc(2025, 2, 5, 9, 0, 0));
            assert_eq!(window.start, utc(2025, 2, 5, 9, 0, 0));
            assert_eq!(window.duration(), Duration::hours(5));
        }

        #[test]
        fn display_uses_graph_timestamps() {
            let window = TimeWindow::new(utc(2025, 2, 5, 9, 0, 0), utc(2025, 2, 5, 14, 0, 0));
            assert_eq!(window.to_string(), "2025-02-05T09:00:00Z .. 2025-02-05T14:00:00Z");
        }

        #[test]
        fn serde_roundtrip() {
            let window = TimeWindow::new(utc(2025, 2, 5, 9, 0, 0), utc(2025, 2, 5, 17, 0, 0));
            let json = serde_json::to_string(&window).unwrap();
            let parsed: TimeWindow = serde_json::from_str(&json).unwrap();
            assert_eq!(window, parsed);
        }
    }
}
