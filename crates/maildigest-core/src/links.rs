//! Reply links embedded in the digest.
//!
//! Each suggested reply becomes a link that opens a pre-filled compose
//! window in the user's mail client.
//!
//! ```
//! use maildigest_core::links::{ReplyLinkMode, build_reply_link};
//!
//! let link = build_reply_link(ReplyLinkMode::Gmail, "ann@example.com", "Re: Hi", "Thanks");
//! assert!(link.starts_with("https://mail.google.com/mail/?view=cm&fs=1&to=ann%40example.com"));
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Link target used for threads without a reply-to address.
pub const EMPTY_LINK: &str = "#";

/// Which compose endpoint reply links point at.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyLinkMode {
    /// Gmail web compose.
    Gmail,
    /// Outlook on the web for Microsoft 365 accounts.
    #[default]
    OutlookOffice,
    /// Outlook.com for personal accounts.
    OutlookLive,
    /// Plain `mailto:` links.
    Mailto,
}

impl ReplyLinkMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gmail => "gmail",
            Self::OutlookOffice => "outlook_office",
            Self::OutlookLive => "outlook_live",
            Self::Mailto => "mailto",
        }
    }
}

impl fmt::Display for ReplyLinkMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReplyLinkMode {
    type Err = std::convert::Infallible;

    /// Unrecognized modes fall back to `mailto`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "gmail" => Self::Gmail,
            "outlook_office" | "outlook365" | "owa" => Self::OutlookOffice,
            "outlook_live" | "outlook_com" | "outlook" => Self::OutlookLive,
            _ => Self::Mailto,
        })
    }
}

/// Builds the subject for a reply, adding `Re: ` unless already present.
pub fn reply_subject(subject: &str) -> String {
    let is_reply = subject
        .get(..3)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("re:"));
    if is_reply {
        subject.to_string()
    } else {
        format!("Re: {subject}")
    }
}

/// Builds a compose link for `mode`.
pub fn build_reply_link(mode: ReplyLinkMode, to: &str, subject: &str, body: &str) -> String {
    match mode {
        ReplyLinkMode::Gmail => format!(
            "https://mail.google.com/mail/?view=cm&fs=1&to={}&su={}&body={}",
            form_encode(to),
            form_encode(subject),
            form_encode(body)
        ),
        ReplyLinkMode::OutlookOffice => format!(
            "https://outlook.office.com/mail/0/deeplink/compose?popoutv2=0&to={}&subject={}&body={}",
            form_encode(to),
            form_encode(subject),
            form_encode(body)
        ),
        ReplyLinkMode::OutlookLive => format!(
            "https://outlook.live.com/owa/?path=/mail/action/compose&to={}&subject={}&body={}",
            form_encode(to),
            form_encode(subject),
            form_encode(body)
        ),
        ReplyLinkMode::Mailto => format!(
            "mailto:{}?subject={}&body={}",
            path_encode(to),
            path_encode(subject),
            path_encode(body)
        ),
    }
}

/// Builds the link for one reply option, or `#` when there is no recipient.
pub fn reply_link_for(mode: ReplyLinkMode, reply_to: Option<&str>, subject: &str, body: &str) -> String {
    match reply_to.filter(|addr| !addr.is_empty()) {
        Some(to) => build_reply_link(mode, to, &reply_subject(subject), body),
        None => EMPTY_LINK.to_string(),
    }
}

/// Form-style encoding: spaces become `+`.
fn form_encode(value: &str) -> String {
    urlencoding::encode(value).replace("%20", "+")
}

/// Percent encoding that keeps `/` literal.
fn path_encode(value: &str) -> String {
    urlencoding::encode(value).replace("%2F", "/")
}
