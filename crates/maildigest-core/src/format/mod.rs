//! HTML rendering for the digest email.
//!
//! Two layouts are supported:
//! - `modern`: a single styled document using CSS classes
//! - `windows`: nested tables with inline styles and VML buttons, for
//!   Outlook desktop which ignores most CSS

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::digest::DigestEntry;
use crate::links::{ReplyLinkMode, reply_link_for};
use crate::time::DigestWindow;

/// Subject line prefix shared by every digest we send.
const SUBJECT_PREFIX: &str = "📬 ";
const SUBJECT_MARKER: &str = " Email Digest – ";

/// HTML layout of the digest email.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmailFormat {
    /// CSS-styled layout (default).
    #[default]
    Modern,
    /// Table layout for Outlook on Windows.
    Windows,
}

impl fmt::Display for EmailFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Modern => f.write_str("modern"),
            Self::Windows => f.write_str("windows"),
        }
    }
}

impl FromStr for EmailFormat {
    type Err = std::convert::Infallible;

    /// Anything other than `windows` selects the modern layout.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("windows") {
            Ok(Self::Windows)
        } else {
            Ok(Self::Modern)
        }
    }
}

/// Formats a date the way it appears in subjects and headings.
pub fn display_date(date: NaiveDate) -> String {
    date.format("%B %d, %Y").to_string()
}

/// Builds the digest subject, e.g. `📬 Morning Email Digest – March 05, 2025`.
pub fn digest_subject(window: DigestWindow, date: NaiveDate) -> String {
    format!(
        "{SUBJECT_PREFIX}{}{SUBJECT_MARKER}{}",
        window.period_name(),
        display_date(date)
    )
}

/// Returns true if `subject` is one of our own digest subjects, for any
/// period and date.
pub fn is_digest_subject(subject: &str) -> bool {
    let Some(rest) = subject.trim().strip_prefix(SUBJECT_PREFIX) else {
        return false;
    };
    [DigestWindow::Morning, DigestWindow::Afternoon, DigestWindow::Daily]
        .iter()
        .any(|w| {
            rest.strip_prefix(w.period_name())
                .is_some_and(|r| r.starts_with(SUBJECT_MARKER))
        })
}

/// Escapes text for inclusion in HTML content or attribute values.
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

/// Renders digest entries to HTML.
#[derive(Debug, Clone, Copy, Default)]
pub struct DigestRenderer {
    format: EmailFormat,
    link_mode: ReplyLinkMode,
}

impl DigestRenderer {
    pub fn new(format: EmailFormat, link_mode: ReplyLinkMode) -> Self {
        Self { format, link_mode }
    }

    pub fn format(&self) -> EmailFormat {
        self.format
    }

    /// Renders the full HTML document for `entries`, dated `date`.
    pub fn render(&self, entries: &[DigestEntry], date: NaiveDate) -> String {
        match self.format {
            EmailFormat::Modern => self.render_modern(entries, date),
            EmailFormat::Windows => self.render_windows(entries, date),
        }
    }

    fn render_modern(&self, entries: &[DigestEntry], date: NaiveDate) -> String {
        let mut html = String::from(MODERN_HEAD);
        html.push_str(&format!(
            "  <div class=\"container\">\n    <h1>📬 Email Digest – {}</h1>\n    <p>Here's a summary of your recent conversations:</p>\n",
            display_date(date)
        ));

        for (i, entry) in entries.iter().enumerate() {
            html.push_str(&format!(
                concat!(
                    "    <div class=\"thread\">\n",
                    "      <div class=\"summary-box\">\n",
                    "        <div class=\"thread-title\">📌 Thread {n}: {subject}</div>\n",
                    "        <div><strong>From:</strong> {sender}</div>\n",
                    "        <div class=\"label\">📝 Summary:</div>\n",
                    "        <div>{summary}</div>\n",
                    "      </div>\n",
                    "      <div class=\"action-box\">\n",
                    "        <div class=\"label\">⚡ Suggested Action:</div>\n",
                    "        <div>{action}</div>\n",
                    "      </div>\n",
                ),
                n = i + 1,
                subject = html_escape(&entry.subject),
                sender = html_escape(&entry.sender),
                summary = html_escape(&entry.summary),
                action = html_escape(&entry.action),
            ));

            if !entry.replies.is_empty() {
                html.push_str("      <div class=\"reply-options\"><div class=\"label\">💬 AI Reply Options:</div>\n");
                for reply in &entry.replies {
                    let link = self.reply_link(entry, &reply.body);
                    html.push_str(&format!(
                        "        <div class=\"reply-option\"><a class=\"reply-btn\" href=\"{}\">{}</a><div class=\"reply-body\">{}</div></div>\n",
                        html_escape(&link),
                        html_escape(&reply.label),
                        html_escape(&reply.body),
                    ));
                }
                html.push_str("      </div>\n");
            }

            html.push_str("    </div>\n");
        }

        html.push_str("  </div>\n</body>\n</html>\n");
        html
    }

    fn render_windows(&self, entries: &[DigestEntry], date: NaiveDate) -> String {
        let mut html = format!(
            concat!(
                "<html>\n<head>\n</head>\n",
                "<body style=\"font-family: Arial, sans-serif; margin: 0; padding: 0;\">\n",
                "<table width=\"100%\" cellpadding=\"0\" cellspacing=\"0\" border=\"0\" style=\"background-color: #f4f4f4;\">\n",
                "<tr>\n<td align=\"center\" style=\"padding: 20px;\">\n",
                "  <table width=\"700\" cellpadding=\"0\" cellspacing=\"0\" border=\"0\" style=\"background-color: white;\">\n",
                "  <tr>\n  <td style=\"padding: 30px;\">\n",
                "    <h1 style=\"color: #333; font-size: 24px; margin: 0 0 20px 0;\">📬 Email Digest – {}</h1>\n",
                "    <p style=\"margin: 0 0 20px 0;\">Here's a summary of your recent conversations:</p>\n",
            ),
            display_date(date)
        );

        for (i, entry) in entries.iter().enumerate() {
            html.push_str(&format!(
                concat!(
                    "    <table width=\"100%\" cellpadding=\"0\" cellspacing=\"0\" border=\"0\" style=\"margin-bottom: 30px;\">\n",
                    "    <tr>\n    <td>\n",
                    "      <table width=\"100%\" cellpadding=\"0\" cellspacing=\"0\" border=\"0\" style=\"border-left: 4px solid #3498db; background-color: #f0f8ff;\">\n",
                    "      <tr>\n      <td style=\"padding: 15px;\">\n",
                    "        <div style=\"font-weight: bold; margin-bottom: 10px; font-size: 16px;\">📌 Thread {n}: {subject}</div>\n",
                    "        <div style=\"margin-bottom: 10px;\"><strong>From:</strong> {sender}</div>\n",
                    "        <div style=\"font-weight: bold; margin-bottom: 6px;\">📝 Summary:</div>\n",
                    "        <div>{summary}</div>\n",
                    "      </td>\n      </tr>\n      </table>\n",
                    "{spacer}",
                    "      <table width=\"100%\" cellpadding=\"0\" cellspacing=\"0\" border=\"0\" style=\"border-left: 4px solid #f1c40f; background-color: #fffbe6;\">\n",
                    "      <tr>\n      <td style=\"padding: 15px;\">\n",
                    "        <div style=\"font-weight: bold; color: #b37f00; margin-bottom: 6px;\">⚡ Suggested Action:</div>\n",
                    "        <div>{action}</div>\n",
                    "      </td>\n      </tr>\n      </table>\n",
                ),
                n = i + 1,
                subject = html_escape(&entry.subject),
                sender = html_escape(&entry.sender),
                summary = html_escape(&entry.summary),
                action = html_escape(&entry.action),
                spacer = spacer_row(10),
            ));

            if !entry.replies.is_empty() {
                html.push_str(&spacer_row(10));
                html.push_str(concat!(
                    "      <table width=\"100%\" cellpadding=\"0\" cellspacing=\"0\" border=\"0\" style=\"border-left: 4px solid #2ecc71; background-color: #eefaf1;\">\n",
                    "      <tr>\n      <td style=\"padding: 15px;\">\n",
                    "        <div style=\"font-weight: bold; margin-bottom: 15px;\">💬 AI Reply Options:</div>\n",
                ));
                for (idx, reply) in entry.replies.iter().enumerate() {
                    html.push_str(&self.windows_button(entry, idx, &reply.label, &reply.body));
                }
                html.push_str("      </td>\n      </tr>\n      </table>\n");
            }

            html.push_str("    </td>\n    </tr>\n    </table>\n");
            html.push_str(&spacer_row(25));
        }

        html.push_str("  </td>\n  </tr>\n  </table>\n</td>\n</tr>\n</table>\n</body>\n</html>\n");
        html
    }

    /// A rounded reply button: VML for Outlook desktop, a styled anchor elsewhere.
    fn windows_button(&self, entry: &DigestEntry, idx: usize, label: &str, body: &str) -> String {
        let link = html_escape(&self.reply_link(entry, body));
        let separator = if idx > 0 {
            "margin-top: 15px; padding-top: 15px; border-top: 1px solid #d4f1df;"
        } else {
            ""
        };
        let width = button_width(label);

        format!(
            concat!(
                "        <div style=\"{separator}\">\n",
                "          <!--[if mso]>\n",
                "          <v:roundrect xmlns:v=\"urn:schemas-microsoft-com:vml\" xmlns:w=\"urn:schemas-microsoft-com:office:word\" href=\"{link}\" style=\"height:40px;v-text-anchor:middle;width:{width}px;\" arcsize=\"15%\" stroke=\"f\" fillcolor=\"#2ecc71\">\n",
                "          <w:anchorlock/>\n",
                "          <center style=\"color:#ffffff;font-family:Arial,sans-serif;font-size:14px;font-weight:bold;text-transform:uppercase;letter-spacing:0.5px;\">\n",
                "          <![endif]-->\n",
                "          <a href=\"{link}\" style=\"background-color:#2ecc71;border-radius:6px;color:#ffffff;display:inline-block;font-family:Arial,sans-serif;font-size:14px;font-weight:bold;line-height:40px;text-align:center;text-decoration:none;padding:0 30px;text-transform:uppercase;letter-spacing:0.5px;-webkit-text-size-adjust:none;mso-hide:all;\">{label}</a>\n",
                "          <!--[if mso]>\n",
                "          {upper}\n",
                "          </center>\n",
                "          </v:roundrect>\n",
                "          <![endif]-->\n",
                "          <div style=\"margin-top: 10px; color: #333; line-height: 1.4;\">{body}</div>\n",
                "        </div>\n",
            ),
            separator = separator,
            link = link,
            width = width,
            label = html_escape(label),
            upper = html_escape(&label.to_uppercase()),
            body = html_escape(body),
        )
    }

    fn reply_link(&self, entry: &DigestEntry, body: &str) -> String {
        reply_link_for(self.link_mode, entry.reply_to.as_deref(), &entry.subject, body)
    }
}

/// VML buttons need an explicit width; uppercase letter-spaced labels run
/// about 15px per character plus padding.
fn button_width(label: &str) -> usize {
    (label.chars().count() * 15 + 60).max(150)
}

fn spacer_row(height: u32) -> String {
    format!(
        "      <table width=\"100%\" cellpadding=\"0\" cellspacing=\"0\" border=\"0\">\n      <tr><td style=\"height: {height}px;\"></td></tr>\n      </table>\n"
    )
}

const MODERN_HEAD: &str = r#"<html>
<head>
  <style>
    body { font-family: Arial, sans-serif; background-color: #f4f4f4; padding: 20px; }
    .container { max-width: 700px; margin: auto; background-color: white; padding: 30px; border-radius: 10px; box-shadow: 0 2px 8px rgba(0,0,0,0.05); }
    h1 { color: #333; }
    .thread { margin-bottom: 30px; }
    .summary-box { border-left: 4px solid #3498db; background-color: #f0f8ff; padding: 15px; border-radius: 6px; }
    .summary-box .label { font-weight: bold; margin-top: 6px; }
    .action-box { background-color: #fffbe6; border-left: 4px solid #f1c40f; padding: 15px; margin-top: 10px; border-radius: 6px; }
    .action-box .label { font-weight: bold; color: #b37f00; margin-bottom: 6px; }
    .reply-options { background-color: #eefaf1; border-left: 4px solid #2ecc71; padding: 15px; margin-top: 10px; border-radius: 6px; }
    .reply-option { margin-top: 10px; padding-top: 10px; border-top: 1px dashed #bfe9cf; }
    .reply-btn { display: inline-block; background-color: #2ecc71; color: white !important; text-decoration: none; padding: 8px 12px; border-radius: 4px; margin-right: 8px; font-weight: 600; text-transform: uppercase; letter-spacing: 0.5px; }
    .reply-body { margin-top: 8px; white-space: pre-wrap; }
  </style>
</head>
<body>
"#;
