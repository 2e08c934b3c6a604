//! Thread and digest-entry types.
//!
//! - [`EmailThread`]: one conversation from the mailbox, flattened to text
//! - [`ThreadSummary`]: what the summarizer returns for a thread
//! - [`DigestEntry`]: a thread paired with its summary, ready to render

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum number of reply drafts kept per thread.
pub const MAX_REPLIES: usize = 3;

/// Subject used when a thread's first message has none.
pub const NO_SUBJECT: &str = "No Subject";

/// A conversation thread collected from the mailbox.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailThread {
    /// Provider conversation identifier.
    pub conversation_id: String,
    /// Subject of the earliest message.
    pub subject: String,
    /// Sender of the earliest message as `Name <address>`.
    pub sender: String,
    /// One `"<address> said: <preview>"` line per message, oldest first.
    pub text: String,
    /// Address replies should go to, if any message carried one.
    pub reply_to: Option<String>,
    /// Number of messages in the thread.
    pub message_count: usize,
    /// Receive time of the newest message.
    pub last_received: Option<DateTime<Utc>>,
}

/// A single suggested reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyOption {
    /// Single lowercase word shown on the button.
    pub label: String,
    /// Draft reply text.
    pub body: String,
}

/// The summarizer's output for one thread.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThreadSummary {
    pub summary: String,
    pub action: String,
    pub replies: Vec<ReplyOption>,
}

impl ThreadSummary {
    /// Trims every field, normalizes labels, drops replies with empty
    /// bodies and keeps at most [`MAX_REPLIES`].
    #[must_use]
    pub fn normalized(self) -> Self {
        let replies = self
            .replies
            .into_iter()
            .take(MAX_REPLIES)
            .filter_map(|r| {
                let body = r.body.trim();
                if body.is_empty() {
                    return None;
                }
                Some(ReplyOption {
                    label: normalize_label(&r.label),
                    body: body.to_string(),
                })
            })
            .collect();

        Self {
            summary: self.summary.trim().to_string(),
            action: self.action.trim().to_string(),
            replies,
        }
    }
}

/// Normalizes a reply button label: trimmed, spaces become `-`, anything
/// after the first `/` is dropped, lower-cased; `reply` when nothing is left.
pub fn normalize_label(label: &str) -> String {
    let label = label.trim().replace(' ', "-");
    let label = label.split('/').next().unwrap_or_default().to_lowercase();
    if label.is_empty() {
        "reply".to_string()
    } else {
        label
    }
}

/// One rendered section of the digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigestEntry {
    pub sender: String,
    pub subject: String,
    pub summary: String,
    pub action: String,
    pub replies: Vec<ReplyOption>,
    pub reply_to: Option<String>,
}

impl DigestEntry {
    /// Combines a thread with its normalized summary.
    pub fn new(thread: &EmailThread, summary: ThreadSummary) -> Self {
        let summary = summary.normalized();
        Self {
            sender: thread.sender.clone(),
            subject: thread.subject.clone(),
            summary: summary.summary,
            action: summary.action,
            replies: summary.replies,
            reply_to: thread.reply_to.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reply(label: &str, body: &str) -> ReplyOption {
        ReplyOption {
            label: label.to_string(),
            body: body.to_string(),
        }
    }

    #[test]
    fn label_normalization() {
        assert_eq!(normalize_label(" Accept "), "accept");
        assert_eq!(normalize_label("Follow up"), "follow-up");
        assert_eq!(normalize_label("Yes/No"), "yes");
        assert_eq!(normalize_label("   "), "reply");
        assert_eq!(normalize_label("/x"), "reply");
    }

    #[test]
    fn summary_normalization() {
        let raw = ThreadSummary {
            summary: "  Budget review moved.  ".to_string(),
            action: "\nConfirm attendance\n".to_string(),
            replies: vec![
                reply("Accept", " Works for me. "),
                reply("Decline", "   "),
                reply("Later", "I'll check."),
                reply("Ask", "Which room?"),
            ],
        };

        let normalized = raw.normalized();
        assert_eq!(normalized.summary, "Budget review moved.");
        assert_eq!(normalized.action, "Confirm attendance");
        assert_eq!(
            normalized.replies,
            vec![reply("accept", "Works for me."), reply("later", "I'll check.")]
        );
    }

    #[test]
    fn entry_takes_thread_fields() {
        let thread = EmailThread {
            conversation_id: "c1".to_string(),
            subject: "Budget".to_string(),
            sender: "Ann <ann@example.com>".to_string(),
            text: "ann@example.com said: hi".to_string(),
            reply_to: Some("ann@example.com".to_string()),
            message_count: 1,
            last_received: None,
        };
        let entry = DigestEntry::new(&thread, ThreadSummary::default());
        assert_eq!(entry.subject, "Budget");
        assert_eq!(entry.sender, "Ann <ann@example.com>");
        assert_eq!(entry.reply_to.as_deref(), Some("ann@example.com"));
        assert!(entry.replies.is_empty());
    }

    #[test]
    fn summary_deserializes_with_missing_fields() {
        let parsed: ThreadSummary = serde_json::from_str(r#"{"summary":"s"}"#).unwrap();
        assert_eq!(parsed.summary, "s");
        assert!(parsed.action.is_empty());
        assert!(parsed.replies.is_empty());
    }
}
