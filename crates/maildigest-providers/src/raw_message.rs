//! Raw message type from the mail provider.
//!
//! [`RawMessage`] mirrors the Graph message fields the digest selects. It
//! deserializes straight from the Graph JSON and is then grouped into
//! [`EmailThread`](maildigest_core::EmailThread)s.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An email address with an optional display name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailAddress {
    pub name: Option<String>,
    pub address: Option<String>,
}

/// A sender or recipient entry (`{"emailAddress": {...}}`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Recipient {
    pub email_address: EmailAddress,
}

impl Recipient {
    /// Creates a recipient from a display name and address.
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            email_address: EmailAddress {
                name: Some(name.into()),
                address: Some(address.into()),
            },
        }
    }

    /// Returns the bare, lower-cased address, or `None` if blank.
    pub fn address_only(&self) -> Option<String> {
        let raw = self.email_address.address.as_deref()?.trim();
        let bare = match (raw.find('<'), raw.rfind('>')) {
            (Some(open), Some(close)) if open < close => raw[open + 1..close].trim(),
            _ => raw,
        };
        if bare.is_empty() {
            None
        } else {
            Some(bare.to_lowercase())
        }
    }

    /// Returns `Name <address>`, trimmed.
    pub fn display(&self) -> String {
        let name = self.email_address.name.as_deref().unwrap_or_default();
        let address = self.email_address.address.as_deref().unwrap_or_default();
        format!("{name} <{address}>").trim().to_string()
    }
}

/// A message as returned by the mail provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawMessage {
    pub id: String,
    pub subject: Option<String>,
    pub from: Option<Recipient>,
    pub sender: Option<Recipient>,
    pub reply_to: Option<Vec<Recipient>>,
    pub received_date_time: Option<DateTime<Utc>>,
    pub body_preview: Option<String>,
    pub conversation_id: Option<String>,
}

impl RawMessage {
    /// Creates a message with an id and conversation id.
    pub fn new(id: impl Into<String>, conversation_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            conversation_id: Some(conversation_id.into()),
            ..Self::default()
        }
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn with_from(mut self, from: Recipient) -> Self {
        self.from = Some(from);
        self
    }

    pub fn with_sender(mut self, sender: Recipient) -> Self {
        self.sender = Some(sender);
        self
    }

    pub fn with_reply_to(mut self, reply_to: Vec<Recipient>) -> Self {
        self.reply_to = Some(reply_to);
        self
    }

    pub fn with_received(mut self, at: DateTime<Utc>) -> Self {
        self.received_date_time = Some(at);
        self
    }

    pub fn with_preview(mut self, preview: impl Into<String>) -> Self {
        self.body_preview = Some(preview.into());
        self
    }

    /// The `from` address, lower-cased.
    pub fn from_address(&self) -> Option<String> {
        self.from.as_ref().and_then(Recipient::address_only)
    }

    /// The address a reply to this message should go to: the first
    /// `replyTo` entry, else `from`, else `sender`.
    pub fn reply_address(&self) -> Option<String> {
        let first_reply_to = self.reply_to.as_ref().and_then(|list| list.first());
        [first_reply_to, self.from.as_ref(), self.sender.as_ref()]
            .into_iter()
            .flatten()
            .find_map(Recipient::address_only)
    }

    /// Trimmed body preview.
    pub fn preview(&self) -> &str {
        self.body_preview.as_deref().unwrap_or_default().trim()
    }
}
