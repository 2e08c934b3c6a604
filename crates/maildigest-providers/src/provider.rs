//! Collaborator traits used by the digest pipeline.
//!
//! - [`MailProvider`]: authenticates, fetches messages and sends the digest
//! - [`Summarizer`]: turns one thread into a summary, action and replies
//! - [`CredentialStore`]: persists OAuth tokens per profile
//!
//! The traits return boxed futures so they stay object-safe; the pipeline
//! holds `Box<dyn MailProvider>` and `Box<dyn Summarizer>`.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;

use maildigest_core::{EmailThread, ThreadSummary, TimeWindow, UserProfile};

use crate::error::ProviderResult;
use crate::raw_message::RawMessage;
use crate::tokens::TokenInfo;

/// A boxed future for async trait methods.
///
/// Boxing keeps the traits usable behind `dyn`.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// An HTML email to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub to: String,
    pub subject: String,
    pub html_body: String,
}

impl OutgoingMessage {
    pub fn new(
        to: impl Into<String>,
        subject: impl Into<String>,
        html_body: impl Into<String>,
    ) -> Self {
        Self {
            to: to.into(),
            subject: subject.into(),
            html_body: html_body.into(),
        }
    }
}

/// A mailbox backend.
///
/// `authenticate` is called once per run before any other method. It may
/// prompt the user (device-code sign-in) when running interactively.
pub trait MailProvider: Send + Sync {
    /// Returns the provider name (e.g., "microsoft").
    fn name(&self) -> &str;

    /// Makes sure a usable access token is available.
    fn authenticate(&self) -> BoxFuture<'_, ProviderResult<()>>;

    /// Fetches Inbox messages received inside `window`, following pagination.
    fn fetch_messages(&self, window: TimeWindow) -> BoxFuture<'_, ProviderResult<Vec<RawMessage>>>;

    /// Sends an HTML message from the authenticated account.
    fn send_digest(&self, message: OutgoingMessage) -> BoxFuture<'_, ProviderResult<()>>;
}

/// Produces a digest entry for a thread.
pub trait Summarizer: Send + Sync {
    /// Returns the summarizer name (e.g., "openai").
    fn name(&self) -> &str;

    /// Summarizes one thread. Unparseable model output yields an empty
    /// summary rather than an error.
    fn summarize<'a>(&'a self, thread: &'a EmailThread) -> BoxFuture<'a, ProviderResult<ThreadSummary>>;
}

/// Token persistence keyed by profile.
pub trait CredentialStore: Send + Sync {
    /// Loads the token for `profile`, or `None` if there is none.
    fn load(&self, profile: Option<&UserProfile>) -> ProviderResult<Option<TokenInfo>>;

    /// Persists the token for `profile`.
    fn store(&self, profile: Option<&UserProfile>, token: &TokenInfo) -> ProviderResult<()>;

    /// Returns where the token for `profile` lives.
    fn location(&self, profile: Option<&UserProfile>) -> PathBuf;
}
