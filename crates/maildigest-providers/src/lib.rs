//! Mailbox and summarizer backends.
//!
//! This crate provides the collaborators the digest pipeline talks to:
//!
//! - [`MailProvider`] - Fetches Inbox messages and sends the digest
//! - [`Summarizer`] - Turns a thread into a summary, action and replies
//! - [`CredentialStore`] - Persists OAuth tokens per profile
//! - [`group_into_threads`] - Groups raw messages into conversation threads
//! - [`ProviderError`] - Error types for provider operations
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐        ┌─────────────────┐
//! │ Microsoft Graph │        │  OpenAI API     │
//! └────────┬────────┘        └────────┬────────┘
//!          │                          │
//!          ▼                          │
//! ┌──────────────────────┐            │
//! │ MicrosoftMailProvider│            │
//! └────────┬─────────────┘            │
//!          │ RawMessage               │
//!          ▼                          │
//!   group_into_threads()              │
//!          │ EmailThread              ▼
//!          └──────────────►  OpenAiSummarizer
//!                                     │ ThreadSummary
//!                                     ▼
//!                              DigestEntry
//! ```

pub mod error;
#[cfg(feature = "microsoft")]
pub mod microsoft;
#[cfg(feature = "openai")]
pub mod openai;
pub mod provider;
pub mod raw_message;
pub mod threads;
pub mod tokens;

// Re-export main types at crate root
pub use error::{ProviderError, ProviderErrorCode, ProviderResult};
pub use provider::{BoxFuture, CredentialStore, MailProvider, OutgoingMessage, Summarizer};
pub use raw_message::{EmailAddress, RawMessage, Recipient};
pub use threads::group_into_threads;
pub use tokens::{EXPIRY_MARGIN_SECS, FileCredentialStore, TokenInfo, encode_cache_file};
