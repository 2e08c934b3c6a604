//! Core types: profiles, digest windows, threads, reply links, rendering

pub mod digest;
pub mod format;
pub mod links;
pub mod profile;
pub mod time;
pub mod tracing;

pub use digest::{DigestEntry, EmailThread, MAX_REPLIES, NO_SUBJECT, ReplyOption, ThreadSummary};
pub use format::{
    DigestRenderer, EmailFormat, digest_subject, display_date, html_escape, is_digest_subject,
};
pub use links::{ReplyLinkMode, build_reply_link, reply_link_for, reply_subject};
pub use profile::{ProfileError, UserProfile};
pub use time::{DigestWindow, TimeWindow, WindowError, WindowHours, WindowTimezone};
pub use tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};
