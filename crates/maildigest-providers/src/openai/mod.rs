//! OpenAI-backed [`Summarizer`](crate::Summarizer).
//!
//! Each thread is sent as one prompt to the Responses API with a strict
//! JSON schema; the output is parsed leniently into a
//! [`ThreadSummary`](maildigest_core::ThreadSummary).

mod client;
mod prompt;

pub use client::{DEFAULT_BASE_URL, DEFAULT_MODEL, OpenAiConfig, OpenAiSummarizer};
pub use prompt::{SCHEMA_NAME, build_prompt, parse_summary, summary_schema};
