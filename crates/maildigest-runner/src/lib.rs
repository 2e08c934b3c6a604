//! Digest pipeline, scheduled-run invoker and run lock.
//!
//! This crate provides:
//! - [`DigestRun`]: resolve the window, fetch, group, summarize, render, send
//! - [`Invocation`]: what a scheduler tick runs, with output appended to
//!   `cron_<window>.log`
//! - [`RunLock`]: rejects a second concurrent run for the same profile
//!
//! # Example
//!
//! ```rust,no_run
//! use maildigest_runner::{DigestRun, RunConfig, RunOutcome};
//! # use maildigest_providers::{MailProvider, Summarizer};
//!
//! # async fn example(mail: Box<dyn MailProvider>, summarizer: Box<dyn Summarizer>) -> Result<(), Box<dyn std::error::Error>> {
//! let config = RunConfig::new(maildigest_core::DigestWindow::Morning)
//!     .with_recipient("me@example.com");
//! let run = DigestRun::new(config, mail, summarizer);
//! if let RunOutcome::NoThreads = run.execute().await? {
//!     println!("nothing to send");
//! }
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod invoker;
mod pipeline;
mod runlock;

pub use config::{Delivery, RunConfig};
pub use error::{RunnerError, RunnerResult};
pub use invoker::{Invocation, InvocationOutcome, log_path};
pub use pipeline::{DigestRun, RunOutcome};
pub use runlock::{RunLock, lock_path};
