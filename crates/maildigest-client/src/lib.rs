//! maildigest command-line interface.
//!
//! This crate provides the `maildigest` binary: configuration and `.env`
//! profile loading, Microsoft sign-in, token export for hosted runs, and
//! the `run` / `invoke` entry points that drive [`maildigest_runner`].

pub mod cli;
pub mod commands;
pub mod config;
pub mod envfile;
pub mod error;
pub mod secret;
pub mod settings;

pub use cli::Cli;
pub use error::{ClientError, ClientResult};
pub use settings::Settings;
