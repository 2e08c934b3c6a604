//! Subcommand implementations.

pub mod auth;
pub mod config;
pub mod invoke;
pub mod run;
pub mod token;
