//! Runner error types.

use std::io;

use maildigest_core::WindowError;
use maildigest_providers::ProviderError;
use thiserror::Error;

/// Result type for runner operations.
pub type RunnerResult<T> = Result<T, RunnerError>;

/// Errors that can occur while running a digest or invoking one.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// IO error (log file, lock file, output file).
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Mail provider or summarizer failure.
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// Window label or window hours rejected.
    #[error("Invalid digest window: {0}")]
    Window(#[from] WindowError),

    /// Another run for the same profile holds the lock.
    #[error("A digest run is already in progress (lock file: {path})")]
    AlreadyRunning { path: String },

    /// The child program could not be started.
    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl RunnerError {
    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates an already running error.
    pub fn already_running(path: impl Into<String>) -> Self {
        Self::AlreadyRunning { path: path.into() }
    }
}
