//! Client error types.

use std::fmt;
use std::process::ExitCode;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur in the client.
#[derive(Debug)]
pub enum ClientError {
    /// Configuration error.
    Config(String),
    /// Invalid command-line usage.
    Usage(String),
    /// Provider error.
    Provider(maildigest_providers::ProviderError),
    /// Digest run or invocation error.
    Runner(maildigest_runner::RunnerError),
    /// IO error.
    Io(std::io::Error),
    /// The invoked digest run exited with a non-zero code.
    ChildFailed(i32),
}

impl ClientError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::ChildFailed(code) => ExitCode::from(u8::try_from(*code).unwrap_or(1).max(1)),
            Self::Usage(_) => ExitCode::from(2),
            _ => ExitCode::FAILURE,
        }
    }
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "configuration error: {}", msg),
            Self::Usage(msg) => write!(f, "{}", msg),
            Self::Provider(err) => write!(f, "provider error: {}", err),
            Self::Runner(err) => write!(f, "{}", err),
            Self::Io(err) => write!(f, "IO error: {}", err),
            Self::ChildFailed(code) => write!(f, "digest run exited with code {}", code),
        }
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Provider(err) => Some(err),
            Self::Runner(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<maildigest_providers::ProviderError> for ClientError {
    fn from(err: maildigest_providers::ProviderError) -> Self {
        Self::Provider(err)
    }
}

impl From<maildigest_runner::RunnerError> for ClientError {
    fn from(err: maildigest_runner::RunnerError) -> Self {
        Self::Runner(err)
    }
}

impl From<maildigest_core::WindowError> for ClientError {
    fn from(err: maildigest_core::WindowError) -> Self {
        Self::Usage(err.to_string())
    }
}
