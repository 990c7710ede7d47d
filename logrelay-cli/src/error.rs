//! CLI-specific error types and exit code mapping

use logrelay_core::error::{PluginError, RelayError};
use logrelay_pipeline::StageError;

/// CLI-specific error type.
///
/// The `exit_code()` method maps errors to process exit codes.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Settings or plugin configuration problem.
    #[error("configuration error: {0}")]
    Config(String),

    /// A command-line argument could not be interpreted.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The broker could not be reached or refused the message.
    #[error("broker unavailable: {0}")]
    Broker(String),

    /// JSON serialisation failed during output rendering.
    #[error("json output error: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    /// IO error (stdout write, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapped domain error from logrelay-core.
    #[error("{0}")]
    Core(#[from] RelayError),
}

impl CliError {
    /// Map the error to a process exit code.
    ///
    /// | Code | Meaning                          |
    /// |------|----------------------------------|
    /// | 0    | Success                          |
    /// | 1    | General error                    |
    /// | 2    | Configuration or argument error  |
    /// | 3    | Broker unavailable               |
    /// | 10   | IO error                         |
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::InvalidArgument(_) => 2,
            Self::Broker(_) => 3,
            Self::Io(_) => 10,
            Self::JsonSerialize(_) | Self::Core(_) => 1,
        }
    }
}

impl From<PluginError> for CliError {
    fn from(e: PluginError) -> Self {
        Self::Config(e.to_string())
    }
}

impl From<StageError> for CliError {
    fn from(e: StageError) -> Self {
        match e {
            StageError::Broker(e) => Self::Broker(e.to_string()),
            StageError::Plugin(e) => e.into(),
            StageError::Config(e) => Self::Config(e.to_string()),
            other => Self::Core(other.into()),
        }
    }
}
