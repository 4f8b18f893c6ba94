//! Error types for the media-engine adapter.

use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, EngineError>;

/// Errors raised by the media engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The source could not be read at all; raised by ingest.
    #[error("source unreadable: {0}")]
    SourceUnreadable(String),

    /// The engine binaries are missing or unusable.
    #[error("engine load failed: {0}")]
    LoadFailed(String),

    /// The engine ran but did not produce the expected result.
    #[error("engine execution failed: {message}")]
    ExecFailed {
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    /// The engine did not finish within the allotted time.
    #[error("engine timed out after {0} seconds")]
    Timeout(u64),

    #[error("filesystem error: {0}")]
    FileSystem(#[from] std::io::Error),
}

impl EngineError {
    pub fn load_failed(message: impl Into<String>) -> Self {
        Self::LoadFailed(message.into())
    }

    pub fn exec_failed(
        message: impl Into<String>,
        stderr: Option<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::ExecFailed {
            message: message.into(),
            stderr,
            exit_code,
        }
    }

    pub fn source_unreadable(message: impl Into<String>) -> Self {
        Self::SourceUnreadable(message.into())
    }

    /// Stable kind label for structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SourceUnreadable(_) => "source_unreadable",
            Self::LoadFailed(_) => "load_failed",
            Self::ExecFailed { .. } => "exec_failed",
            Self::Timeout(_) => "timeout",
            Self::FileSystem(_) => "file_system",
        }
    }
}
