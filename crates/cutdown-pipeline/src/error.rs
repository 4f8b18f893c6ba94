//! Pipeline error types.

use cutdown_media::EngineError;
use thiserror::Error;

pub type PipelineResult<T> = Result<T, PipelineError>;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("no speech detected; try lowering the noise threshold")]
    NoSpeechDetected,

    #[error("engine log unparseable: {0}")]
    LogParse(String),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("no scoring credential provided")]
    MissingCredential,

    #[error("oracle returned HTTP {status}: {body}")]
    OracleProtocol { status: u16, body: String },

    #[error("oracle reply is not valid JSON: {message}")]
    OracleParse { message: String, body: String },

    #[error("oracle reply has the wrong shape: {message}")]
    OracleShape { message: String, body: String },

    #[error("export failed: {0}")]
    Export(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    pub fn export(msg: impl Into<String>) -> Self {
        Self::Export(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether this error came from the scoring oracle path.
    pub fn is_oracle(&self) -> bool {
        matches!(
            self,
            Self::MissingCredential
                | Self::OracleProtocol { .. }
                | Self::OracleParse { .. }
                | Self::OracleShape { .. }
        )
    }

    /// Process exit code for CLI wrappers.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::NoSpeechDetected => 2,
            Self::Engine(_) | Self::LogParse(_) => 3,
            e if e.is_oracle() => 4,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(PipelineError::NoSpeechDetected.exit_code(), 2);
        assert_eq!(
            PipelineError::Engine(EngineError::Timeout(30)).exit_code(),
            3
        );
        assert_eq!(PipelineError::LogParse("x".into()).exit_code(), 3);
        assert_eq!(PipelineError::MissingCredential.exit_code(), 4);
        assert_eq!(
            PipelineError::OracleProtocol {
                status: 500,
                body: String::new()
            }
            .exit_code(),
            4
        );
        assert_eq!(PipelineError::export("x").exit_code(), 1);
    }

    #[test]
    fn test_is_oracle() {
        assert!(PipelineError::MissingCredential.is_oracle());
        assert!(!PipelineError::NoSpeechDetected.is_oracle());
    }
}
