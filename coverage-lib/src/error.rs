use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoverageError {
    /// The block-identifier source or the latest-block oracle failed.
    /// Carries the collaborator's error unmodified.
    #[error("block source unavailable: {0:#}")]
    SourceUnavailable(anyhow::Error),
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),
}

impl CoverageError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidParameters(msg.into())
    }

    pub fn source_unavailable(err: impl Into<anyhow::Error>) -> Self {
        Self::SourceUnavailable(err.into())
    }
}

pub type Result<T, E = CoverageError> = std::result::Result<T, E>;
