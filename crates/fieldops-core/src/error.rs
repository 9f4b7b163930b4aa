use thiserror::Error;

/// Failures surfaced by remote collaborators.
///
/// Stale responses are deliberately absent from this taxonomy: a
/// superseded result is expected traffic, discarded silently by the
/// component that issued it, and never shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// No usable response: connection, DNS, timeout, or a body that
    /// could not be decoded.
    #[error("network error: {0}")]
    Transport(String),

    /// The server answered with a non-success status.
    #[error("request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },
}

impl ApiError {
    pub fn is_transport(&self) -> bool {
        matches!(self, ApiError::Transport(_))
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        ApiError::Transport(err.to_string())
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
