use thiserror::Error;

/// Errors raised by procedure and date lookups.
///
/// `NotFound` is a legitimate empty answer; everything else is a failure of
/// the lookup itself.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum LookupError {
    #[error("no record for {0}")]
    NotFound(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("unexpected HTTP status {status} from {url}")]
    Status { url: String, status: u16 },
    #[error("cannot decode response: {0}")]
    Decode(String),
    #[error("gazette {0} is not supported by this lookup")]
    Unsupported(String),
}

impl LookupError {
    /// Whether repeating the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            LookupError::Transport(_) => true,
            LookupError::Status { status, .. } => {
                matches!(status, 408 | 429) || (500..600).contains(status)
            }
            LookupError::NotFound(_) | LookupError::Decode(_) | LookupError::Unsupported(_) => false,
        }
    }
}

impl From<reqwest::Error> for LookupError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => LookupError::Status {
                url: err.url().map(|u| u.to_string()).unwrap_or_default(),
                status: status.as_u16(),
            },
            None if err.is_decode() => LookupError::Decode(err.to_string()),
            None => LookupError::Transport(err.to_string()),
        }
    }
}
