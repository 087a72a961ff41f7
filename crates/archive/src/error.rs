use std::path::PathBuf;

use canonical::CanonicalError;
use thiserror::Error;

/// Errors raised by the snapshot archive and its sources.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ArchiveError {
    #[error("i/o error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed archive: {0}")]
    MalformedArchive(String),
    #[error("invalid document: {0}")]
    InvalidDocument(#[from] CanonicalError),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("unexpected HTTP status {status} from {url}")]
    Status { url: String, status: u16 },
    #[error("response from {0} carries no version token")]
    MissingVersionToken(String),
    #[error("invalid listing: {0}")]
    InvalidListing(String),
    #[error("invalid version token {0:?}")]
    InvalidVersionToken(String),
}

impl ArchiveError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ArchiveError::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<reqwest::Error> for ArchiveError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => ArchiveError::Status {
                url: err.url().map(|u| u.to_string()).unwrap_or_default(),
                status: status.as_u16(),
            },
            None => ArchiveError::Transport(err.to_string()),
        }
    }
}

impl From<zip::result::ZipError> for ArchiveError {
    fn from(err: zip::result::ZipError) -> Self {
        ArchiveError::MalformedArchive(err.to_string())
    }
}
