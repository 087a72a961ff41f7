use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ArchiveError;

/// A document offered by a snapshot source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentLocation {
    pub document_id: String,
    pub location: String,
}

impl DocumentLocation {
    pub fn new(document_id: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            document_id: document_id.into(),
            location: location.into(),
        }
    }
}

/// Answer to a conditional fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchResponse {
    /// The remote copy still carries the token sent as precondition.
    NotModified,
    Modified {
        bytes: Vec<u8>,
        version_token: String,
    },
}

/// Remote origin of document snapshots.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    /// Every document currently offered, with the location to fetch it from.
    async fn list_documents(&self) -> Result<Vec<DocumentLocation>, ArchiveError>;

    /// Fetch `location` unless its current version equals `if_not_version`.
    async fn fetch(
        &self,
        location: &str,
        if_not_version: Option<&str>,
    ) -> Result<FetchResponse, ArchiveError>;
}

/// Version tokens become file names; anything that could escape the
/// document directory is replaced.
pub fn sanitize_version_token(token: &str) -> Result<String, ArchiveError> {
    let cleaned: String = token
        .chars()
        .map(|c| match c {
            '/' | '\\' | '\0' => '_',
            c => c,
        })
        .collect();
    if cleaned.is_empty() || cleaned.chars().all(|c| c == '.') {
        return Err(ArchiveError::InvalidVersionToken(token.to_string()));
    }
    Ok(cleaned)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_cannot_escape_their_directory() {
        assert_eq!(sanitize_version_token("5c8f-58a1").unwrap(), "5c8f-58a1");
        assert_eq!(sanitize_version_token("a/b\\c").unwrap(), "a_b_c");
        assert!(sanitize_version_token("").is_err());
        assert!(sanitize_version_token("..").is_err());
    }
}
