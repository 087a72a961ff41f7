use thiserror::Error;

/// Errors produced while extracting a citation from a document.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CitationError {
    /// Neither the amendment annotation nor the origin publication yielded a citation.
    #[error("document carries no usable citation")]
    NoCitation,
}
