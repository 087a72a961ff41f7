use thiserror::Error;

/// Errors that can occur while parsing or fingerprinting a document.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CanonicalError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("invalid xml: {0}")]
    InvalidXml(String),
    #[error("document has no root element")]
    MissingRoot,
}
