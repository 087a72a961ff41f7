use chrono::NaiveDate;
use thiserror::Error;

/// Errors raised while building the history.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum HistoryError {
    /// No cabinet was in office on this date.
    #[error("no cabinet in office on {0}")]
    NoCabinet(NaiveDate),
    #[error("history store error: {0}")]
    Git(#[from] git2::Error),
    #[error("unknown history object {0}")]
    UnknownObject(String),
    #[error("branch {branch} moved: expected tip {expected:?}")]
    TipMoved {
        branch: String,
        expected: Option<String>,
    },
}
