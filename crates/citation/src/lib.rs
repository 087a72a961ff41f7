//! Gazette citations for law exports.
//!
//! A [`Citation`] says where and when the current text of a law was
//! published. [`resolve`] extracts one from a parsed [`canonical::LawDocument`];
//! citations that lack a day can be completed with [`Citation::with_date`] and
//! then promoted to a [`DatedCitation`] for ordering.

mod citation;
mod error;
mod gazette;
mod resolver;

pub use crate::citation::{Citation, DatedCitation};
pub use crate::error::CitationError;
pub use crate::gazette::Gazette;
pub use crate::resolver::{
    from_amendment_annotation, from_any, from_origin_publication, parse_amendment_note,
    parse_origin_reference, resolve, Extraction,
};
