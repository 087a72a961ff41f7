//! lawgit canonical document layer.
//!
//! Parses law exports into an owned tree and computes content fingerprints
//! that ignore the fields the publisher rewrites on every build.
//!
//! ## What we do
//!
//! - Parse the XML of an export into a [`LawDocument`]
//! - Erase volatile attributes (the `builddate` stamp by default) everywhere
//! - Serialize the remaining tree deterministically and hash it with SHA-256
//!
//! ## Pure function guarantee
//!
//! No I/O, no clock calls. The same document and config give the same
//! [`Fingerprint`] on any machine.

mod config;
mod document;
mod error;
mod hash;

pub use crate::config::{FingerprintConfig, BUILD_TIMESTAMP_ATTRIBUTE};
pub use crate::document::{LawDocument, XmlElement, XmlNode};
pub use crate::error::CanonicalError;
pub use crate::hash::{fingerprint, hash_canonical_bytes, Fingerprint};
