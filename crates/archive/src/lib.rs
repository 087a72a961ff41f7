//! lawgit snapshot archive.
//!
//! Keeps every fetched revision of every law export on disk, fetches new ones
//! only when the remote version token changed, and finds stored copies whose
//! content is identical to an older copy.
//!
//! ```text
//! {root}/2019-05-02/bgb/5c8f-58a1b2.zip
//! {root}/2019-06-11/bgb/61d0-590c44.zip
//! {root}/2019-06-11/stgb/2b9e-58f0aa.zip
//! ```

mod cache;
mod dedup;
mod error;
mod gii;
mod snapshot;
mod source;
mod wayback;

pub use crate::cache::{FetchFailure, FetchOptions, FetchOutcome, FetchReport, SnapshotCache};
pub use crate::dedup::{DedupFailure, DedupOutcome, Deduplicator};
pub use crate::error::ArchiveError;
pub use crate::gii::{
    document_id_from_url, parse_toc, token_from_etag, GiiSource, DEFAULT_GII_ROOT, DEFAULT_TOC_PATH,
};
pub use crate::snapshot::{extract_xml, Snapshot, MAX_DOCUMENT_BYTES, SNAPSHOT_EXTENSION};
pub use crate::source::{sanitize_version_token, DocumentLocation, FetchResponse, SnapshotSource};
pub use crate::wayback::{parse_cdx, Capture, PartialImport, WaybackSource, DEFAULT_CDX_URL, REPLAY_ROOT};
