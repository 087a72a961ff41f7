//! Historical captures from the Internet Archive.
//!
//! The CDX API answers with one capture per line:
//! `urlkey timestamp original mimetype statuscode digest length`.
//! Every successful capture not yet in the archive is stored under its capture
//! date with the 14-digit timestamp as version token.

use std::time::{Duration, Instant};

use chrono::NaiveDate;
use futures::stream::{self, StreamExt};
use reqwest::Client;
use thiserror::Error;
use tracing::{info, warn};

use crate::cache::{FetchFailure, FetchReport, SnapshotCache};
use crate::error::ArchiveError;
use crate::snapshot::Snapshot;
use crate::source::DocumentLocation;

pub const DEFAULT_CDX_URL: &str = "http://web.archive.org/cdx/search/cdx";
pub const REPLAY_ROOT: &str = "https://web.archive.org/web";

/// One archived copy of a location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capture {
    pub timestamp: String,
    pub original: String,
    pub date: NaiveDate,
}

impl Capture {
    /// Address of the archived bytes below a replay root such as [`REPLAY_ROOT`].
    pub fn replay_url(&self, replay_root: &str) -> String {
        format!("{}/{}/{}", replay_root.trim_end_matches('/'), self.timestamp, self.original)
    }
}

/// An import that stopped at a failing capture. `stored` holds the captures
/// already written to the cache.
#[derive(Debug, Error)]
#[error("{error} ({} captures stored before the failure)", .stored.len())]
pub struct PartialImport {
    pub stored: Vec<Snapshot>,
    #[source]
    pub error: ArchiveError,
}

impl From<ArchiveError> for PartialImport {
    fn from(error: ArchiveError) -> Self {
        Self {
            stored: Vec::new(),
            error,
        }
    }
}

#[derive(Debug, Clone)]
pub struct WaybackSource {
    client: Client,
    cdx_url: String,
    replay_root: String,
}

impl WaybackSource {
    pub fn new(cdx_url: &str, timeout: Duration) -> Result<Self, ArchiveError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            cdx_url: cdx_url.to_string(),
            replay_root: REPLAY_ROOT.to_string(),
        })
    }

    pub fn with_replay_root(mut self, replay_root: &str) -> Self {
        self.replay_root = replay_root.to_string();
        self
    }

    pub async fn list_captures(&self, location: &str) -> Result<Vec<Capture>, ArchiveError> {
        let body = self
            .client
            .get(&self.cdx_url)
            .query(&[("url", location)])
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(parse_cdx(&body))
    }

    pub async fn fetch_capture(&self, capture: &Capture) -> Result<Vec<u8>, ArchiveError> {
        let bytes = self
            .client
            .get(capture.replay_url(&self.replay_root))
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        Ok(bytes.to_vec())
    }

    /// Store every capture of `document` missing from `cache`, oldest first.
    ///
    /// Stops at the first capture that cannot be fetched or stored.
    pub async fn import_document(
        &self,
        cache: &SnapshotCache,
        document: &DocumentLocation,
    ) -> Result<Vec<Snapshot>, PartialImport> {
        let mut stored = Vec::new();
        for capture in self.list_captures(&document.location).await? {
            match self.import_capture(cache, document, &capture).await {
                Ok(Some(snapshot)) => stored.push(snapshot),
                Ok(None) => {}
                Err(error) => return Err(PartialImport { stored, error }),
            }
        }
        Ok(stored)
    }

    async fn import_capture(
        &self,
        cache: &SnapshotCache,
        document: &DocumentLocation,
        capture: &Capture,
    ) -> Result<Option<Snapshot>, ArchiveError> {
        if cache.contains(&document.document_id, &capture.timestamp)? {
            return Ok(None);
        }
        let bytes = self.fetch_capture(capture).await?;
        cache
            .store(&document.document_id, capture.date, &capture.timestamp, &bytes)
            .map(Some)
    }

    /// Import captures for many documents, `parallelism` documents at a time.
    pub async fn import_all(
        &self,
        cache: &SnapshotCache,
        documents: Vec<DocumentLocation>,
        parallelism: usize,
    ) -> FetchReport {
        let start = Instant::now();
        let results: Vec<(String, Result<Vec<Snapshot>, PartialImport>)> = stream::iter(documents)
            .map(|document| async move {
                let result = self.import_document(cache, &document).await;
                (document.document_id, result)
            })
            .buffer_unordered(parallelism.max(1))
            .collect()
            .await;

        let mut report = FetchReport::default();
        for (document_id, result) in results {
            match result {
                Ok(snapshots) if snapshots.is_empty() => report.not_modified.push(document_id),
                Ok(snapshots) => report.stored.extend(snapshots),
                Err(PartialImport { stored, error }) => {
                    warn!(
                        document_id = %document_id,
                        error = %error,
                        stored = stored.len(),
                        "capture_import_failure"
                    );
                    report.stored.extend(stored);
                    report.failures.push(FetchFailure { document_id, error });
                }
            }
        }
        report.stored.sort_by(|a, b| (a.fetch_date, &a.document_id).cmp(&(b.fetch_date, &b.document_id)));
        report.not_modified.sort();
        info!(
            stored = report.stored.len(),
            unchanged = report.not_modified.len(),
            failures = report.failures.len(),
            elapsed_micros = start.elapsed().as_micros(),
            "capture_import_complete"
        );
        report
    }
}

/// Successful captures listed in a CDX response, in listing order.
pub fn parse_cdx(body: &str) -> Vec<Capture> {
    body.lines()
        .filter_map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            let [_urlkey, timestamp, original, _mimetype, status, ..] = fields[..] else {
                return None;
            };
            if status != "200" || timestamp.len() != 14 || !timestamp.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            let date = NaiveDate::parse_from_str(&timestamp[..8], "%Y%m%d").ok()?;
            Some(Capture {
                timestamp: timestamp.to_string(),
                original: original.to_string(),
                date,
            })
        })
        .collect()
}
