//! Workspace umbrella crate for lawgit.
//!
//! lawgit keeps every published revision of the German federal laws in a
//! snapshot archive and replays the distinct revisions as a git history, one
//! commit per revision, dated and authored by the cabinet in office when the
//! change was published.
//!
//! The three run operations mirror the command line:
//!
//! - [`download`]: list the documents of a source and fetch the changed ones.
//! - [`dedup`]: delete snapshots whose content equals an older snapshot.
//! - [`replay_history`]: commit the distinct snapshots in citation order.

mod config;

pub use crate::config::{
    ArchiveYamlConfig, ConfigLoadError, HistoryYamlConfig, LawgitConfig, LoggingYamlConfig,
    LookupYamlConfig, SourcesYamlConfig,
};
pub use archive::{
    ArchiveError, DedupFailure, Deduplicator, DocumentLocation, FetchFailure, FetchOptions, FetchOutcome,
    FetchReport, GiiSource, Snapshot, SnapshotCache, SnapshotSource, WaybackSource,
};
pub use canonical::{fingerprint, Fingerprint, FingerprintConfig, LawDocument};
pub use citation::{resolve, Citation, CitationError, DatedCitation, Gazette};
pub use history::{
    BuildReport, CabinetTimeline, CancellationToken, GitHistoryStore, HistoryBuilder, HistoryError,
    HistoryOptions, HistoryStore, MarkdownRenderer, MemoryHistoryStore, Renderer, SkipReason,
};
pub use lookup::{
    DateLookup, DipClient, LookupError, OffeneGesetzeClient, ProcedureLookup, RetryConfig, Retrying,
};

use std::time::Instant;

use chrono::NaiveDate;
use thiserror::Error;
use tracing::{info, warn};

/// Batch-level failures. Per-document problems never surface here; they
/// are collected in the operation's report.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Archive(#[from] ArchiveError),
    #[error(transparent)]
    History(#[from] HistoryError),
    #[error(transparent)]
    Lookup(#[from] LookupError),
}

/// List the documents of `source` and fetch every one that changed.
pub async fn download(
    cache: &SnapshotCache,
    source: &dyn SnapshotSource,
    today: NaiveDate,
    options: FetchOptions,
) -> Result<FetchReport, RunError> {
    let documents = source.list_documents().await?;
    info!(documents = documents.len(), "document_listing");
    Ok(cache.fetch_all(source, documents, today, options).await)
}

/// Import the archived captures of every document `listing` knows about.
pub async fn import_captures(
    cache: &SnapshotCache,
    listing: &dyn SnapshotSource,
    wayback: &WaybackSource,
    parallelism: usize,
) -> Result<FetchReport, RunError> {
    let documents = listing.list_documents().await?;
    info!(documents = documents.len(), "document_listing");
    Ok(wayback.import_all(cache, documents, parallelism).await)
}

/// A duplicate that could not be deleted.
#[derive(Debug)]
pub struct RemovalFailure {
    pub snapshot: Snapshot,
    pub error: ArchiveError,
}

#[derive(Debug, Default)]
pub struct DedupReport {
    pub removed: Vec<Snapshot>,
    pub survivors: usize,
    pub unreadable: Vec<DedupFailure>,
    pub removal_failures: Vec<RemovalFailure>,
}

/// Delete every snapshot whose content matches an older one.
pub fn dedup(cache: &SnapshotCache, deduplicator: &Deduplicator) -> Result<DedupReport, RunError> {
    let start = Instant::now();
    let snapshots = cache.list_snapshots()?;
    let outcome = deduplicator.find_removable(&snapshots);

    let mut report = DedupReport {
        survivors: outcome.survivors.len(),
        unreadable: outcome.failures,
        ..DedupReport::default()
    };
    for snapshot in outcome.removable {
        match cache.remove(&snapshot) {
            Ok(()) => report.removed.push(snapshot),
            Err(error) => {
                warn!(snapshot = %snapshot, error = %error, "snapshot_removal_failure");
                report.removal_failures.push(RemovalFailure { snapshot, error });
            }
        }
    }

    info!(
        removed = report.removed.len(),
        survivors = report.survivors,
        unreadable = report.unreadable.len(),
        removal_failures = report.removal_failures.len(),
        elapsed_micros = start.elapsed().as_micros(),
        "dedup_complete"
    );
    Ok(report)
}

#[derive(Debug)]
pub struct HistoryReport {
    /// Stored snapshots that repeat older content and were left out.
    pub duplicates: usize,
    pub unreadable: usize,
    pub build: BuildReport,
}

/// Commit the distinct snapshots of `cache` to `store`.
///
/// Duplicates are left out of the history but stay on disk.
pub async fn replay_history(
    cache: &SnapshotCache,
    deduplicator: &Deduplicator,
    builder: &HistoryBuilder<'_>,
    store: &mut dyn HistoryStore,
) -> Result<HistoryReport, RunError> {
    let snapshots = cache.list_snapshots()?;
    let outcome = deduplicator.find_removable(&snapshots);
    let build = builder.build(&outcome.survivors, store).await?;
    Ok(HistoryReport {
        duplicates: outcome.removable.len(),
        unreadable: outcome.failures.len(),
        build,
    })
}
