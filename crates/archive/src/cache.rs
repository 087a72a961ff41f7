//! On-disk snapshot archive.
//!
//! Layout: `{root}/{YYYY-MM-DD}/{document_id}/{version_token}.zip`. Files are
//! written once under a temporary name in their final directory and renamed
//! into place, so a reader never sees a partially written snapshot.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::NaiveDate;
use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn, Instrument, Level};
use walkdir::WalkDir;

use crate::error::ArchiveError;
use crate::snapshot::{Snapshot, SNAPSHOT_EXTENSION};
use crate::source::{sanitize_version_token, DocumentLocation, FetchResponse, SnapshotSource};

/// Result of a conditional fetch for one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    NotModified,
    Stored(Snapshot),
}

/// Knobs for a fetch batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchOptions {
    /// Upper bound on fetches in flight.
    pub parallelism: usize,
    /// Fetch without sending the locally known version token.
    pub force: bool,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            parallelism: 30,
            force: false,
        }
    }
}

/// A document that could not be fetched or stored.
#[derive(Debug)]
pub struct FetchFailure {
    pub document_id: String,
    pub error: ArchiveError,
}

/// Aggregated outcome of a fetch batch.
#[derive(Debug, Default)]
pub struct FetchReport {
    pub stored: Vec<Snapshot>,
    pub not_modified: Vec<String>,
    pub failures: Vec<FetchFailure>,
}

impl FetchReport {
    pub fn total(&self) -> usize {
        self.stored.len() + self.not_modified.len() + self.failures.len()
    }
}

/// Handle on a snapshot tree.
#[derive(Debug, Clone)]
pub struct SnapshotCache {
    root: PathBuf,
}

impl SnapshotCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn snapshot_path(&self, fetch_date: NaiveDate, document_id: &str, version_token: &str) -> PathBuf {
        self.root
            .join(fetch_date.format("%Y-%m-%d").to_string())
            .join(document_id)
            .join(format!("{version_token}.{SNAPSHOT_EXTENSION}"))
    }

    /// Every stored snapshot, oldest fetch date first.
    ///
    /// Within a day snapshots are ordered by document id, then version token.
    pub fn list_snapshots(&self) -> Result<Vec<Snapshot>, ArchiveError> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }
        let mut snapshots = Vec::new();
        for entry in WalkDir::new(&self.root).follow_links(false) {
            let entry = entry.map_err(|err| ArchiveError::io(&self.root, err.into()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            if let Some(snapshot) = Snapshot::from_path(&self.root, entry.path()) {
                snapshots.push(snapshot);
            }
        }
        snapshots.sort_by(|a, b| {
            (a.fetch_date, &a.document_id, &a.version_token).cmp(&(
                b.fetch_date,
                &b.document_id,
                &b.version_token,
            ))
        });
        Ok(snapshots)
    }

    /// Stored snapshots of one document, ordered by `(fetch_date, version_token)`.
    pub fn snapshots_of(&self, document_id: &str) -> Result<Vec<Snapshot>, ArchiveError> {
        let mut snapshots = Vec::new();
        for date_dir in self.date_dirs()? {
            let doc_dir = date_dir.join(document_id);
            if !doc_dir.is_dir() {
                continue;
            }
            let entries = fs::read_dir(&doc_dir).map_err(|err| ArchiveError::io(&doc_dir, err))?;
            for entry in entries {
                let entry = entry.map_err(|err| ArchiveError::io(&doc_dir, err))?;
                let path = entry.path();
                if !path.is_file() {
                    continue;
                }
                if let Some(snapshot) = Snapshot::from_path(&self.root, &path) {
                    snapshots.push(snapshot);
                }
            }
        }
        snapshots.sort_by(|a, b| (a.fetch_date, &a.version_token).cmp(&(b.fetch_date, &b.version_token)));
        Ok(snapshots)
    }

    /// Version token of the newest stored snapshot of `document_id`.
    ///
    /// Newest means latest fetch date; tokens only break ties within a day.
    pub fn latest_version(&self, document_id: &str) -> Result<Option<String>, ArchiveError> {
        Ok(self
            .snapshots_of(document_id)?
            .pop()
            .map(|snapshot| snapshot.version_token))
    }

    pub fn contains(&self, document_id: &str, version_token: &str) -> Result<bool, ArchiveError> {
        Ok(self
            .snapshots_of(document_id)?
            .iter()
            .any(|snapshot| snapshot.version_token == version_token))
    }

    /// Write `bytes` as a new snapshot.
    pub fn store(
        &self,
        document_id: &str,
        fetch_date: NaiveDate,
        version_token: &str,
        bytes: &[u8],
    ) -> Result<Snapshot, ArchiveError> {
        let path = self.snapshot_path(fetch_date, document_id, version_token);
        let dir = path
            .parent()
            .ok_or_else(|| ArchiveError::InvalidVersionToken(version_token.to_string()))?;
        fs::create_dir_all(dir).map_err(|err| ArchiveError::io(dir, err))?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|err| ArchiveError::io(dir, err))?;
        tmp.write_all(bytes).map_err(|err| ArchiveError::io(tmp.path(), err))?;
        tmp.as_file()
            .sync_all()
            .map_err(|err| ArchiveError::io(tmp.path(), err))?;
        tmp.persist(&path)
            .map_err(|err| ArchiveError::io(&path, err.error))?;

        Ok(Snapshot {
            document_id: document_id.to_string(),
            fetch_date,
            version_token: version_token.to_string(),
            path,
        })
    }

    /// Fetch `document` from `source` unless the newest stored version is current.
    pub async fn fetch_if_new(
        &self,
        source: &dyn SnapshotSource,
        document: &DocumentLocation,
        today: NaiveDate,
        options: FetchOptions,
    ) -> Result<FetchOutcome, ArchiveError> {
        let local = self.latest_version(&document.document_id)?;
        let precondition = if options.force { None } else { local.as_deref() };

        match source.fetch(&document.location, precondition).await? {
            FetchResponse::NotModified => {
                debug!(document_id = %document.document_id, "fetch_not_modified");
                Ok(FetchOutcome::NotModified)
            }
            FetchResponse::Modified {
                version_token,
                bytes,
            } => {
                let token = sanitize_version_token(&version_token)?;
                if local.as_deref() == Some(token.as_str()) {
                    debug!(document_id = %document.document_id, token = %token, "fetch_same_version");
                    return Ok(FetchOutcome::NotModified);
                }
                let snapshot = self.store(&document.document_id, today, &token, &bytes)?;
                info!(
                    document_id = %document.document_id,
                    token = %token,
                    bytes = bytes.len(),
                    "fetch_stored"
                );
                Ok(FetchOutcome::Stored(snapshot))
            }
        }
    }

    /// Conditionally fetch every document, at most `options.parallelism` at a time.
    ///
    /// Failures are collected per document; the batch always runs to completion.
    pub async fn fetch_all(
        &self,
        source: &dyn SnapshotSource,
        documents: Vec<DocumentLocation>,
        today: NaiveDate,
        options: FetchOptions,
    ) -> FetchReport {
        let start = Instant::now();
        let parallelism = options.parallelism.max(1);
        let span = tracing::span!(Level::INFO, "archive.fetch_all", documents = documents.len());

        let results: Vec<(String, Result<FetchOutcome, ArchiveError>)> = stream::iter(documents)
            .map(|document| async move {
                let outcome = self.fetch_if_new(source, &document, today, options).await;
                (document.document_id, outcome)
            })
            .buffer_unordered(parallelism)
            .collect()
            .instrument(span)
            .await;

        let mut report = FetchReport::default();
        for (document_id, result) in results {
            match result {
                Ok(FetchOutcome::Stored(snapshot)) => report.stored.push(snapshot),
                Ok(FetchOutcome::NotModified) => report.not_modified.push(document_id),
                Err(error) => {
                    warn!(document_id = %document_id, error = %error, "fetch_failure");
                    report.failures.push(FetchFailure { document_id, error });
                }
            }
        }
        report.stored.sort_by(|a, b| a.document_id.cmp(&b.document_id));
        report.not_modified.sort();
        report.failures.sort_by(|a, b| a.document_id.cmp(&b.document_id));

        info!(
            stored = report.stored.len(),
            not_modified = report.not_modified.len(),
            failures = report.failures.len(),
            elapsed_micros = start.elapsed().as_micros(),
            "fetch_batch_complete"
        );
        report
    }

    /// Delete a snapshot file and every ancestor directory it leaves empty,
    /// stopping at the archive root.
    pub fn remove(&self, snapshot: &Snapshot) -> Result<(), ArchiveError> {
        fs::remove_file(&snapshot.path).map_err(|err| ArchiveError::io(&snapshot.path, err))?;

        let mut dir = snapshot.path.parent();
        while let Some(current) = dir {
            if current == self.root.as_path() || !current.starts_with(&self.root) {
                break;
            }
            let is_empty = fs::read_dir(current)
                .map_err(|err| ArchiveError::io(current, err))?
                .next()
                .is_none();
            if !is_empty {
                break;
            }
            fs::remove_dir(current).map_err(|err| ArchiveError::io(current, err))?;
            dir = current.parent();
        }
        debug!(snapshot = %snapshot, "snapshot_removed");
        Ok(())
    }

    fn date_dirs(&self) -> Result<Vec<PathBuf>, ArchiveError> {
        if !self.root.is_dir() {
            return Ok(Vec::new());
        }
        let mut dirs = Vec::new();
        let entries = fs::read_dir(&self.root).map_err(|err| ArchiveError::io(&self.root, err))?;
        for entry in entries {
            let entry = entry.map_err(|err| ArchiveError::io(&self.root, err))?;
            let path = entry.path();
            let is_date = path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| NaiveDate::parse_from_str(name, "%Y-%m-%d").is_ok());
            if is_date && path.is_dir() {
                dirs.push(path);
            }
        }
        Ok(dirs)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    /// Serves one version per location and honours the precondition like an
    /// HTTP server answering `If-None-Match`.
    #[derive(Default)]
    struct StubSource {
        versions: Mutex<HashMap<String, (String, Vec<u8>)>>,
        requests: Mutex<Vec<(String, Option<String>)>>,
    }

    impl StubSource {
        fn publish(&self, location: &str, token: &str, bytes: &[u8]) {
            self.versions
                .lock()
                .unwrap()
                .insert(location.to_string(), (token.to_string(), bytes.to_vec()));
        }
    }

    #[async_trait]
    impl SnapshotSource for StubSource {
        async fn list_documents(&self) -> Result<Vec<DocumentLocation>, ArchiveError> {
            Ok(Vec::new())
        }

        async fn fetch(
            &self,
            location: &str,
            if_not_version: Option<&str>,
        ) -> Result<FetchResponse, ArchiveError> {
            self.requests
                .lock()
                .unwrap()
                .push((location.to_string(), if_not_version.map(str::to_string)));
            let versions = self.versions.lock().unwrap();
            let Some((token, bytes)) = versions.get(location) else {
                return Err(ArchiveError::Status {
                    url: location.to_string(),
                    status: 404,
                });
            };
            if if_not_version == Some(token.as_str()) {
                return Ok(FetchResponse::NotModified);
            }
            Ok(FetchResponse::Modified {
                bytes: bytes.clone(),
                version_token: token.clone(),
            })
        }
    }

    fn doc(id: &str) -> DocumentLocation {
        DocumentLocation::new(id, format!("http://laws.test/{id}/xml.zip"))
    }

    #[tokio::test]
    async fn unchanged_remote_is_not_modified_and_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let cache = SnapshotCache::new(dir.path());
        let source = StubSource::default();
        source.publish("http://laws.test/bgb/xml.zip", "v1", b"zip-bytes");

        let first = cache
            .fetch_if_new(&source, &doc("bgb"), ymd(2019, 5, 1), FetchOptions::default())
            .await
            .unwrap();
        let FetchOutcome::Stored(snapshot) = first else {
            panic!("expected first fetch to store");
        };
        assert_eq!(snapshot.path, dir.path().join("2019-05-01/bgb/v1.zip"));
        assert_eq!(fs::read(&snapshot.path).unwrap(), b"zip-bytes");

        let second = cache
            .fetch_if_new(&source, &doc("bgb"), ymd(2019, 5, 2), FetchOptions::default())
            .await
            .unwrap();
        assert_eq!(second, FetchOutcome::NotModified);
        assert_eq!(cache.list_snapshots().unwrap().len(), 1);
        assert!(!dir.path().join("2019-05-02").exists());

        let requests = source.requests.lock().unwrap();
        assert_eq!(requests[1].1.as_deref(), Some("v1"));
    }

    #[tokio::test]
    async fn changed_remote_is_stored_under_todays_date() {
        let dir = tempfile::tempdir().unwrap();
        let cache = SnapshotCache::new(dir.path());
        cache.store("bgb", ymd(2019, 5, 1), "v1", b"old").unwrap();

        let source = StubSource::default();
        source.publish("http://laws.test/bgb/xml.zip", "v2", b"new");
        let outcome = cache
            .fetch_if_new(&source, &doc("bgb"), ymd(2019, 6, 1), FetchOptions::default())
            .await
            .unwrap();
        assert!(matches!(outcome, FetchOutcome::Stored(ref s) if s.version_token == "v2"));
        assert_eq!(cache.latest_version("bgb").unwrap().as_deref(), Some("v2"));
    }

    #[tokio::test]
    async fn force_skips_the_precondition() {
        let dir = tempfile::tempdir().unwrap();
        let cache = SnapshotCache::new(dir.path());
        cache.store("bgb", ymd(2019, 5, 1), "v1", b"old").unwrap();
        let source = StubSource::default();
        source.publish("http://laws.test/bgb/xml.zip", "v1", b"old");

        let options = FetchOptions {
            force: true,
            ..FetchOptions::default()
        };
        let outcome = cache
            .fetch_if_new(&source, &doc("bgb"), ymd(2019, 6, 1), options)
            .await
            .unwrap();
        // Same token as the newest local copy, so nothing new is written.
        assert_eq!(outcome, FetchOutcome::NotModified);
        assert_eq!(source.requests.lock().unwrap()[0].1, None);
    }

    #[tokio::test]
    async fn batch_isolates_failures() {
        let dir = tempfile::tempdir().unwrap();
        let cache = SnapshotCache::new(dir.path());
        let source = StubSource::default();
        source.publish("http://laws.test/bgb/xml.zip", "v1", b"a");
        source.publish("http://laws.test/stgb/xml.zip", "v7", b"b");

        let report = cache
            .fetch_all(
                &source,
                vec![doc("bgb"), doc("missing"), doc("stgb")],
                ymd(2019, 5, 1),
                FetchOptions {
                    parallelism: 2,
                    force: false,
                },
            )
            .await;
        assert_eq!(report.stored.len(), 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].document_id, "missing");
        assert_eq!(report.total(), 3);
    }

    #[test]
    fn latest_version_prefers_fetch_date_over_token_order() {
        let dir = tempfile::tempdir().unwrap();
        let cache = SnapshotCache::new(dir.path());
        cache.store("bgb", ymd(2019, 1, 1), "zzz", b"a").unwrap();
        cache.store("bgb", ymd(2019, 2, 1), "aaa", b"b").unwrap();
        cache.store("stgb", ymd(2019, 3, 1), "mmm", b"c").unwrap();
        assert_eq!(cache.latest_version("bgb").unwrap().as_deref(), Some("aaa"));
        assert_eq!(cache.latest_version("hgb").unwrap(), None);
    }

    #[test]
    fn list_snapshots_is_ordered_oldest_first() {
        let dir = tempfile::tempdir().unwrap();
        let cache = SnapshotCache::new(dir.path());
        cache.store("stgb", ymd(2020, 1, 1), "b", b"x").unwrap();
        cache.store("bgb", ymd(2019, 1, 1), "a", b"x").unwrap();
        cache.store("aeg", ymd(2020, 1, 1), "c", b"x").unwrap();
        fs::write(dir.path().join("README"), "not a snapshot").unwrap();

        let ids: Vec<String> = cache
            .list_snapshots()
            .unwrap()
            .into_iter()
            .map(|s| format!("{}:{}", s.fetch_date, s.document_id))
            .collect();
        assert_eq!(ids, vec!["2019-01-01:bgb", "2020-01-01:aeg", "2020-01-01:stgb"]);
    }

    #[test]
    fn missing_root_lists_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let cache = SnapshotCache::new(dir.path().join("absent"));
        assert!(cache.list_snapshots().unwrap().is_empty());
        assert_eq!(cache.latest_version("bgb").unwrap(), None);
    }

    #[test]
    fn remove_prunes_only_empty_directories() {
        let dir = tempfile::tempdir().unwrap();
        let cache = SnapshotCache::new(dir.path());
        let lonely = cache.store("bgb", ymd(2019, 1, 1), "a", b"x").unwrap();
        let first = cache.store("stgb", ymd(2019, 2, 1), "a", b"x").unwrap();
        cache.store("stgb", ymd(2019, 2, 1), "b", b"x").unwrap();

        cache.remove(&lonely).unwrap();
        assert!(!dir.path().join("2019-01-01").exists());
        assert!(dir.path().exists());

        cache.remove(&first).unwrap();
        assert!(dir.path().join("2019-02-01/stgb/b.zip").exists());
    }

    #[test]
    fn no_temporary_files_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let cache = SnapshotCache::new(dir.path());
        cache.store("bgb", ymd(2019, 1, 1), "a", b"x").unwrap();
        let names: Vec<_> = fs::read_dir(dir.path().join("2019-01-01/bgb"))
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("a.zip")]);
    }
}
