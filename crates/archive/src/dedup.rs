//! Content-addressed deduplication of stored snapshots.

use std::collections::HashMap;
use std::time::Instant;

use canonical::{fingerprint, Fingerprint, FingerprintConfig};
use tracing::{debug, info, warn};

use crate::error::ArchiveError;
use crate::snapshot::Snapshot;

/// A snapshot whose content could not be fingerprinted.
#[derive(Debug)]
pub struct DedupFailure {
    pub snapshot: Snapshot,
    pub error: ArchiveError,
}

#[derive(Debug, Default)]
pub struct DedupOutcome {
    /// Later copies of content seen before, in input order.
    pub removable: Vec<Snapshot>,
    /// First copy of each distinct content, in input order.
    pub survivors: Vec<Snapshot>,
    pub failures: Vec<DedupFailure>,
}

/// Groups snapshots by canonical fingerprint.
#[derive(Debug, Clone, Default)]
pub struct Deduplicator {
    config: FingerprintConfig,
}

impl Deduplicator {
    pub fn new(config: FingerprintConfig) -> Self {
        Self { config }
    }

    pub fn fingerprint_of(&self, snapshot: &Snapshot) -> Result<Fingerprint, ArchiveError> {
        let doc = snapshot.read_document()?;
        Ok(fingerprint(&doc, &self.config)?)
    }

    /// Partition `snapshots` (oldest fetch first) into survivors and removable
    /// duplicates.
    ///
    /// The first member of every fingerprint group survives. Snapshots that
    /// fail to unpack or parse are reported and neither kept nor removed.
    pub fn find_removable(&self, snapshots: &[Snapshot]) -> DedupOutcome {
        let start = Instant::now();
        let mut first_seen: HashMap<Fingerprint, usize> = HashMap::new();
        let mut outcome = DedupOutcome::default();

        for (position, snapshot) in snapshots.iter().enumerate() {
            match self.fingerprint_of(snapshot) {
                Ok(digest) => match first_seen.get(&digest) {
                    Some(&original) => {
                        debug!(
                            snapshot = %snapshot,
                            duplicate_of = %snapshots[original],
                            "snapshot_duplicate"
                        );
                        outcome.removable.push(snapshot.clone());
                    }
                    None => {
                        first_seen.insert(digest, position);
                        outcome.survivors.push(snapshot.clone());
                    }
                },
                Err(error) => {
                    warn!(snapshot = %snapshot, error = %error, "snapshot_unreadable");
                    outcome.failures.push(DedupFailure {
                        snapshot: snapshot.clone(),
                        error,
                    });
                }
            }
        }

        info!(
            snapshots = snapshots.len(),
            unique = outcome.survivors.len(),
            removable = outcome.removable.len(),
            failures = outcome.failures.len(),
            elapsed_micros = start.elapsed().as_micros(),
            "dedup_complete"
        );
        outcome
    }
}
