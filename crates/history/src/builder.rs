use std::collections::{BTreeMap, HashSet};
use std::time::Instant;

use archive::Snapshot;
use chrono::NaiveDate;
use citation::{Citation, DatedCitation, Gazette};
use futures::stream::{self, StreamExt};
use lookup::{DateLookup, LookupError, ProcedureLookup, ProcedureRecord};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn, Instrument, Level};

use crate::cabinet::{AuthorSignature, CabinetTimeline};
use crate::error::HistoryError;
use crate::render::Renderer;
use crate::store::{CommitId, HistoryStore, StoredCommit};

/// Prefix of the commit message line naming the snapshot a commit replays.
pub const SNAPSHOT_TRAILER: &str = "Snapshot: ";

/// Branch, gazette filter and lookup parallelism of a history build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryOptions {
    pub branch: String,
    pub tracked_gazettes: Vec<Gazette>,
    pub parallelism: usize,
}

impl Default for HistoryOptions {
    fn default() -> Self {
        Self {
            branch: "master".to_string(),
            tracked_gazettes: vec![Gazette::BgblI, Gazette::BgblII],
            parallelism: 30,
        }
    }
}

/// Why a snapshot did not make it into the history.
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    MalformedArchive(String),
    NoCitation,
    UnrecognizedGazette(Gazette),
    LookupFailure(LookupError),
    NoCabinet(NaiveDate),
    /// Citation date before the author date of the branch tip.
    PredatesTip { date: NaiveDate, tip: NaiveDate },
}

impl SkipReason {
    pub fn kind(&self) -> &'static str {
        match self {
            SkipReason::MalformedArchive(_) => "malformed_archive",
            SkipReason::NoCitation => "no_citation",
            SkipReason::UnrecognizedGazette(_) => "unrecognized_gazette",
            SkipReason::LookupFailure(_) => "lookup_failure",
            SkipReason::NoCabinet(_) => "no_cabinet",
            SkipReason::PredatesTip { .. } => "predates_tip",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedSnapshot {
    pub snapshot: Snapshot,
    pub reason: SkipReason,
}

/// A procedure search that failed; the entry was committed without a record.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcedureFailure {
    pub snapshot: Snapshot,
    pub citation: DatedCitation,
    pub error: LookupError,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommitRecord {
    pub commit: CommitId,
    pub snapshot: Snapshot,
    pub citation: DatedCitation,
    pub author: AuthorSignature,
}

/// Outcome of [`HistoryBuilder::build`]. `commits` is in commit order.
///
/// `already_recorded` counts snapshots a previous build committed to the branch.
/// `interrupted` is set when cancellation stopped the build early.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuildReport {
    pub commits: Vec<CommitRecord>,
    pub skipped: Vec<SkippedSnapshot>,
    pub procedure_failures: Vec<ProcedureFailure>,
    pub already_recorded: usize,
    pub interrupted: bool,
}

impl BuildReport {
    /// Number of skipped snapshots per [`SkipReason::kind`].
    pub fn counts(&self) -> BTreeMap<&'static str, usize> {
        let mut counts = BTreeMap::new();
        for skipped in &self.skipped {
            *counts.entry(skipped.reason.kind()).or_insert(0) += 1;
        }
        counts
    }
}

/// A snapshot, its resolved citation and procedure record, in discovery order.
#[derive(Debug, Clone)]
struct HistoryEntry {
    index: usize,
    snapshot: Snapshot,
    citation: DatedCitation,
    procedure: Option<ProcedureRecord>,
}

struct Candidate {
    index: usize,
    snapshot: Snapshot,
    citation: Citation,
}

type Completion = (Result<HistoryEntry, SkippedSnapshot>, Option<ProcedureFailure>);

/// What the branch already holds when a build starts.
#[derive(Debug, Default)]
struct BranchState {
    recorded: HashSet<String>,
    tip_date: Option<NaiveDate>,
}

impl BranchState {
    fn from_log(log: &[StoredCommit]) -> Self {
        Self {
            recorded: log
                .iter()
                .filter_map(|commit| recorded_snapshot(&commit.message))
                .map(str::to_string)
                .collect(),
            tip_date: log.first().map(|tip| tip.authored.date_naive()),
        }
    }
}

/// Snapshot key written into a commit message by a previous build.
pub fn recorded_snapshot(message: &str) -> Option<&str> {
    message
        .lines()
        .rev()
        .find_map(|line| line.strip_prefix(SNAPSHOT_TRAILER))
        .map(str::trim)
}

/// Replays snapshots as commits ordered by their citation date.
pub struct HistoryBuilder<'a> {
    procedures: &'a dyn ProcedureLookup,
    dates: &'a dyn DateLookup,
    renderer: &'a dyn Renderer,
    timeline: CabinetTimeline,
    options: HistoryOptions,
    cancel: CancellationToken,
}

impl<'a> HistoryBuilder<'a> {
    pub fn new(
        procedures: &'a dyn ProcedureLookup,
        dates: &'a dyn DateLookup,
        renderer: &'a dyn Renderer,
        timeline: CabinetTimeline,
        options: HistoryOptions,
    ) -> Self {
        Self {
            procedures,
            dates,
            renderer,
            timeline,
            options,
            cancel: CancellationToken::new(),
        }
    }

    /// Stop before the next lookup or commit once `cancel` fires.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn options(&self) -> &HistoryOptions {
        &self.options
    }

    /// Append one commit per usable snapshot to the configured branch.
    ///
    /// Snapshots already recorded on the branch are left out, so a rerun only
    /// appends what is new. Per-snapshot problems end up in the report; only
    /// store failures abort.
    pub async fn build(
        &self,
        snapshots: &[Snapshot],
        store: &mut dyn HistoryStore,
    ) -> Result<BuildReport, HistoryError> {
        let start = Instant::now();
        let mut report = BuildReport::default();

        let branch = BranchState::from_log(&store.first_parent_log(&self.options.branch)?);
        let pending: Vec<&Snapshot> = snapshots
            .iter()
            .filter(|snapshot| !branch.recorded.contains(&snapshot.to_string()))
            .collect();
        report.already_recorded = snapshots.len() - pending.len();
        if report.already_recorded > 0 {
            debug!(
                branch = %self.options.branch,
                already_recorded = report.already_recorded,
                "recorded_snapshots_ignored"
            );
        }

        let candidates = self.resolve_citations(&pending, &mut report);

        let span = tracing::span!(Level::INFO, "history.lookups", candidates = candidates.len());
        let completions: Vec<Completion> = stream::iter(candidates)
            .map(|candidate| self.complete(candidate))
            .buffer_unordered(self.options.parallelism.max(1))
            .take_until(self.cancel.cancelled())
            .collect()
            .instrument(span)
            .await;

        let mut entries = Vec::with_capacity(completions.len());
        for (result, failure) in completions {
            match result {
                Ok(entry) => entries.push(entry),
                Err(skipped) => report.skipped.push(skipped),
            }
            report.procedure_failures.extend(failure);
        }
        entries.sort_by_key(|entry| (entry.citation.date(), entry.index));

        let mut floor = branch.tip_date;
        for entry in entries {
            if self.cancel.is_cancelled() {
                report.interrupted = true;
                break;
            }
            let date = entry.citation.date();
            if let Some(tip) = floor.filter(|tip| date < *tip) {
                warn!(snapshot = %entry.snapshot, %date, %tip, "snapshot_predates_tip");
                report
                    .skipped
                    .push(skip(entry.snapshot, SkipReason::PredatesTip { date, tip }));
                continue;
            }
            if self.commit_entry(entry, store, &mut report)? {
                floor = Some(date);
            }
        }
        report.interrupted |= self.cancel.is_cancelled();

        report.skipped.sort_by(|a, b| a.snapshot.path.cmp(&b.snapshot.path));
        report
            .procedure_failures
            .sort_by(|a, b| a.snapshot.path.cmp(&b.snapshot.path));
        info!(
            commits = report.commits.len(),
            skipped = report.skipped.len(),
            procedure_failures = report.procedure_failures.len(),
            already_recorded = report.already_recorded,
            interrupted = report.interrupted,
            elapsed_micros = start.elapsed().as_micros(),
            "history_build_complete"
        );
        Ok(report)
    }

    fn resolve_citations(&self, snapshots: &[&Snapshot], report: &mut BuildReport) -> Vec<Candidate> {
        let mut candidates = Vec::new();
        for (index, &snapshot) in snapshots.iter().enumerate() {
            if self.cancel.is_cancelled() {
                break;
            }
            let reason = match snapshot.read_document() {
                Err(err) => SkipReason::MalformedArchive(err.to_string()),
                Ok(doc) => match citation::resolve(&doc) {
                    Err(_) => SkipReason::NoCitation,
                    Ok(citation) if !self.options.tracked_gazettes.contains(&citation.gazette) => {
                        SkipReason::UnrecognizedGazette(citation.gazette)
                    }
                    Ok(citation) => {
                        candidates.push(Candidate {
                            index,
                            snapshot: snapshot.clone(),
                            citation,
                        });
                        continue;
                    }
                },
            };
            report.skipped.push(skip(snapshot.clone(), reason));
        }
        candidates
    }

    /// Date a partial citation and attach the procedure record.
    async fn complete(&self, candidate: Candidate) -> Completion {
        let Candidate {
            index,
            snapshot,
            citation,
        } = candidate;

        let dated = match citation.into_dated() {
            Ok(dated) => dated,
            Err(partial) => match self.lookup_date(&partial).await {
                Ok(date) => match partial.with_date(date).into_dated() {
                    Ok(dated) => dated,
                    Err(_) => return (Err(skip(snapshot, SkipReason::NoCitation)), None),
                },
                Err(error) => return (Err(skip(snapshot, SkipReason::LookupFailure(error))), None),
            },
        };

        let mut failure = None;
        let procedure = match dated.citation().page {
            Some(page) => {
                let cit = dated.citation();
                match self.procedures.search(&cit.gazette, cit.year, page).await {
                    Ok(outcome) => outcome.into_record(),
                    Err(error) => {
                        warn!(snapshot = %snapshot, citation = %dated, error = %error, "procedure_lookup_failure");
                        failure = Some(ProcedureFailure {
                            snapshot: snapshot.clone(),
                            citation: dated.clone(),
                            error,
                        });
                        None
                    }
                }
            }
            None => None,
        };

        let entry = HistoryEntry {
            index,
            snapshot,
            citation: dated,
            procedure,
        };
        (Ok(entry), failure)
    }

    async fn lookup_date(&self, partial: &Citation) -> Result<NaiveDate, LookupError> {
        let page = partial
            .page
            .ok_or_else(|| LookupError::NotFound(format!("{partial} without page")))?;
        self.dates.resolve_date(&partial.gazette, partial.year, page).await
    }

    /// Returns whether a commit was written.
    fn commit_entry(
        &self,
        entry: HistoryEntry,
        store: &mut dyn HistoryStore,
        report: &mut BuildReport,
    ) -> Result<bool, HistoryError> {
        let date = entry.citation.date();
        let author = match self.timeline.signature_for(date) {
            Ok(author) => author,
            Err(_) => {
                warn!(snapshot = %entry.snapshot, %date, "cabinet_missing");
                report.skipped.push(skip(entry.snapshot, SkipReason::NoCabinet(date)));
                return Ok(false);
            }
        };
        let doc = match entry.snapshot.read_document() {
            Ok(doc) => doc,
            Err(err) => {
                report
                    .skipped
                    .push(skip(entry.snapshot, SkipReason::MalformedArchive(err.to_string())));
                return Ok(false);
            }
        };

        let body = self.renderer.markup_to_text(&self.renderer.render(&doc));
        let title = doc
            .formal_title()
            .unwrap_or_else(|| entry.snapshot.document_id.clone());
        let mut message = match &entry.procedure {
            Some(record) => format!("{title}\n\n{}", self.renderer.procedure_to_text(record)),
            None => title,
        };
        message.push_str(&format!("\n\n{SNAPSHOT_TRAILER}{}", entry.snapshot));

        let branch = self.options.branch.as_str();
        let tip = store.current_tip(branch)?;
        let tree = store.write_tree(tip.as_ref(), &file_name(&entry.snapshot.document_id), body.as_bytes())?;
        let parents: Vec<CommitId> = tip.into_iter().collect();
        let commit = store.create_commit(branch, &author, &author, &message, &tree, &parents)?;

        info!(
            commit = %commit,
            snapshot = %entry.snapshot,
            citation = %entry.citation,
            author = %author.name,
            "commit_created"
        );
        report.commits.push(CommitRecord {
            commit,
            snapshot: entry.snapshot,
            citation: entry.citation,
            author,
        });
        Ok(true)
    }
}

fn skip(snapshot: Snapshot, reason: SkipReason) -> SkippedSnapshot {
    debug!(snapshot = %snapshot, reason = reason.kind(), "snapshot_skipped");
    SkippedSnapshot { snapshot, reason }
}

/// Repository path of a document's rendered body.
pub fn file_name(document_id: &str) -> String {
    format!("{}.md", document_id.replace('/', "_"))
}
