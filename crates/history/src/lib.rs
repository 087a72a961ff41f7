//! Law history replay.
//!
//! [`HistoryBuilder`] turns archived snapshots into a linear commit history:
//! every snapshot is dated by its gazette citation, completed with lookups,
//! sorted, and committed by the cabinet in office on that date.
//!
//! ```text
//! snapshots ─▶ resolve citation ─▶ filter gazettes ─▶ lookups (concurrent)
//!           ─▶ sort by date ─▶ render + commit (sequential)
//! ```
//!
//! Every commit message ends with a `Snapshot: ` line naming the replayed
//! snapshot; a later build over the same cache skips those and only appends.

mod builder;
mod cabinet;
mod error;
mod render;
mod store;

pub use crate::builder::{
    file_name, recorded_snapshot, BuildReport, CommitRecord, HistoryBuilder, HistoryOptions, ProcedureFailure,
    SkipReason, SkippedSnapshot, SNAPSHOT_TRAILER,
};
pub use crate::cabinet::{AuthorSignature, Cabinet, CabinetTimeline, CABINETS};
pub use crate::error::HistoryError;
pub use crate::render::{strip_markup, Block, MarkdownRenderer, Markup, Renderer};
pub use crate::store::{CommitId, GitHistoryStore, HistoryStore, MemoryCommit, MemoryHistoryStore, StoredCommit, TreeId};
pub use tokio_util::sync::CancellationToken;
