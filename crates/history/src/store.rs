//! Append-only commit storage.
//!
//! [`GitHistoryStore`] writes real git objects with libgit2; the in-memory
//! [`MemoryHistoryStore`] mirrors its semantics for tests and dry runs.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::Path;

use chrono::{DateTime, Utc};
use git2::{ErrorCode, Oid, Repository, Signature, Sort, Time};
use tracing::debug;

use crate::cabinet::AuthorSignature;
use crate::error::HistoryError;

const FILE_MODE: i32 = 0o100644;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommitId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TreeId(pub String);

impl fmt::Display for CommitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A commit as read back from a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredCommit {
    pub id: CommitId,
    pub message: String,
    pub authored: DateTime<Utc>,
}

/// A branch-based commit chain.
pub trait HistoryStore {
    /// Newest commit on `branch`, `None` before the first commit.
    fn current_tip(&self, branch: &str) -> Result<Option<CommitId>, HistoryError>;

    /// Commits on the first-parent chain of `branch`, newest first.
    fn first_parent_log(&self, branch: &str) -> Result<Vec<StoredCommit>, HistoryError>;

    /// Tree of `base` (empty when `None`) with the file at `path` set to `contents`.
    fn write_tree(&mut self, base: Option<&CommitId>, path: &str, contents: &[u8]) -> Result<TreeId, HistoryError>;

    /// Record a commit and advance `branch` to it.
    ///
    /// Fails with [`HistoryError::TipMoved`] unless the branch currently
    /// points at the first parent (or does not exist yet and `parents` is empty).
    fn create_commit(
        &mut self,
        branch: &str,
        author: &AuthorSignature,
        committer: &AuthorSignature,
        message: &str,
        tree: &TreeId,
        parents: &[CommitId],
    ) -> Result<CommitId, HistoryError>;
}

/// History kept in a git repository.
pub struct GitHistoryStore {
    repo: Repository,
}

impl GitHistoryStore {
    /// Open the repository at `path`, creating it when missing.
    pub fn open_or_init(path: &Path) -> Result<Self, HistoryError> {
        let repo = match Repository::open(path) {
            Ok(repo) => repo,
            Err(err) if err.code() == ErrorCode::NotFound => Repository::init(path)?,
            Err(err) => return Err(err.into()),
        };
        Ok(Self { repo })
    }

    pub fn repository(&self) -> &Repository {
        &self.repo
    }

    fn signature(sig: &AuthorSignature) -> Result<Signature<'static>, HistoryError> {
        let time = Time::new(sig.timestamp.timestamp(), 0);
        Ok(Signature::new(&sig.name, &sig.email, &time)?)
    }
}

fn branch_ref(branch: &str) -> String {
    format!("refs/heads/{branch}")
}

impl HistoryStore for GitHistoryStore {
    fn current_tip(&self, branch: &str) -> Result<Option<CommitId>, HistoryError> {
        match self.repo.refname_to_id(&branch_ref(branch)) {
            Ok(oid) => Ok(Some(CommitId(oid.to_string()))),
            Err(err) if err.code() == ErrorCode::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn first_parent_log(&self, branch: &str) -> Result<Vec<StoredCommit>, HistoryError> {
        let Some(tip) = self.current_tip(branch)? else {
            return Ok(Vec::new());
        };
        let mut walk = self.repo.revwalk()?;
        walk.set_sorting(Sort::TOPOLOGICAL)?;
        walk.simplify_first_parent()?;
        walk.push(Oid::from_str(&tip.0)?)?;
        walk.map(|oid| -> Result<StoredCommit, HistoryError> {
            let commit = self.repo.find_commit(oid?)?;
            let stored = StoredCommit {
                id: CommitId(commit.id().to_string()),
                message: commit.message().unwrap_or_default().to_string(),
                authored: DateTime::from_timestamp(commit.author().when().seconds(), 0).unwrap_or_default(),
            };
            Ok(stored)
        })
        .collect()
    }

    fn write_tree(&mut self, base: Option<&CommitId>, path: &str, contents: &[u8]) -> Result<TreeId, HistoryError> {
        let base_tree = match base {
            Some(id) => Some(self.repo.find_commit(Oid::from_str(&id.0)?)?.tree()?),
            None => None,
        };
        let blob = self.repo.blob(contents)?;
        let mut builder = self.repo.treebuilder(base_tree.as_ref())?;
        builder.insert(path, blob, FILE_MODE)?;
        Ok(TreeId(builder.write()?.to_string()))
    }

    fn create_commit(
        &mut self,
        branch: &str,
        author: &AuthorSignature,
        committer: &AuthorSignature,
        message: &str,
        tree: &TreeId,
        parents: &[CommitId],
    ) -> Result<CommitId, HistoryError> {
        let tip = self.current_tip(branch)?;
        if tip.as_ref() != parents.first() {
            return Err(HistoryError::TipMoved {
                branch: branch.to_string(),
                expected: parents.first().map(|p| p.0.clone()),
            });
        }
        let tree = self.repo.find_tree(Oid::from_str(&tree.0)?)?;
        let parents = parents
            .iter()
            .map(|id| Ok(self.repo.find_commit(Oid::from_str(&id.0)?)?))
            .collect::<Result<Vec<_>, HistoryError>>()?;
        let parent_refs: Vec<_> = parents.iter().collect();
        let author = Self::signature(author)?;
        let committer = Self::signature(committer)?;
        let refname = branch_ref(branch);
        let oid = self.repo.commit(
            Some(refname.as_str()),
            &author,
            &committer,
            message,
            &tree,
            &parent_refs,
        )?;
        debug!(branch, commit = %oid, "git_commit_written");
        Ok(CommitId(oid.to_string()))
    }
}

/// A commit held by [`MemoryHistoryStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryCommit {
    pub id: CommitId,
    pub author: AuthorSignature,
    pub committer: AuthorSignature,
    pub message: String,
    pub files: BTreeMap<String, Vec<u8>>,
    pub parents: Vec<CommitId>,
}

#[derive(Debug, Default)]
pub struct MemoryHistoryStore {
    trees: Vec<BTreeMap<String, Vec<u8>>>,
    commits: Vec<MemoryCommit>,
    branches: HashMap<String, CommitId>,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commit(&self, id: &CommitId) -> Option<&MemoryCommit> {
        self.commits.iter().find(|c| &c.id == id)
    }

    /// Commits reachable from the tip of `branch` along first parents, oldest first.
    pub fn log(&self, branch: &str) -> Vec<&MemoryCommit> {
        let mut chain = Vec::new();
        let mut next = self.branches.get(branch);
        while let Some(commit) = next.and_then(|id| self.commit(id)) {
            chain.push(commit);
            next = commit.parents.first();
        }
        chain.reverse();
        chain
    }
}

impl HistoryStore for MemoryHistoryStore {
    fn current_tip(&self, branch: &str) -> Result<Option<CommitId>, HistoryError> {
        Ok(self.branches.get(branch).cloned())
    }

    fn first_parent_log(&self, branch: &str) -> Result<Vec<StoredCommit>, HistoryError> {
        Ok(self
            .log(branch)
            .into_iter()
            .rev()
            .map(|commit| StoredCommit {
                id: commit.id.clone(),
                message: commit.message.clone(),
                authored: commit.author.timestamp,
            })
            .collect())
    }

    fn write_tree(&mut self, base: Option<&CommitId>, path: &str, contents: &[u8]) -> Result<TreeId, HistoryError> {
        let mut files = match base {
            Some(id) => self
                .commit(id)
                .ok_or_else(|| HistoryError::UnknownObject(id.0.clone()))?
                .files
                .clone(),
            None => BTreeMap::new(),
        };
        files.insert(path.to_string(), contents.to_vec());
        self.trees.push(files);
        Ok(TreeId(format!("tree-{}", self.trees.len() - 1)))
    }

    fn create_commit(
        &mut self,
        branch: &str,
        author: &AuthorSignature,
        committer: &AuthorSignature,
        message: &str,
        tree: &TreeId,
        parents: &[CommitId],
    ) -> Result<CommitId, HistoryError> {
        if self.branches.get(branch) != parents.first() {
            return Err(HistoryError::TipMoved {
                branch: branch.to_string(),
                expected: parents.first().map(|p| p.0.clone()),
            });
        }
        let files = tree
            .0
            .strip_prefix("tree-")
            .and_then(|n| n.parse::<usize>().ok())
            .and_then(|n| self.trees.get(n))
            .ok_or_else(|| HistoryError::UnknownObject(tree.0.clone()))?
            .clone();
        let id = CommitId(format!("commit-{}", self.commits.len()));
        self.commits.push(MemoryCommit {
            id: id.clone(),
            author: author.clone(),
            committer: committer.clone(),
            message: message.to_string(),
            files,
            parents: parents.to_vec(),
        });
        self.branches.insert(branch.to_string(), id.clone());
        Ok(id)
    }
}
