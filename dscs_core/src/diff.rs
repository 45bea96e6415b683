//! Staged-versus-live comparison and per-commit listings.
//!
//! Only presence and whole-content equality are reported; there is no
//! line-level diff.

use crate::error::Result;
use crate::hash::ObjectId;
use crate::repository::Repository;
use tracing::warn;

/// A staged path whose live content no longer matches the staged blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedChange {
    pub path: String,
    pub staged: ObjectId,
    pub staged_size: u64,
    pub live_size: u64,
}

/// What `diff` reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diff {
    /// Staged paths whose files on disk differ from what was staged.
    Staged(Vec<StagedChange>),
    /// What a commit set each path to.
    Commit {
        id: ObjectId,
        entries: Vec<(String, ObjectId)>,
    },
}

impl Diff {
    pub fn is_empty(&self) -> bool {
        match self {
            Diff::Staged(changes) => changes.is_empty(),
            Diff::Commit { entries, .. } => entries.is_empty(),
        }
    }
}

impl Repository {
    /// With no argument, compare every staged path's live content against
    /// the bytes of its staged blob; unreadable paths are skipped. With a
    /// (possibly abbreviated) commit id, list that commit's snapshot.
    pub fn diff(&self, commit: Option<&str>) -> Result<Diff> {
        match commit {
            Some(id) => {
                let commit = self.load_commit(id)?;
                let entries = commit
                    .snapshot()
                    .iter()
                    .map(|(path, blob)| (path.clone(), *blob))
                    .collect();
                Ok(Diff::Commit {
                    id: commit.id(),
                    entries,
                })
            }
            None => self.staged_changes().map(Diff::Staged),
        }
    }

    fn staged_changes(&self) -> Result<Vec<StagedChange>> {
        let mut changes = Vec::new();

        for (path, staged) in self.index().entries() {
            let live = match self.worktree().read(path) {
                Ok(live) => live,
                Err(e) => {
                    warn!(path = %path, error = %e, "skipping unreadable path");
                    continue;
                }
            };

            let stored = self.objects().get(staged)?;
            if live != stored {
                changes.push(StagedChange {
                    path: path.clone(),
                    staged: *staged,
                    staged_size: stored.len() as u64,
                    live_size: live.len() as u64,
                });
            }
        }

        Ok(changes)
    }
}
