//! Branch merging.
//!
//! Conflicts are detected purely by identity divergence at matching paths:
//! a path present in both tip snapshots with different blob ids conflicts,
//! anything else is carried forward. There is no common-ancestor
//! comparison, so edits that converge independently merge cleanly and a
//! path changed on one side but absent on the other is always taken.

use crate::commit::{Commit, Snapshot};
use crate::error::{Error, Result};
use crate::hash::ObjectId;
use crate::journal::{JournalEntry, RefOperation};
use crate::repository::{Repository, now_timestamp};
use tracing::info;

/// Result of a merge attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    /// A two-parent commit was written and the current branch advanced to it.
    Merged { commit: ObjectId, snapshot: Snapshot },
    /// Nothing was written; these paths differ between the two tips.
    Conflict { paths: Vec<String> },
}

impl MergeOutcome {
    /// Treat a conflict as a failure.
    pub fn into_result(self) -> Result<(ObjectId, Snapshot)> {
        match self {
            MergeOutcome::Merged { commit, snapshot } => Ok((commit, snapshot)),
            MergeOutcome::Conflict { paths } => Err(Error::MergeConflict { paths }),
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, MergeOutcome::Conflict { .. })
    }
}

/// Paths present in both snapshots whose blob ids differ. Sorted.
pub fn conflict_set(current: &Snapshot, target: &Snapshot) -> Vec<String> {
    target
        .iter()
        .filter(|(path, id)| current.get(*path).is_some_and(|ours| ours != *id))
        .map(|(path, _)| path.clone())
        .collect()
}

/// `target` laid over `current`; target entries win on shared paths.
pub fn overlay(current: &Snapshot, target: &Snapshot) -> Snapshot {
    let mut merged = current.clone();
    merged.extend(target.iter().map(|(path, id)| (path.clone(), *id)));
    merged
}

pub fn merge_message(branch: &str) -> String {
    format!("Merge branch '{}'", branch)
}

impl Repository {
    /// Merge `branch` into the current branch.
    ///
    /// On conflict nothing is written. Otherwise a commit with parents
    /// `(current tip, branch tip)` is stored and the current branch advances
    /// to it; `branch` itself is left where it was.
    pub fn merge(&mut self, branch: &str) -> Result<MergeOutcome> {
        let current = self.refs().current_branch()?;
        let target_tip = self.refs().tip(branch)?;
        let current_tip = self.refs().tip(&current)?;

        let (Some(current_tip), Some(target_tip)) = (current_tip, target_tip) else {
            return Err(Error::nothing_to_merge(format!(
                "'{}' or '{}' has no commits",
                current, branch
            )));
        };

        if current_tip == target_tip {
            return Err(Error::nothing_to_merge(format!(
                "'{}' is already up to date with '{}'",
                current, branch
            )));
        }

        let ours = self.objects().get_commit(&current_tip)?;
        let theirs = self.objects().get_commit(&target_tip)?;

        let paths = conflict_set(ours.snapshot(), theirs.snapshot());
        if !paths.is_empty() {
            info!(branch, conflicts = paths.len(), "merge stopped on conflicts");
            return Ok(MergeOutcome::Conflict { paths });
        }

        let snapshot = overlay(ours.snapshot(), theirs.snapshot());
        let message = merge_message(branch);
        let commit = Commit::merge(
            current_tip,
            target_tip,
            message.as_str(),
            now_timestamp(),
            snapshot.clone(),
        )?;

        let id = self.objects().put_commit(&commit)?;
        self.refs().set_tip(&current, id)?;
        self.record(&JournalEntry::new(
            commit.timestamp(),
            RefOperation::Merge,
            current.as_str(),
            id,
            &message,
        ));

        info!(branch, into = %current, commit = %id.short(), "merged");
        Ok(MergeOutcome::Merged {
            commit: id,
            snapshot,
        })
    }
}
