//! Commit nodes and their canonical encoding.
//!
//! A commit's identity is a keyed BLAKE3 digest over compact JSON with a
//! fixed field order:
//!
//! ```text
//! {"parents":["<hex>",...],"message":"...","timestamp":<i64>,"snapshot":{"<path>":"<hex>",...}}
//! ```
//!
//! Snapshot keys are sorted, so equal content always encodes to equal bytes.

use crate::error::{Error, Result};
use crate::hash::ObjectId;
use crate::object::{CompressionType, ObjectType};
use crate::store::ObjectStore;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Flat mapping of repository-relative path to blob identity.
pub type Snapshot = BTreeMap<String, ObjectId>;

/// Maximum number of parents a commit may reference.
pub const MAX_PARENTS: usize = 2;

/// An immutable commit node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    id: ObjectId,
    parents: Vec<ObjectId>,
    message: String,
    timestamp: i64,
    snapshot: Snapshot,
}

#[derive(Serialize)]
struct CommitBody<'a> {
    parents: &'a [ObjectId],
    message: &'a str,
    timestamp: i64,
    snapshot: &'a Snapshot,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct OwnedCommitBody {
    parents: Vec<ObjectId>,
    message: String,
    timestamp: i64,
    snapshot: Snapshot,
}

impl Commit {
    /// Build a commit with at most one parent (`None` for a root commit).
    pub fn new(
        parent: Option<ObjectId>,
        message: impl Into<String>,
        timestamp: i64,
        snapshot: Snapshot,
    ) -> Result<Self> {
        Self::from_parts(parent.into_iter().collect(), message.into(), timestamp, snapshot)
    }

    /// Build a two-parent merge commit. `first` is the tip of the branch being
    /// merged into, `second` the tip of the merged-in branch.
    pub fn merge(
        first: ObjectId,
        second: ObjectId,
        message: impl Into<String>,
        timestamp: i64,
        snapshot: Snapshot,
    ) -> Result<Self> {
        Self::from_parts(vec![first, second], message.into(), timestamp, snapshot)
    }

    fn from_parts(
        parents: Vec<ObjectId>,
        message: String,
        timestamp: i64,
        snapshot: Snapshot,
    ) -> Result<Self> {
        let id = ObjectId::for_commit(&encode_body(&parents, &message, timestamp, &snapshot)?);
        Ok(Self {
            id,
            parents,
            message,
            timestamp,
            snapshot,
        })
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn parents(&self) -> &[ObjectId] {
        &self.parents
    }

    /// The first-listed parent, followed by history walks.
    pub fn first_parent(&self) -> Option<ObjectId> {
        self.parents.first().copied()
    }

    pub fn is_merge(&self) -> bool {
        self.parents.len() == MAX_PARENTS
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Creation time in Unix seconds.
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    /// Canonical bytes the identity is computed over.
    pub fn encode(&self) -> Result<Vec<u8>> {
        encode_body(&self.parents, &self.message, self.timestamp, &self.snapshot)
    }

    /// Decode canonical bytes, checking them against the expected identity.
    pub fn decode(bytes: &[u8], expected: &ObjectId) -> std::result::Result<Self, String> {
        let body: OwnedCommitBody =
            serde_json::from_slice(bytes).map_err(|e| format!("Invalid commit encoding: {}", e))?;

        if body.parents.len() > MAX_PARENTS {
            return Err(format!(
                "Commit has {} parents (max {})",
                body.parents.len(),
                MAX_PARENTS
            ));
        }

        let commit = Self::from_parts(body.parents, body.message, body.timestamp, body.snapshot)
            .map_err(|e| e.to_string())?;
        if commit.id != *expected {
            return Err(format!(
                "Hash mismatch: expected {}, got {}",
                expected, commit.id
            ));
        }
        Ok(commit)
    }
}

fn encode_body(
    parents: &[ObjectId],
    message: &str,
    timestamp: i64,
    snapshot: &Snapshot,
) -> Result<Vec<u8>> {
    let body = CommitBody {
        parents,
        message,
        timestamp,
        snapshot,
    };
    Ok(serde_json::to_vec(&body)?)
}

impl ObjectStore {
    /// Persist a commit. Writing an already stored commit is a no-op.
    pub fn put_commit(&self, commit: &Commit) -> Result<ObjectId> {
        let id = commit.id();
        if self.contains(&id) {
            debug!(commit = %id.short(), "commit already present");
            return Ok(id);
        }
        self.write_object(&id, ObjectType::Commit, CompressionType::None, &commit.encode()?)?;
        debug!(commit = %id.short(), parents = commit.parents().len(), "stored commit");
        Ok(id)
    }

    /// Load a commit by identity.
    pub fn get_commit(&self, id: &ObjectId) -> Result<Commit> {
        let payload = self.read_object(id, ObjectType::Commit)?;
        Commit::decode(&payload, id).map_err(|reason| Error::corrupted_object(self.object_path(id), reason))
    }
}
