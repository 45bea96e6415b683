//! # dscs core
//!
//! A local, single-user version-control engine built on a BLAKE3
//! content-addressed object store.
//!
//! Files are staged into an index that records blob identities, commits
//! snapshot the index into an acyclic graph of immutable commit nodes, named
//! branches point at commit tips, and branches merge with conflict detection
//! by blob-identity divergence.
//!
//! ## Features
//!
//! - Content-addressed, deduplicated, append-only blob storage
//! - Deterministic commit identities over a canonical encoding
//! - Branches with a symbolic HEAD
//! - First-parent history walks
//! - Two-parent merge commits, or a list of conflicting paths
//! - Crash-safe writes (temp file + rename) for every stored file
//!
//! ## Example
//!
//! ```no_run
//! use dscs_core::{InitOptions, MergeOutcome, Repository};
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut repo = Repository::init("./work", InitOptions::default())?;
//!
//! repo.stage(Path::new("notes.txt"))?;
//! let commit = repo.commit("first notes")?;
//! println!("committed {}", commit.id());
//!
//! repo.create_branch("draft")?;
//! repo.switch("draft")?;
//! repo.stage(Path::new("draft.txt"))?;
//! repo.commit("a draft")?;
//!
//! repo.switch("main")?;
//! match repo.merge("draft")? {
//!     MergeOutcome::Merged { commit, .. } => println!("merged as {}", commit),
//!     MergeOutcome::Conflict { paths } => println!("conflicts: {:?}", paths),
//! }
//! # Ok(())
//! # }
//! ```

mod commit;
mod config;
mod diff;
mod error;
mod fsutil;
mod hash;
mod history;
mod index;
mod journal;
mod merge;
mod object;
mod refs;
mod repository;
mod store;
mod worktree;

pub use commit::{Commit, MAX_PARENTS, Snapshot};
pub use config::{DEFAULT_BRANCH, RepoConfig};
pub use diff::{Diff, StagedChange};
pub use error::{Error, Result};
pub use hash::{Algorithm, ID_SIZE, MIN_PREFIX_LEN, ObjectId};
pub use history::History;
pub use index::StagingIndex;
pub use journal::{Journal, JournalEntry, RefOperation};
pub use merge::{MergeOutcome, conflict_set, merge_message, overlay};
pub use object::{CompressionType, ObjectHeader, ObjectType};
pub use refs::{RefStore, validate_branch_name};
pub use repository::{BranchInfo, InitOptions, Repository};
pub use store::ObjectStore;
pub use worktree::{DSCS_DIR, Worktree};
