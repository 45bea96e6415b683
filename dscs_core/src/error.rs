//! Error types for dscs_core.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using dscs_core's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during repository operations.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error occurred during file operations.
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// JSON encoding or decoding failed.
    #[error("JSON error: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },

    /// Object file is corrupted or invalid.
    #[error("Corrupted object at {path}: {reason}")]
    CorruptedObject { path: PathBuf, reason: String },

    /// Invalid object identity format or encoding.
    #[error("Invalid object id: {reason}")]
    InvalidId { reason: String },

    /// No blob or commit with this identity was ever stored.
    #[error("Object not found: {id}")]
    NotFound { id: String },

    /// An abbreviated identity matches more than one object.
    #[error("Ambiguous object id {prefix}: {count} objects match")]
    AmbiguousId { prefix: String, count: usize },

    /// Repository is missing or structurally invalid.
    #[error("Invalid repository at {path}: {reason}")]
    InvalidRepository { path: PathBuf, reason: String },

    /// A repository already exists at the target location.
    #[error("Repository already initialized at {path}")]
    AlreadyInitialized { path: PathBuf },

    /// Branch name is not acceptable as a reference.
    #[error("Invalid branch name: {reason}")]
    InvalidBranchName { reason: String },

    /// Branch does not exist.
    #[error("Branch not found: {name}")]
    BranchNotFound { name: String },

    /// Branch already exists.
    #[error("Branch already exists: {name}")]
    BranchExists { name: String },

    /// Stage source could not be read.
    #[error("Path not found: {path}")]
    PathNotFound { path: PathBuf },

    /// Stage source lies outside the working tree.
    #[error("Path is outside the repository: {path}")]
    PathOutsideRepository { path: PathBuf },

    /// Commit attempted with nothing staged.
    #[error("Nothing to commit (staging area is empty)")]
    EmptyStagingArea,

    /// Merge has no commits to combine.
    #[error("Nothing to merge: {reason}")]
    NothingToMerge { reason: String },

    /// Merge stopped on paths whose content differs between the branches.
    #[error("Merge conflict in {} path(s): {}", paths.len(), paths.join(", "))]
    MergeConflict { paths: Vec<String> },

    /// Invalid object type.
    #[error("Invalid object type: expected {expected}, got {got}")]
    InvalidObjectType { expected: String, got: String },

    /// Object header names a compression scheme this build cannot read.
    #[error("Unsupported compression type: {value}")]
    UnsupportedCompression { value: u8 },

    /// Unsupported algorithm.
    #[error("Unsupported algorithm: {algorithm}")]
    UnsupportedAlgorithm { algorithm: String },
}

impl Error {
    /// Create a CorruptedObject error.
    pub fn corrupted_object(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Error::CorruptedObject {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create an InvalidId error.
    pub fn invalid_id(reason: impl Into<String>) -> Self {
        Error::InvalidId {
            reason: reason.into(),
        }
    }

    /// Create a NotFound error.
    pub fn not_found(id: impl Into<String>) -> Self {
        Error::NotFound { id: id.into() }
    }

    /// Create an InvalidRepository error.
    pub fn invalid_repository(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Error::InvalidRepository {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create an InvalidBranchName error.
    pub fn invalid_branch_name(reason: impl Into<String>) -> Self {
        Error::InvalidBranchName {
            reason: reason.into(),
        }
    }

    /// Create a BranchNotFound error.
    pub fn branch_not_found(name: impl Into<String>) -> Self {
        Error::BranchNotFound { name: name.into() }
    }

    /// Create a BranchExists error.
    pub fn branch_exists(name: impl Into<String>) -> Self {
        Error::BranchExists { name: name.into() }
    }

    /// Create a PathNotFound error.
    pub fn path_not_found(path: impl Into<PathBuf>) -> Self {
        Error::PathNotFound { path: path.into() }
    }

    /// Create a NothingToMerge error.
    pub fn nothing_to_merge(reason: impl Into<String>) -> Self {
        Error::NothingToMerge {
            reason: reason.into(),
        }
    }

    /// Create an InvalidObjectType error.
    pub fn invalid_object_type(expected: impl Into<String>, got: impl Into<String>) -> Self {
        Error::InvalidObjectType {
            expected: expected.into(),
            got: got.into(),
        }
    }

    /// Create an UnsupportedAlgorithm error.
    pub fn unsupported_algorithm(algorithm: impl Into<String>) -> Self {
        Error::UnsupportedAlgorithm {
            algorithm: algorithm.into(),
        }
    }
}

impl From<tempfile::PersistError> for Error {
    fn from(err: tempfile::PersistError) -> Self {
        Error::Io { source: err.error }
    }
}

impl From<ignore::Error> for Error {
    fn from(err: ignore::Error) -> Self {
        match err.io_error() {
            Some(io_err) => Error::Io {
                source: std::io::Error::new(io_err.kind(), io_err.to_string()),
            },
            None => Error::Io {
                source: std::io::Error::other(err.to_string()),
            },
        }
    }
}
