//! Output formatting for CLI commands.
//!
//! Every command produces a serializable DTO; text mode renders it through a
//! closure, JSON mode prints it as-is.

use anyhow::Result;
use chrono::{DateTime, SecondsFormat, Utc};
use dscs_core::{BranchInfo, Commit, JournalEntry, ObjectId, StagedChange};
use serde::Serialize;
use std::io::{self, Write};

/// Output format selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Writer for command output with format abstraction.
pub struct OutputWriter {
    format: OutputFormat,
    stdout: io::Stdout,
}

impl OutputWriter {
    pub fn new(json: bool) -> Self {
        Self {
            format: if json {
                OutputFormat::Json
            } else {
                OutputFormat::Text
            },
            stdout: io::stdout(),
        }
    }

    pub fn is_json(&self) -> bool {
        self.format == OutputFormat::Json
    }

    /// Write `data` as JSON, or the text produced by `text_fn`.
    pub fn write<T: Serialize>(&self, data: &T, text_fn: impl FnOnce() -> String) -> Result<()> {
        match self.format {
            OutputFormat::Json => {
                let json = serde_json::to_string_pretty(data)?;
                writeln!(&self.stdout, "{}", json)?;
            }
            OutputFormat::Text => {
                let text = text_fn();
                if !text.is_empty() {
                    write!(&self.stdout, "{}", text)?;
                }
            }
        }
        Ok(())
    }

    /// Write raw bytes to stdout (blob contents).
    pub fn write_raw(&self, bytes: &[u8]) -> Result<()> {
        let mut handle = self.stdout.lock();
        handle.write_all(bytes)?;
        handle.flush()?;
        Ok(())
    }

    /// Write an error message to stderr.
    pub fn write_error(&self, error: &anyhow::Error, result_code: u8) {
        match self.format {
            OutputFormat::Json => {
                let error_output = ErrorOutput {
                    success: false,
                    result_code,
                    error: format!("{:#}", error),
                    conflicts: conflict_paths(error),
                };
                if let Ok(json) = serde_json::to_string_pretty(&error_output) {
                    let _ = writeln!(io::stderr(), "{}", json);
                }
            }
            OutputFormat::Text => {
                let _ = writeln!(io::stderr(), "Error: {:#}", error);
            }
        }
    }
}

fn conflict_paths(error: &anyhow::Error) -> Option<Vec<String>> {
    error.chain().find_map(|cause| match cause.downcast_ref::<dscs_core::Error>() {
        Some(dscs_core::Error::MergeConflict { paths }) => Some(paths.clone()),
        _ => None,
    })
}

/// RFC 3339 rendering of a Unix timestamp.
pub fn format_timestamp(timestamp: i64) -> String {
    DateTime::<Utc>::from_timestamp(timestamp, 0)
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_else(|| timestamp.to_string())
}

// ============================================================================
// Data Transfer Objects (DTOs) for JSON output
// ============================================================================

#[derive(Debug, Serialize)]
pub struct ErrorOutput {
    pub success: bool,
    pub result_code: u8,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conflicts: Option<Vec<String>>,
}

/// Output for `init`.
#[derive(Debug, Serialize)]
pub struct InitOutput {
    pub success: bool,
    pub result_code: u8,
    pub root: String,
    pub default_branch: String,
    pub algorithm: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct StagedFile {
    pub path: String,
    pub blob: ObjectId,
}

/// Output for `add`.
#[derive(Debug, Serialize)]
pub struct AddOutput {
    pub success: bool,
    pub result_code: u8,
    pub staged: Vec<StagedFile>,
}

/// Output for `commit`.
#[derive(Debug, Serialize)]
pub struct CommitOutput {
    pub success: bool,
    pub result_code: u8,
    pub branch: String,
    pub commit: ObjectId,
    pub files: usize,
}

/// One history entry.
#[derive(Debug, Clone, Serialize)]
pub struct CommitInfo {
    pub commit: ObjectId,
    pub parents: Vec<ObjectId>,
    pub message: String,
    pub timestamp: i64,
    pub timestamp_human: String,
}

impl From<&Commit> for CommitInfo {
    fn from(commit: &Commit) -> Self {
        Self {
            commit: commit.id(),
            parents: commit.parents().to_vec(),
            message: commit.message().to_string(),
            timestamp: commit.timestamp(),
            timestamp_human: format_timestamp(commit.timestamp()),
        }
    }
}

/// Output for `log`.
#[derive(Debug, Serialize)]
pub struct LogOutput {
    pub success: bool,
    pub result_code: u8,
    pub branch: String,
    pub commits: Vec<CommitInfo>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BranchEntry {
    pub name: String,
    pub tip: Option<ObjectId>,
    pub current: bool,
}

impl From<BranchInfo> for BranchEntry {
    fn from(info: BranchInfo) -> Self {
        Self {
            name: info.name,
            tip: info.tip,
            current: info.current,
        }
    }
}

/// Output for `branch` without a name.
#[derive(Debug, Serialize)]
pub struct BranchListOutput {
    pub success: bool,
    pub result_code: u8,
    pub branches: Vec<BranchEntry>,
}

/// Output for `branch <name>`.
#[derive(Debug, Serialize)]
pub struct BranchCreateOutput {
    pub success: bool,
    pub result_code: u8,
    pub name: String,
    pub tip: Option<ObjectId>,
}

/// Output for `switch`.
#[derive(Debug, Serialize)]
pub struct SwitchOutput {
    pub success: bool,
    pub result_code: u8,
    pub branch: String,
}

/// Output for a clean `merge`.
#[derive(Debug, Serialize)]
pub struct MergeOutput {
    pub success: bool,
    pub result_code: u8,
    pub branch: String,
    pub into: String,
    pub commit: ObjectId,
    pub files: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChangedFile {
    pub path: String,
    pub staged: ObjectId,
    pub staged_size: u64,
    pub live_size: u64,
}

impl From<StagedChange> for ChangedFile {
    fn from(change: StagedChange) -> Self {
        Self {
            path: change.path,
            staged: change.staged,
            staged_size: change.staged_size,
            live_size: change.live_size,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SnapshotEntry {
    pub path: String,
    pub blob: ObjectId,
}

/// Data variants for `diff`.
#[derive(Debug, Serialize)]
#[serde(tag = "type")]
pub enum DiffData {
    Staged { changes: Vec<ChangedFile> },
    Commit { commit: ObjectId, entries: Vec<SnapshotEntry> },
}

/// Output for `diff`.
#[derive(Debug, Serialize)]
pub struct DiffOutput {
    pub success: bool,
    pub result_code: u8,
    #[serde(flatten)]
    pub data: DiffData,
}

#[derive(Debug, Clone, Serialize)]
pub struct JournalEntryInfo {
    pub timestamp: i64,
    pub timestamp_human: String,
    pub operation: String,
    pub branch: String,
    pub commit: ObjectId,
    pub message: String,
}

impl From<JournalEntry> for JournalEntryInfo {
    fn from(entry: JournalEntry) -> Self {
        Self {
            timestamp: entry.timestamp,
            timestamp_human: format_timestamp(entry.timestamp),
            operation: entry.operation.as_str().to_string(),
            branch: entry.branch,
            commit: entry.commit,
            message: entry.message,
        }
    }
}

/// Output for `journal`.
#[derive(Debug, Serialize)]
pub struct JournalOutput {
    pub success: bool,
    pub result_code: u8,
    pub entries: Vec<JournalEntryInfo>,
}
