//! Append-only log of branch updates.

use crate::error::{Error, Result};
use crate::hash::ObjectId;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// File name of the journal inside the metadata directory.
const JOURNAL_FILE: &str = "journal";

/// What moved a branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefOperation {
    Commit,
    Merge,
    Branch,
}

impl RefOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            RefOperation::Commit => "commit",
            RefOperation::Merge => "merge",
            RefOperation::Branch => "branch",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "commit" => Some(RefOperation::Commit),
            "merge" => Some(RefOperation::Merge),
            "branch" => Some(RefOperation::Branch),
            _ => None,
        }
    }
}

/// A journal entry recording one branch update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalEntry {
    /// Unix timestamp when the update happened.
    pub timestamp: i64,
    pub operation: RefOperation,
    pub branch: String,
    /// The branch's new tip.
    pub commit: ObjectId,
    /// First line of the commit message, or a short description.
    pub message: String,
}

impl JournalEntry {
    pub fn new(
        timestamp: i64,
        operation: RefOperation,
        branch: impl Into<String>,
        commit: ObjectId,
        message: &str,
    ) -> Self {
        Self {
            timestamp,
            operation,
            branch: branch.into(),
            commit,
            message: message.lines().next().unwrap_or_default().to_string(),
        }
    }

    /// Serialize the entry to a pipe-delimited line. The message is last so
    /// it may itself contain pipes.
    pub fn to_line(&self) -> String {
        format!(
            "{}|{}|{}|{}|{}",
            self.timestamp,
            self.operation.as_str(),
            self.branch,
            self.commit,
            self.message
        )
    }

    /// Parse a journal entry from a pipe-delimited line.
    pub fn from_line(line: &str) -> Result<Self> {
        let parts: Vec<&str> = line.splitn(5, '|').collect();
        if parts.len() != 5 {
            return Err(Error::invalid_repository(
                JOURNAL_FILE,
                format!(
                    "Invalid journal entry format: expected 5 fields, got {}",
                    parts.len()
                ),
            ));
        }

        let timestamp = parts[0].parse::<i64>().map_err(|_| {
            Error::invalid_repository(
                JOURNAL_FILE,
                format!("Invalid timestamp in journal entry: {}", parts[0]),
            )
        })?;

        let operation = RefOperation::parse(parts[1]).ok_or_else(|| {
            Error::invalid_repository(
                JOURNAL_FILE,
                format!("Invalid operation in journal entry: {}", parts[1]),
            )
        })?;

        let commit = ObjectId::from_hex(parts[3]).map_err(|e| {
            Error::invalid_repository(JOURNAL_FILE, format!("Invalid commit in journal entry: {}", e))
        })?;

        Ok(Self {
            timestamp,
            operation,
            branch: parts[2].to_string(),
            commit,
            message: parts[4].to_string(),
        })
    }
}

#[derive(Debug)]
pub struct Journal {
    path: PathBuf,
}

impl Journal {
    /// Open or create a journal at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if !path.exists() {
            File::create(&path)?;
        }

        Ok(Self { path })
    }

    /// Append an entry to the journal.
    pub fn append(&self, entry: &JournalEntry) -> Result<()> {
        let mut file = OpenOptions::new().append(true).open(&self.path)?;
        writeln!(file, "{}", entry.to_line())?;
        file.sync_data()?;
        Ok(())
    }

    /// Read the most recent `count` entries, oldest first. Unparseable lines
    /// (e.g. a torn final write) are skipped.
    pub fn read_recent(&self, count: usize) -> Result<Vec<JournalEntry>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let reader = BufReader::new(File::open(&self.path)?);

        let mut entries = Vec::new();
        for line in reader.lines() {
            let line = line?;
            let line = line.trim_end();
            if line.is_empty() {
                continue;
            }

            if let Ok(entry) = JournalEntry::from_line(line) {
                entries.push(entry);
            }
        }

        let skip = entries.len().saturating_sub(count);
        Ok(entries.split_off(skip))
    }
}
