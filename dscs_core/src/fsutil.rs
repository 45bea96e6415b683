//! Crash-safe file writes.

use crate::error::{Error, Result};
use std::fs;
use std::io::Write;
use std::path::Path;

/// Replace `path` with `data` atomically.
///
/// The bytes go to a temp file in the destination directory, are synced,
/// then renamed over the target, so readers see either the old or the new
/// content and never a partial write.
pub fn atomic_write(path: &Path, data: &[u8]) -> Result<()> {
    let parent = path.parent().ok_or_else(|| {
        Error::Io {
            source: std::io::Error::other(format!("no parent directory: {}", path.display())),
        }
    })?;
    fs::create_dir_all(parent)?;

    let mut temp_file = tempfile::NamedTempFile::new_in(parent)?;
    temp_file.write_all(data)?;
    temp_file.as_file().sync_all()?;
    temp_file.persist(path)?;

    Ok(())
}
