//! Staging index.
//!
//! Maps repository-relative paths to the blob identities that the next commit
//! will record. Stored as a JSON object in `.dscs/index`; raw content lives
//! only in the object store.

use crate::commit::Snapshot;
use crate::error::Result;
use crate::fsutil::atomic_write;
use crate::hash::ObjectId;
use crate::store::ObjectStore;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug)]
pub struct StagingIndex {
    path: PathBuf,
    entries: Snapshot,
}

impl StagingIndex {
    /// Create an empty index file at `path`.
    pub fn init<P: AsRef<Path>>(path: P) -> Result<Self> {
        let index = Self {
            path: path.as_ref().to_path_buf(),
            entries: Snapshot::new(),
        };
        index.save()?;
        Ok(index)
    }

    /// Load the index from `path`; a missing file is an empty index.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            return Ok(Self {
                path,
                entries: Snapshot::new(),
            });
        }

        let data = fs::read_to_string(&path)?;
        let entries = if data.trim().is_empty() {
            Snapshot::new()
        } else {
            serde_json::from_str(&data)?
        };
        Ok(Self { path, entries })
    }

    fn save(&self) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.entries)?;
        atomic_write(&self.path, json.as_bytes())
    }

    /// Store `data` as a blob and record `path -> blob` (replacing any
    /// previous entry for the path).
    pub fn stage(&mut self, store: &ObjectStore, path: &str, data: &[u8]) -> Result<ObjectId> {
        let id = store.put(data)?;
        self.insert(path, id)?;
        Ok(id)
    }

    /// Record many already stored blobs with a single index write.
    pub(crate) fn insert_all(&mut self, staged: &[(String, ObjectId)]) -> Result<()> {
        let previous = self.entries.clone();
        for (path, id) in staged {
            self.entries.insert(path.clone(), *id);
        }
        if let Err(e) = self.save() {
            self.entries = previous;
            return Err(e);
        }
        debug!(count = staged.len(), "staged entries");
        Ok(())
    }

    fn insert(&mut self, path: &str, id: ObjectId) -> Result<()> {
        let previous = self.entries.insert(path.to_string(), id);
        if let Err(e) = self.save() {
            match previous {
                Some(old) => self.entries.insert(path.to_string(), old),
                None => self.entries.remove(path),
            };
            return Err(e);
        }
        debug!(path, blob = %id.short(), "staged");
        Ok(())
    }

    /// The current path -> blob mapping.
    pub fn entries(&self) -> &Snapshot {
        &self.entries
    }

    pub fn get(&self, path: &str) -> Option<&ObjectId> {
        self.entries.get(path)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Empty the index on disk and in memory.
    pub fn clear(&mut self) -> Result<()> {
        let previous = std::mem::take(&mut self.entries);
        if let Err(e) = self.save() {
            self.entries = previous;
            return Err(e);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::Algorithm;
    use tempfile::TempDir;

    fn setup(temp_dir: &TempDir) -> (ObjectStore, StagingIndex) {
        let store = ObjectStore::init(temp_dir.path().join("objects"), Algorithm::Blake3).unwrap();
        let index = StagingIndex::init(temp_dir.path().join("index")).unwrap();
        (store, index)
    }

    #[test]
    fn test_init_writes_empty_object() {
        let temp_dir = TempDir::new().unwrap();
        let (_, index) = setup(&temp_dir);

        assert!(index.is_empty());
        assert_eq!(fs::read_to_string(temp_dir.path().join("index")).unwrap(), "{}");
    }

    #[test]
    fn test_stage_stores_blob_and_persists() {
        let temp_dir = TempDir::new().unwrap();
        let (store, mut index) = setup(&temp_dir);

        let id = index.stage(&store, "f.txt", b"hello").unwrap();
        assert_eq!(store.get(&id).unwrap(), b"hello");
        assert_eq!(index.get("f.txt"), Some(&id));

        let reloaded = StagingIndex::load(temp_dir.path().join("index")).unwrap();
        assert_eq!(reloaded.entries(), index.entries());
    }

    #[test]
    fn test_stage_upserts() {
        let temp_dir = TempDir::new().unwrap();
        let (store, mut index) = setup(&temp_dir);

        index.stage(&store, "f.txt", b"one").unwrap();
        let second = index.stage(&store, "f.txt", b"two").unwrap();

        assert_eq!(index.len(), 1);
        assert_eq!(index.get("f.txt"), Some(&second));
    }

    #[test]
    fn test_clear() {
        let temp_dir = TempDir::new().unwrap();
        let (store, mut index) = setup(&temp_dir);

        index.stage(&store, "a", b"1").unwrap();
        index.clear().unwrap();

        assert!(index.is_empty());
        assert!(StagingIndex::load(temp_dir.path().join("index")).unwrap().is_empty());
    }

    #[test]
    fn test_load_missing_or_blank() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("index");
        assert!(StagingIndex::load(&path).unwrap().is_empty());

        fs::write(&path, "").unwrap();
        assert!(StagingIndex::load(&path).unwrap().is_empty());

        fs::write(&path, "not json").unwrap();
        assert!(StagingIndex::load(&path).is_err());
    }
}
