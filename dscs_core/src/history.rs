//! First-parent history walk.

use crate::commit::Commit;
use crate::error::{Error, Result};
use crate::hash::ObjectId;
use crate::store::ObjectStore;
use std::collections::HashSet;

/// Lazy walk from a commit to its root along first parents.
///
/// Merge side branches are not expanded. Yields each commit at most once:
/// a repeated identity (only possible in a corrupted store) ends the walk
/// with an error.
pub struct History<'a> {
    store: &'a ObjectStore,
    next: Option<ObjectId>,
    seen: HashSet<ObjectId>,
}

impl<'a> History<'a> {
    pub fn new(store: &'a ObjectStore, start: Option<ObjectId>) -> Self {
        Self {
            store,
            next: start,
            seen: HashSet::new(),
        }
    }
}

impl Iterator for History<'_> {
    type Item = Result<Commit>;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next.take()?;

        if !self.seen.insert(id) {
            return Some(Err(Error::corrupted_object(
                self.store.object_path(&id),
                "commit graph contains a cycle",
            )));
        }

        match self.store.get_commit(&id) {
            Ok(commit) => {
                self.next = commit.first_parent();
                Some(Ok(commit))
            }
            Err(e) => Some(Err(e)),
        }
    }
}

impl ObjectStore {
    /// Walk history starting at `start`.
    pub fn history(&self, start: ObjectId) -> History<'_> {
        History::new(self, Some(start))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commit::Snapshot;
    use crate::hash::Algorithm;
    use tempfile::TempDir;

    fn chain(store: &ObjectStore, len: usize) -> Vec<ObjectId> {
        let mut ids = Vec::new();
        let mut parent = None;
        for i in 0..len {
            let commit = Commit::new(parent, format!("c{}", i), i as i64, Snapshot::new()).unwrap();
            let id = store.put_commit(&commit).unwrap();
            ids.push(id);
            parent = Some(id);
        }
        ids
    }

    #[test]
    fn test_walk_linear_chain_newest_first() {
        let temp_dir = TempDir::new().unwrap();
        let store = ObjectStore::init(temp_dir.path(), Algorithm::Blake3).unwrap();

        let ids = chain(&store, 3);
        let walked: Vec<_> = store
            .history(ids[2])
            .map(|c| c.unwrap().message().to_string())
            .collect();
        assert_eq!(walked, ["c2", "c1", "c0"]);
    }

    #[test]
    fn test_walk_follows_first_parent_of_merge() {
        let temp_dir = TempDir::new().unwrap();
        let store = ObjectStore::init(temp_dir.path(), Algorithm::Blake3).unwrap();

        let main = chain(&store, 2);
        let side = Commit::new(Some(main[0]), "side", 5, Snapshot::new()).unwrap();
        let side_id = store.put_commit(&side).unwrap();
        let merge = Commit::merge(main[1], side_id, "Merge branch 'side'", 6, Snapshot::new()).unwrap();
        let merge_id = store.put_commit(&merge).unwrap();

        let walked: Vec<_> = store
            .history(merge_id)
            .map(|c| c.unwrap().message().to_string())
            .collect();
        assert_eq!(walked, ["Merge branch 'side'", "c1", "c0"]);
    }

    #[test]
    fn test_walk_unknown_start() {
        let temp_dir = TempDir::new().unwrap();
        let store = ObjectStore::init(temp_dir.path(), Algorithm::Blake3).unwrap();

        let mut walk = store.history(ObjectId::for_blob(b"nothing"));
        assert!(matches!(walk.next(), Some(Err(Error::NotFound { .. }))));
        assert!(walk.next().is_none());
    }

    #[test]
    fn test_empty_walk() {
        let temp_dir = TempDir::new().unwrap();
        let store = ObjectStore::init(temp_dir.path(), Algorithm::Blake3).unwrap();
        assert_eq!(History::new(&store, None).count(), 0);
    }

    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 32,
            ..ProptestConfig::default()
        })]

        /// Walks terminate after exactly the chain length, without revisits.
        #[test]
        fn prop_walk_terminates(len in 1usize..20, start in 0usize..20) {
            let temp_dir = TempDir::new().unwrap();
            let store = ObjectStore::init(temp_dir.path(), Algorithm::Blake3).unwrap();
            let ids = chain(&store, len);
            let start = start % len;

            let walked: Vec<ObjectId> = store
                .history(ids[start])
                .map(|c| c.unwrap().id())
                .collect();
            prop_assert_eq!(walked.len(), start + 1);
            let unique: HashSet<_> = walked.iter().collect();
            prop_assert_eq!(unique.len(), walked.len());
        }
    }
}
