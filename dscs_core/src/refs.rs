//! Branch references and the symbolic HEAD.

use crate::error::{Error, Result};
use crate::fsutil::atomic_write;
use crate::hash::ObjectId;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Prefix of the single line stored in `HEAD`.
const HEAD_PREFIX: &str = "ref: refs/heads/";

/// Branch pointers under `refs/heads/` plus the `HEAD` file naming the
/// current branch.
///
/// A branch file holds a commit id in hex, or nothing when the branch has no
/// commits yet. HEAD is always symbolic; it never holds a commit id.
#[derive(Debug)]
pub struct RefStore {
    root: PathBuf,
}

impl RefStore {
    /// Create the ref layout with one empty `default_branch` made current.
    pub fn init<P: AsRef<Path>>(root: P, default_branch: &str) -> Result<Self> {
        let refs = Self {
            root: root.as_ref().to_path_buf(),
        };
        fs::create_dir_all(refs.heads_dir())?;
        refs.write_tip(default_branch, None)?;
        refs.write_head(default_branch)?;
        Ok(refs)
    }

    /// Open an existing ref layout.
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        let refs = Self {
            root: root.as_ref().to_path_buf(),
        };
        if !refs.heads_dir().is_dir() {
            return Err(Error::invalid_repository(&refs.root, "refs directory missing"));
        }
        if !refs.head_path().is_file() {
            return Err(Error::invalid_repository(&refs.root, "HEAD missing"));
        }
        Ok(refs)
    }

    fn heads_dir(&self) -> PathBuf {
        self.root.join("refs").join("heads")
    }

    fn head_path(&self) -> PathBuf {
        self.root.join("HEAD")
    }

    /// Get the path to a branch file, validating the name.
    fn branch_path(&self, name: &str) -> Result<PathBuf> {
        validate_branch_name(name)?;
        Ok(self.heads_dir().join(name))
    }

    /// Path of an existing branch. Names that could never have been created
    /// are simply not found.
    fn existing_branch_path(&self, name: &str) -> Result<PathBuf> {
        if validate_branch_name(name).is_err() {
            return Err(Error::branch_not_found(name));
        }
        let path = self.heads_dir().join(name);
        if !path.is_file() {
            return Err(Error::branch_not_found(name));
        }
        Ok(path)
    }

    pub fn exists(&self, name: &str) -> bool {
        self.existing_branch_path(name).is_ok()
    }

    /// Name of the current branch.
    pub fn current_branch(&self) -> Result<String> {
        let path = self.head_path();
        let content = fs::read_to_string(&path)?;
        let name = content
            .trim()
            .strip_prefix(HEAD_PREFIX)
            .ok_or_else(|| Error::invalid_repository(&path, "HEAD is not a symbolic ref"))?;
        validate_branch_name(name)?;
        Ok(name.to_string())
    }

    /// Tip of `name`, or `None` when the branch has no commits.
    pub fn tip(&self, name: &str) -> Result<Option<ObjectId>> {
        let path = self.existing_branch_path(name)?;
        let content = fs::read_to_string(&path)?;
        let line = content.trim();
        if line.is_empty() {
            return Ok(None);
        }

        ObjectId::from_hex(line)
            .map(Some)
            .map_err(|e| Error::invalid_repository(&path, format!("malformed ref: {}", e)))
    }

    /// Tip of the current branch.
    pub fn current_tip(&self) -> Result<Option<ObjectId>> {
        self.tip(&self.current_branch()?)
    }

    /// Create `name` at the current branch's tip (empty if it has none).
    pub fn create_branch(&self, name: &str) -> Result<Option<ObjectId>> {
        validate_branch_name(name)?;
        if self.exists(name) {
            return Err(Error::branch_exists(name));
        }
        let tip = self.current_tip()?;
        self.write_tip(name, tip)?;
        info!(branch = name, tip = ?tip.map(|id| id.short()), "created branch");
        Ok(tip)
    }

    /// Point an existing branch at `id`.
    pub fn set_tip(&self, name: &str, id: ObjectId) -> Result<()> {
        self.existing_branch_path(name)?;
        self.write_tip(name, Some(id))?;
        info!(branch = name, tip = %id.short(), "advanced branch");
        Ok(())
    }

    /// Make `name` the current branch. The working tree is not touched.
    pub fn switch(&self, name: &str) -> Result<()> {
        self.existing_branch_path(name)?;
        self.write_head(name)?;
        info!(branch = name, "switched branch");
        Ok(())
    }

    /// All branches with their tips, sorted by name.
    pub fn list(&self) -> Result<Vec<(String, Option<ObjectId>)>> {
        let mut branches = Vec::new();

        for entry in fs::read_dir(self.heads_dir())? {
            let entry = entry?;
            let path = entry.path();

            if path.is_file()
                && let Some(name) = path.file_name().and_then(|n| n.to_str())
                && validate_branch_name(name).is_ok()
            {
                branches.push((name.to_string(), self.tip(name)?));
            }
        }

        branches.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(branches)
    }

    fn write_tip(&self, name: &str, tip: Option<ObjectId>) -> Result<()> {
        let path = self.branch_path(name)?;
        let content = match tip {
            Some(id) => format!("{}\n", id.to_hex()),
            None => String::new(),
        };
        atomic_write(&path, content.as_bytes())
    }

    fn write_head(&self, name: &str) -> Result<()> {
        validate_branch_name(name)?;
        atomic_write(&self.head_path(), format!("{}{}\n", HEAD_PREFIX, name).as_bytes())
    }
}

/// Reject names that could escape `refs/heads/` or confuse the file layout.
pub fn validate_branch_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::invalid_branch_name("Branch name cannot be empty"));
    }

    if name.contains("..") || name.contains('/') || name.contains('\\') {
        return Err(Error::invalid_branch_name(format!(
            "{} (must not contain .. or path separators)",
            name
        )));
    }

    // The journal is '|'-delimited.
    if name.contains('|') {
        return Err(Error::invalid_branch_name(format!(
            "{} (must not contain '|')",
            name
        )));
    }

    if name.starts_with('.') || name.starts_with('-') {
        return Err(Error::invalid_branch_name(format!(
            "{} (must not start with '.' or '-')",
            name
        )));
    }

    if name.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(Error::invalid_branch_name(format!(
            "{:?} (must not contain whitespace or control characters)",
            name
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn new_refs(temp_dir: &TempDir) -> RefStore {
        RefStore::init(temp_dir.path(), "main").unwrap()
    }

    #[test]
    fn test_init_creates_empty_default_branch() {
        let temp_dir = TempDir::new().unwrap();
        let refs = new_refs(&temp_dir);

        assert_eq!(refs.current_branch().unwrap(), "main");
        assert_eq!(refs.tip("main").unwrap(), None);
        assert_eq!(
            fs::read_to_string(temp_dir.path().join("HEAD")).unwrap(),
            "ref: refs/heads/main\n"
        );
    }

    #[test]
    fn test_open_requires_layout() {
        let temp_dir = TempDir::new().unwrap();
        assert!(matches!(
            RefStore::open(temp_dir.path()),
            Err(Error::InvalidRepository { .. })
        ));

        new_refs(&temp_dir);
        assert!(RefStore::open(temp_dir.path()).is_ok());
    }

    #[test]
    fn test_set_tip_and_read_back() {
        let temp_dir = TempDir::new().unwrap();
        let refs = new_refs(&temp_dir);

        let id = ObjectId::for_blob(b"c1");
        refs.set_tip("main", id).unwrap();
        assert_eq!(refs.tip("main").unwrap(), Some(id));
        assert_eq!(refs.current_tip().unwrap(), Some(id));
    }

    #[test]
    fn test_create_branch_snapshots_current_tip() {
        let temp_dir = TempDir::new().unwrap();
        let refs = new_refs(&temp_dir);

        let first = ObjectId::for_blob(b"c1");
        refs.set_tip("main", first).unwrap();
        assert_eq!(refs.create_branch("feature").unwrap(), Some(first));

        let second = ObjectId::for_blob(b"c2");
        refs.set_tip("main", second).unwrap();

        assert_eq!(refs.tip("feature").unwrap(), Some(first));
        assert_eq!(refs.tip("main").unwrap(), Some(second));
    }

    #[test]
    fn test_create_branch_from_empty_branch() {
        let temp_dir = TempDir::new().unwrap();
        let refs = new_refs(&temp_dir);

        assert_eq!(refs.create_branch("dev").unwrap(), None);
        assert_eq!(refs.tip("dev").unwrap(), None);
    }

    #[test]
    fn test_create_existing_branch_fails() {
        let temp_dir = TempDir::new().unwrap();
        let refs = new_refs(&temp_dir);

        assert!(matches!(
            refs.create_branch("main"),
            Err(Error::BranchExists { .. })
        ));
    }

    #[test]
    fn test_switch() {
        let temp_dir = TempDir::new().unwrap();
        let refs = new_refs(&temp_dir);

        refs.create_branch("dev").unwrap();
        refs.switch("dev").unwrap();
        assert_eq!(refs.current_branch().unwrap(), "dev");

        assert!(matches!(
            refs.switch("missing"),
            Err(Error::BranchNotFound { .. })
        ));
        assert_eq!(refs.current_branch().unwrap(), "dev");
    }

    #[test]
    fn test_tip_of_missing_branch() {
        let temp_dir = TempDir::new().unwrap();
        let refs = new_refs(&temp_dir);

        assert!(matches!(refs.tip("nope"), Err(Error::BranchNotFound { .. })));
        assert!(matches!(
            refs.set_tip("nope", ObjectId::for_blob(b"x")),
            Err(Error::BranchNotFound { .. })
        ));
    }

    #[test]
    fn test_list_sorted_with_tips() {
        let temp_dir = TempDir::new().unwrap();
        let refs = new_refs(&temp_dir);

        let id = ObjectId::for_blob(b"c1");
        refs.set_tip("main", id).unwrap();
        refs.create_branch("zeta").unwrap();
        refs.create_branch("alpha").unwrap();

        let list = refs.list().unwrap();
        let names: Vec<_> = list.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, ["alpha", "main", "zeta"]);
        assert!(list.iter().all(|(_, tip)| *tip == Some(id)));
    }

    #[test]
    fn test_malformed_ref_is_reported() {
        let temp_dir = TempDir::new().unwrap();
        let refs = new_refs(&temp_dir);

        fs::write(temp_dir.path().join("refs/heads/main"), "garbage\n").unwrap();
        assert!(matches!(refs.tip("main"), Err(Error::InvalidRepository { .. })));
    }

    #[test]
    fn test_lookup_of_unrepresentable_name_is_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let refs = new_refs(&temp_dir);

        assert!(matches!(refs.switch("feature/x"), Err(Error::BranchNotFound { .. })));
        assert!(matches!(refs.tip("../main"), Err(Error::BranchNotFound { .. })));
        assert!(!refs.exists("a b"));
        assert!(matches!(
            refs.create_branch("feature/x"),
            Err(Error::InvalidBranchName { .. })
        ));
        assert_eq!(refs.current_branch().unwrap(), "main");
    }

    #[test]
    fn test_invalid_branch_names() {
        for name in ["", "../etc", "a/b", "a\\b", ".hidden", "-x", "has space", "tab\t", "x|y"] {
            assert!(
                validate_branch_name(name).is_err(),
                "{:?} should be rejected",
                name
            );
        }
    }

    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 128,
            ..ProptestConfig::default()
        })]

        #[test]
        fn prop_valid_branch_names_accepted(name in "[a-zA-Z0-9_][a-zA-Z0-9_-]{0,40}") {
            let temp_dir = TempDir::new().unwrap();
            let refs = new_refs(&temp_dir);

            if name != "main" {
                prop_assert!(refs.create_branch(&name).is_ok());
            }
            prop_assert!(refs.exists(&name));
        }
    }
}
