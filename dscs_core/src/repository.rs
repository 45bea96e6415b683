//! The repository handle.

use crate::commit::Commit;
use crate::config::{DEFAULT_BRANCH, RepoConfig};
use crate::error::{Error, Result};
use crate::fsutil::atomic_write;
use crate::hash::ObjectId;
use crate::history::History;
use crate::index::StagingIndex;
use crate::journal::{Journal, JournalEntry, RefOperation};
use crate::object::ObjectType;
use crate::refs::{RefStore, validate_branch_name};
use crate::store::ObjectStore;
use crate::worktree::{DSCS_DIR, Worktree};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};

/// Options for [`Repository::init`].
#[derive(Debug, Clone)]
pub struct InitOptions {
    pub default_branch: String,
}

impl Default for InitOptions {
    fn default() -> Self {
        Self {
            default_branch: DEFAULT_BRANCH.to_string(),
        }
    }
}

/// A branch as reported by [`Repository::branches`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchInfo {
    pub name: String,
    pub tip: Option<ObjectId>,
    pub current: bool,
}

/// One repository: its object store, references, staging index and
/// journal, rooted at a working tree.
///
/// Layout under `<worktree>/.dscs/`:
/// - `config` with version, algorithm and default branch
/// - `HEAD` naming the current branch
/// - `index` with the staged path -> blob mapping
/// - `journal` of branch updates
/// - `objects/{algorithm}/` for blobs and commits
/// - `refs/heads/` with one file per branch
#[derive(Debug)]
pub struct Repository {
    worktree: Worktree,
    meta_dir: PathBuf,
    config: RepoConfig,
    objects: ObjectStore,
    refs: RefStore,
    index: StagingIndex,
    journal: Journal,
}

impl Repository {
    /// Create an empty repository in `worktree` with one empty default branch.
    pub fn init<P: AsRef<Path>>(worktree: P, options: InitOptions) -> Result<Self> {
        validate_branch_name(&options.default_branch)?;

        let root = worktree.as_ref();
        fs::create_dir_all(root)?;
        let root = fs::canonicalize(root)?;

        let meta_dir = root.join(DSCS_DIR);
        if meta_dir.exists() {
            return Err(Error::AlreadyInitialized { path: meta_dir });
        }

        let config = RepoConfig {
            default_branch: options.default_branch,
            ..RepoConfig::default()
        };

        fs::create_dir_all(&meta_dir)?;
        let objects = ObjectStore::init(meta_dir.join("objects"), config.algorithm)?;
        let refs = RefStore::init(&meta_dir, &config.default_branch)?;
        let index = StagingIndex::init(meta_dir.join("index"))?;
        let journal = Journal::open(meta_dir.join("journal"))?;
        // Written last: a directory without config is not a repository yet.
        atomic_write(&meta_dir.join("config"), config.render().as_bytes())?;

        info!(path = %root.display(), branch = %config.default_branch, "initialized repository");

        Ok(Self {
            worktree: Worktree::new(root),
            meta_dir,
            config,
            objects,
            refs,
            index,
            journal,
        })
    }

    /// Open the repository whose working tree root is `worktree`.
    pub fn open<P: AsRef<Path>>(worktree: P) -> Result<Self> {
        let root = worktree.as_ref();
        let meta_dir = root.join(DSCS_DIR);
        if !meta_dir.is_dir() {
            return Err(Error::invalid_repository(root, "not a dscs repository"));
        }
        let root = fs::canonicalize(root)?;
        let meta_dir = root.join(DSCS_DIR);

        let config_path = meta_dir.join("config");
        if !config_path.is_file() {
            return Err(Error::invalid_repository(&meta_dir, "config file not found"));
        }
        let config = RepoConfig::parse(&fs::read_to_string(&config_path)?)?;

        let objects = ObjectStore::open(meta_dir.join("objects"), config.algorithm)?;
        let refs = RefStore::open(&meta_dir)?;
        let index = StagingIndex::load(meta_dir.join("index"))?;
        let journal = Journal::open(meta_dir.join("journal"))?;

        debug!(path = %root.display(), "opened repository");

        Ok(Self {
            worktree: Worktree::new(root),
            meta_dir,
            config,
            objects,
            refs,
            index,
            journal,
        })
    }

    /// Open the repository containing `start`, searching parent directories.
    pub fn discover<P: AsRef<Path>>(start: P) -> Result<Self> {
        let start = fs::canonicalize(start.as_ref())?;
        for dir in start.ancestors() {
            if dir.join(DSCS_DIR).is_dir() {
                return Self::open(dir);
            }
        }
        Err(Error::invalid_repository(start, "not a dscs repository (or any parent)"))
    }

    pub fn worktree(&self) -> &Worktree {
        &self.worktree
    }

    /// The `.dscs` directory.
    pub fn meta_dir(&self) -> &Path {
        &self.meta_dir
    }

    pub fn config(&self) -> &RepoConfig {
        &self.config
    }

    pub fn objects(&self) -> &ObjectStore {
        &self.objects
    }

    pub fn refs(&self) -> &RefStore {
        &self.refs
    }

    pub fn index(&self) -> &StagingIndex {
        &self.index
    }

    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    /// Stage a file, or every file below a directory.
    ///
    /// Returns the staged `(path, blob)` pairs. Fails with `PathNotFound` if
    /// the source cannot be read; in that case nothing is staged.
    pub fn stage(&mut self, path: &Path) -> Result<Vec<(String, ObjectId)>> {
        let (absolute, key) = self.worktree.resolve(path)?;

        let metadata = fs::metadata(&absolute).map_err(|_| Error::path_not_found(path))?;
        if metadata.is_dir() {
            let staged = self.store_tree(&absolute)?;
            self.index.insert_all(&staged)?;
            info!(path = %path.display(), files = staged.len(), "staged directory");
            return Ok(staged);
        }

        let data = fs::read(&absolute).map_err(|_| Error::path_not_found(path))?;
        let id = self.index.stage(&self.objects, &key, &data)?;
        info!(path = %key, blob = %id.short(), "staged file");
        Ok(vec![(key, id)])
    }

    /// Stage several files or directories with a single index write.
    ///
    /// Every source is read before the index changes, so if any of them is
    /// missing nothing is staged.
    pub fn stage_all<P: AsRef<Path>>(&mut self, paths: &[P]) -> Result<Vec<(String, ObjectId)>> {
        let mut staged = Vec::new();
        for path in paths {
            let path = path.as_ref();
            let (absolute, key) = self.worktree.resolve(path)?;
            let metadata = fs::metadata(&absolute).map_err(|_| Error::path_not_found(path))?;
            if metadata.is_dir() {
                staged.extend(self.store_tree(&absolute)?);
            } else {
                let data = fs::read(&absolute).map_err(|_| Error::path_not_found(path))?;
                staged.push((key, self.objects.put(&data)?));
            }
        }

        self.index.insert_all(&staged)?;
        info!(paths = paths.len(), files = staged.len(), "staged");
        Ok(staged)
    }

    /// Store every file below `dir` as a blob without touching the index.
    fn store_tree(&self, dir: &Path) -> Result<Vec<(String, ObjectId)>> {
        let mut stored = Vec::new();
        for file in self.worktree.walk_files(dir)? {
            let (_, key) = self.worktree.resolve(&file)?;
            let data = fs::read(&file).map_err(|_| Error::path_not_found(&file))?;
            stored.push((key, self.objects.put(&data)?));
        }
        Ok(stored)
    }

    /// Record the staging index as a new commit on the current branch.
    ///
    /// The commit's only parent is the branch tip (none for an empty
    /// branch). On success the branch advances and the index is emptied.
    pub fn commit(&mut self, message: &str) -> Result<Commit> {
        if self.index.is_empty() {
            return Err(Error::EmptyStagingArea);
        }

        let branch = self.refs.current_branch()?;
        let parent = self.refs.tip(&branch)?;
        let commit = Commit::new(parent, message, now_timestamp(), self.index.entries().clone())?;

        let id = self.objects.put_commit(&commit)?;
        self.refs.set_tip(&branch, id)?;
        self.index.clear()?;
        self.record(&JournalEntry::new(
            commit.timestamp(),
            RefOperation::Commit,
            branch.as_str(),
            id,
            message,
        ));

        info!(branch = %branch, commit = %id.short(), files = commit.snapshot().len(), "committed");
        Ok(commit)
    }

    /// History of the current branch, newest first. Empty for a branch
    /// without commits.
    pub fn log(&self) -> Result<History<'_>> {
        Ok(History::new(&self.objects, self.refs.current_tip()?))
    }

    /// History starting at a (possibly abbreviated) commit id.
    pub fn walk_history(&self, start: &str) -> Result<History<'_>> {
        let commit = self.load_commit(start)?;
        Ok(self.objects.history(commit.id()))
    }

    /// Load a commit by full or abbreviated id.
    pub fn load_commit(&self, id: &str) -> Result<Commit> {
        let id = self.objects.resolve(id)?;
        if self.objects.object_type(&id)? != ObjectType::Commit {
            return Err(Error::not_found(id.to_hex()));
        }
        self.objects.get_commit(&id)
    }

    /// Read a blob's bytes by full or abbreviated id.
    pub fn cat(&self, id: &str) -> Result<Vec<u8>> {
        let id = self.objects.resolve(id)?;
        self.objects.get(&id)
    }

    pub fn current_branch(&self) -> Result<String> {
        self.refs.current_branch()
    }

    /// Create `name` at the current tip. Returns the tip it starts from.
    pub fn create_branch(&self, name: &str) -> Result<Option<ObjectId>> {
        let tip = self.refs.create_branch(name)?;
        if let Some(id) = tip {
            self.record(&JournalEntry::new(
                now_timestamp(),
                RefOperation::Branch,
                name,
                id,
                &format!("created from {}", self.refs.current_branch()?),
            ));
        }
        Ok(tip)
    }

    /// All branches, sorted by name, with the current one marked.
    pub fn branches(&self) -> Result<Vec<BranchInfo>> {
        let current = self.refs.current_branch()?;
        Ok(self
            .refs
            .list()?
            .into_iter()
            .map(|(name, tip)| BranchInfo {
                current: name == current,
                name,
                tip,
            })
            .collect())
    }

    /// Point HEAD at `name`. Files on disk are left untouched.
    pub fn switch(&self, name: &str) -> Result<()> {
        self.refs.switch(name)
    }

    /// Journal append after a branch update; failures are logged at `warn`.
    pub(crate) fn record(&self, entry: &JournalEntry) {
        if let Err(e) = self.journal.append(entry) {
            warn!(branch = %entry.branch, error = %e, "failed to append journal entry");
        }
    }

    /// The most recent `count` journal entries, oldest first.
    pub fn journal_entries(&self, count: usize) -> Result<Vec<JournalEntry>> {
        self.journal.read_recent(count)
    }
}

/// Current time in Unix seconds.
pub(crate) fn now_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
