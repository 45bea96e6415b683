//! Working tree paths.
//!
//! Translates user-supplied paths into the `/`-separated, repository-relative
//! keys used by the staging index and snapshots, and walks directories for
//! bulk staging.

use crate::error::{Error, Result};
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Name of the metadata directory at the worktree root.
pub const DSCS_DIR: &str = ".dscs";

/// Per-directory ignore file honored in addition to `.gitignore`.
pub const IGNORE_FILE: &str = ".dscsignore";

#[derive(Debug, Clone)]
pub struct Worktree {
    root: PathBuf,
}

impl Worktree {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute location of a repository key.
    pub fn path_of(&self, key: &str) -> PathBuf {
        key.split('/').fold(self.root.clone(), |acc, part| acc.join(part))
    }

    /// Resolve `path` (relative to the worktree root, or absolute) to its
    /// absolute location and repository key. The root itself has key `""`.
    pub fn resolve(&self, path: &Path) -> Result<(PathBuf, String)> {
        let joined = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        };
        let absolute = match fs::canonicalize(&joined) {
            Ok(canonical) => canonical,
            Err(_) => normalize_lexically(&joined),
        };

        let relative = absolute
            .strip_prefix(&self.root)
            .map_err(|_| Error::PathOutsideRepository {
                path: path.to_path_buf(),
            })?;

        let mut parts = Vec::new();
        for component in relative.components() {
            match component {
                Component::Normal(part) => {
                    let part = part.to_str().ok_or_else(|| Error::Io {
                        source: std::io::Error::other(format!(
                            "path is not valid UTF-8: {}",
                            path.display()
                        )),
                    })?;
                    parts.push(part);
                }
                _ => {
                    return Err(Error::PathOutsideRepository {
                        path: path.to_path_buf(),
                    });
                }
            }
        }

        if parts.first() == Some(&DSCS_DIR) {
            return Err(Error::PathOutsideRepository {
                path: path.to_path_buf(),
            });
        }

        let key = parts.join("/");
        Ok((absolute, key))
    }

    /// Read the live content at `key`.
    pub fn read(&self, key: &str) -> std::io::Result<Vec<u8>> {
        fs::read(self.path_of(key))
    }

    /// Every regular file below `dir`, honoring `.gitignore` and
    /// `.dscsignore` and skipping the metadata directory. Sorted.
    pub fn walk_files(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        let walker = ignore::WalkBuilder::new(dir)
            .hidden(false)
            .git_ignore(true)
            .require_git(false)
            .add_custom_ignore_filename(IGNORE_FILE)
            .filter_entry(|entry| entry.file_name() != DSCS_DIR)
            .build();

        let mut files = Vec::new();
        for entry in walker {
            let entry = entry?;
            if entry.file_type().is_some_and(|t| t.is_file()) {
                files.push(entry.into_path());
            }
        }

        files.sort();
        Ok(files)
    }
}

/// Resolve `.` and `..` without touching the filesystem.
fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn worktree(temp_dir: &TempDir) -> Worktree {
        Worktree::new(fs::canonicalize(temp_dir.path()).unwrap())
    }

    #[test]
    fn test_resolve_relative_and_absolute() {
        let temp_dir = TempDir::new().unwrap();
        let wt = worktree(&temp_dir);
        fs::create_dir_all(wt.root().join("src")).unwrap();
        fs::write(wt.root().join("src/lib.rs"), "x").unwrap();

        let (_, key) = wt.resolve(Path::new("src/lib.rs")).unwrap();
        assert_eq!(key, "src/lib.rs");

        let (_, key) = wt.resolve(&wt.root().join("src/../src/lib.rs")).unwrap();
        assert_eq!(key, "src/lib.rs");
    }

    #[test]
    fn test_resolve_missing_file_keeps_key() {
        let temp_dir = TempDir::new().unwrap();
        let wt = worktree(&temp_dir);

        let (abs, key) = wt.resolve(Path::new("./later/new.txt")).unwrap();
        assert_eq!(key, "later/new.txt");
        assert_eq!(abs, wt.root().join("later").join("new.txt"));
        assert_eq!(wt.path_of(&key), abs);
    }

    #[test]
    fn test_resolve_rejects_outside_and_metadata() {
        let temp_dir = TempDir::new().unwrap();
        let wt = worktree(&temp_dir);

        assert!(matches!(
            wt.resolve(Path::new("../escape.txt")),
            Err(Error::PathOutsideRepository { .. })
        ));
        assert!(matches!(
            wt.resolve(Path::new(".dscs/index")),
            Err(Error::PathOutsideRepository { .. })
        ));
    }

    #[test]
    fn test_resolve_root_is_empty_key() {
        let temp_dir = TempDir::new().unwrap();
        let wt = worktree(&temp_dir);
        assert_eq!(wt.resolve(Path::new(".")).unwrap().1, "");
    }

    #[test]
    fn test_walk_files_honors_ignores() {
        let temp_dir = TempDir::new().unwrap();
        let wt = worktree(&temp_dir);
        let root = wt.root();

        fs::create_dir_all(root.join(".dscs/objects")).unwrap();
        fs::write(root.join(".dscs/index"), "{}").unwrap();
        fs::create_dir_all(root.join("sub")).unwrap();
        fs::write(root.join("a.txt"), "a").unwrap();
        fs::write(root.join("sub/b.txt"), "b").unwrap();
        fs::write(root.join("skip.log"), "log").unwrap();
        fs::write(root.join("secret.key"), "k").unwrap();
        fs::write(root.join(".gitignore"), "*.log\n").unwrap();
        fs::write(root.join(".dscsignore"), "*.key\n").unwrap();

        let files: Vec<String> = wt
            .walk_files(root)
            .unwrap()
            .iter()
            .map(|p| wt.resolve(p).unwrap().1)
            .collect();

        assert_eq!(files, [".dscsignore", ".gitignore", "a.txt", "sub/b.txt"]);
    }
}
