mod output;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dscs_core::{Diff, InitOptions, MergeOutcome, Repository};
use output::{
    AddOutput, BranchCreateOutput, BranchEntry, BranchListOutput, ChangedFile, CommitInfo,
    CommitOutput, DiffData, DiffOutput, InitOutput, JournalEntryInfo, JournalOutput, LogOutput,
    MergeOutput, OutputWriter, SnapshotEntry, StagedFile, SwitchOutput, format_timestamp,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// dscs - a small local version-control engine
#[derive(Parser)]
#[command(name = "dscs")]
#[command(about = "Local version control on a BLAKE3 content-addressed store", long_about = None)]
#[command(version)]
struct Cli {
    /// Working tree root (defaults to DSCS_DIR env var, else searched upward from the current directory)
    #[arg(short = 'C', long, global = true, env = "DSCS_DIR")]
    repo: Option<PathBuf>,

    /// Output results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Enable debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new repository
    Init {
        /// Name of the initial branch
        #[arg(long, default_value = dscs_core::DEFAULT_BRANCH)]
        default_branch: String,
    },

    /// Stage files or directories for the next commit
    Add {
        /// Paths to stage
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Record the staged files as a new commit
    Commit {
        /// Commit message
        #[arg(short, long)]
        message: String,
    },

    /// Show the current branch's history
    Log {
        /// Show at most this many commits
        #[arg(short = 'n', long)]
        max_count: Option<usize>,
    },

    /// List branches, or create one at the current tip
    Branch {
        /// Name of the branch to create
        name: Option<String>,
    },

    /// Make another branch current (files on disk are not changed)
    Switch {
        /// Branch name
        name: String,
    },

    /// Merge a branch into the current branch
    Merge {
        /// Branch to merge in
        name: String,
    },

    /// Show staged files that changed on disk, or what a commit recorded
    Diff {
        /// Commit id (full or abbreviated)
        commit: Option<String>,
    },

    /// Output blob content to stdout
    Cat {
        /// Blob id (full or abbreviated)
        id: String,
    },

    /// Show recent branch updates
    Journal {
        /// Number of entries to show
        #[arg(short = 'n', long, default_value_t = 20)]
        count: usize,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let output = OutputWriter::new(cli.json);
    let repo_dir = cli.repo;

    let result = match cli.command {
        Commands::Init { default_branch } => cmd_init(&output, repo_dir, default_branch),
        Commands::Add { paths } => cmd_add(&output, repo_dir, paths),
        Commands::Commit { message } => cmd_commit(&output, repo_dir, &message),
        Commands::Log { max_count } => cmd_log(&output, repo_dir, max_count),
        Commands::Branch { name } => cmd_branch(&output, repo_dir, name),
        Commands::Switch { name } => cmd_switch(&output, repo_dir, &name),
        Commands::Merge { name } => cmd_merge(&output, repo_dir, &name),
        Commands::Diff { commit } => cmd_diff(&output, repo_dir, commit),
        Commands::Cat { id } => cmd_cat(&output, repo_dir, &id),
        Commands::Journal { count } => cmd_journal(&output, repo_dir, count),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            output.write_error(&err, 1);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env("DSCS_LOG").unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn open_repo(repo_dir: Option<PathBuf>) -> Result<Repository> {
    debug!(repo = ?repo_dir, "opening repository");
    match repo_dir {
        Some(dir) => Repository::open(&dir)
            .with_context(|| format!("Failed to open repository at {}", dir.display())),
        None => {
            let cwd = std::env::current_dir().context("Failed to read current directory")?;
            Repository::discover(&cwd)
                .with_context(|| format!("Not a dscs repository: {}", cwd.display()))
        }
    }
}

/// Paths given on the command line are relative to the current directory,
/// not the worktree root.
fn absolutize(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().context("Failed to read current directory")?;
    Ok(cwd.join(path))
}

fn cmd_init(output: &OutputWriter, repo_dir: Option<PathBuf>, default_branch: String) -> Result<()> {
    let root = match repo_dir {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to read current directory")?,
    };

    let repo = Repository::init(&root, InitOptions { default_branch })
        .with_context(|| format!("Failed to initialize repository at {}", root.display()))?;

    let data = InitOutput {
        success: true,
        result_code: 0,
        root: repo.worktree().root().display().to_string(),
        default_branch: repo.config().default_branch.clone(),
        algorithm: repo.config().algorithm.as_str().to_string(),
    };

    output.write(&data, || {
        format!(
            "Initialized empty dscs repository in {}\n",
            repo.meta_dir().display()
        )
    })
}

fn cmd_add(output: &OutputWriter, repo_dir: Option<PathBuf>, paths: Vec<PathBuf>) -> Result<()> {
    let mut repo = open_repo(repo_dir)?;

    let absolute = paths
        .iter()
        .map(|path| absolutize(path))
        .collect::<Result<Vec<_>>>()?;
    let staged = repo.stage_all(&absolute).context("Failed to stage files")?;

    let data = AddOutput {
        success: true,
        result_code: 0,
        staged: staged
            .into_iter()
            .map(|(path, blob)| StagedFile { path, blob })
            .collect(),
    };

    output.write(&data, || {
        data.staged
            .iter()
            .map(|f| format!("Staged {} ({})\n", f.path, f.blob.short()))
            .collect()
    })
}

fn cmd_commit(output: &OutputWriter, repo_dir: Option<PathBuf>, message: &str) -> Result<()> {
    let mut repo = open_repo(repo_dir)?;

    let commit = repo.commit(message).context("Failed to commit")?;
    let branch = repo.current_branch()?;

    let data = CommitOutput {
        success: true,
        result_code: 0,
        branch,
        commit: commit.id(),
        files: commit.snapshot().len(),
    };

    output.write(&data, || {
        format!(
            "[{} {}] {}\n {} file(s) recorded\n",
            data.branch,
            data.commit.short(),
            message.lines().next().unwrap_or_default(),
            data.files
        )
    })
}

fn cmd_log(output: &OutputWriter, repo_dir: Option<PathBuf>, max_count: Option<usize>) -> Result<()> {
    let repo = open_repo(repo_dir)?;
    let branch = repo.current_branch()?;

    let mut commits = Vec::new();
    for commit in repo.log()?.take(max_count.unwrap_or(usize::MAX)) {
        let commit = commit.context("Failed to read history")?;
        commits.push(CommitInfo::from(&commit));
    }

    let data = LogOutput {
        success: true,
        result_code: 0,
        branch,
        commits,
    };

    output.write(&data, || {
        if data.commits.is_empty() {
            return "No commits yet.\n".to_string();
        }
        let mut text = String::new();
        for info in &data.commits {
            text.push_str(&format!("Commit: {}\n", info.commit));
            if info.parents.len() > 1 {
                let parents: Vec<String> = info.parents.iter().map(|p| p.short()).collect();
                text.push_str(&format!("Merge: {}\n", parents.join(" ")));
            }
            text.push_str(&format!("Date: {}\n", info.timestamp_human));
            text.push_str(&format!("\n    {}\n\n", info.message));
        }
        text
    })
}

fn cmd_branch(output: &OutputWriter, repo_dir: Option<PathBuf>, name: Option<String>) -> Result<()> {
    let repo = open_repo(repo_dir)?;

    let Some(name) = name else {
        let branches: Vec<BranchEntry> = repo
            .branches()
            .context("Failed to list branches")?
            .into_iter()
            .map(BranchEntry::from)
            .collect();

        let data = BranchListOutput {
            success: true,
            result_code: 0,
            branches,
        };

        return output.write(&data, || {
            data.branches
                .iter()
                .map(|b| {
                    let marker = if b.current { '*' } else { ' ' };
                    let tip = b.tip.map(|t| t.short()).unwrap_or_else(|| "(no commits)".to_string());
                    format!("{} {} {}\n", marker, b.name, tip)
                })
                .collect()
        });
    };

    let tip = repo
        .create_branch(&name)
        .with_context(|| format!("Failed to create branch {}", name))?;

    let data = BranchCreateOutput {
        success: true,
        result_code: 0,
        name,
        tip,
    };

    output.write(&data, || match data.tip {
        Some(tip) => format!("Created branch {} at {}\n", data.name, tip.short()),
        None => format!("Created branch {} (no commits yet)\n", data.name),
    })
}

fn cmd_switch(output: &OutputWriter, repo_dir: Option<PathBuf>, name: &str) -> Result<()> {
    let repo = open_repo(repo_dir)?;

    repo.switch(name)
        .with_context(|| format!("Failed to switch to {}", name))?;

    let data = SwitchOutput {
        success: true,
        result_code: 0,
        branch: name.to_string(),
    };

    output.write(&data, || format!("Switched to branch '{}'\n", data.branch))
}

fn cmd_merge(output: &OutputWriter, repo_dir: Option<PathBuf>, name: &str) -> Result<()> {
    let mut repo = open_repo(repo_dir)?;
    let into = repo.current_branch()?;

    let outcome = repo
        .merge(name)
        .with_context(|| format!("Failed to merge {}", name))?;

    if let MergeOutcome::Conflict { paths } = &outcome
        && !output.is_json()
    {
        for path in paths {
            eprintln!("CONFLICT: {}", path);
        }
    }

    let (commit, snapshot) = outcome
        .into_result()
        .with_context(|| format!("Automatic merge of {} failed; resolve, stage and commit", name))?;

    let data = MergeOutput {
        success: true,
        result_code: 0,
        branch: name.to_string(),
        into,
        commit,
        files: snapshot.len(),
    };

    output.write(&data, || {
        format!(
            "Merged {} into {} as {} ({} file(s))\n",
            data.branch,
            data.into,
            data.commit.short(),
            data.files
        )
    })
}

fn cmd_diff(output: &OutputWriter, repo_dir: Option<PathBuf>, commit: Option<String>) -> Result<()> {
    let repo = open_repo(repo_dir)?;

    let diff = repo
        .diff(commit.as_deref())
        .context("Failed to compute diff")?;

    let data = DiffOutput {
        success: true,
        result_code: 0,
        data: match diff {
            Diff::Staged(changes) => DiffData::Staged {
                changes: changes.into_iter().map(ChangedFile::from).collect(),
            },
            Diff::Commit { id, entries } => DiffData::Commit {
                commit: id,
                entries: entries
                    .into_iter()
                    .map(|(path, blob)| SnapshotEntry { path, blob })
                    .collect(),
            },
        },
    };

    output.write(&data, || match &data.data {
        DiffData::Staged { changes } => changes
            .iter()
            .map(|c| {
                format!(
                    "modified: {} (staged {} bytes, now {} bytes)\n",
                    c.path, c.staged_size, c.live_size
                )
            })
            .collect(),
        DiffData::Commit { commit, entries } => {
            let mut text = format!("Commit {}\n", commit);
            for entry in entries {
                text.push_str(&format!("  {} {}\n", entry.blob.short(), entry.path));
            }
            text
        }
    })
}

fn cmd_cat(output: &OutputWriter, repo_dir: Option<PathBuf>, id: &str) -> Result<()> {
    let repo = open_repo(repo_dir)?;

    let bytes = repo
        .cat(id)
        .with_context(|| format!("Failed to read blob {}", id))?;

    output.write_raw(&bytes)
}

fn cmd_journal(output: &OutputWriter, repo_dir: Option<PathBuf>, count: usize) -> Result<()> {
    let repo = open_repo(repo_dir)?;

    let entries: Vec<JournalEntryInfo> = repo
        .journal_entries(count)
        .context("Failed to read journal")?
        .into_iter()
        .map(JournalEntryInfo::from)
        .collect();

    let data = JournalOutput {
        success: true,
        result_code: 0,
        entries,
    };

    output.write(&data, || {
        data.entries
            .iter()
            .rev()
            .map(|e| {
                format!(
                    "{} {} {}: {} ({})\n",
                    e.commit.short(),
                    e.branch,
                    e.operation,
                    e.message,
                    format_timestamp(e.timestamp)
                )
            })
            .collect()
    })
}
