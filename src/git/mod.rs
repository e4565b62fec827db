//! VCS state tracking
//!
//! Git is the change oracle for incremental indexing. Every operation shells
//! out to the git executable with machine-readable flags; informational
//! queries that fail surface typed errors the orchestrator may downgrade to
//! a full rebuild.

mod diff;
mod state;

pub use diff::{changed_files_since, deleted_files_since, working_tree_changes};
pub use state::changed_files_for_branch;

use std::path::Path;
use std::process::Command;

use crate::error::{IndexerError, Result};

/// Run a git command in `root` and return trimmed stdout
pub fn git_command(args: &[&str], root: &Path) -> Result<String> {
    let output = Command::new("git")
        .args(args)
        .current_dir(root)
        .output()
        .map_err(|e| IndexerError::GitOperation {
            message: format!("failed to execute git: {e}"),
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(IndexerError::GitOperation {
            message: format!("git {} failed: {}", args.join(" "), stderr.trim()),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Run a git command, returning None on failure (for optional queries)
pub fn git_command_optional(args: &[&str], root: &Path) -> Option<String> {
    git_command(args, root).ok()
}

/// Presence-check of the repository marker directory
pub fn is_repository(root: &Path) -> bool {
    root.join(".git").exists()
}

/// Commit hash of HEAD
pub fn current_commit_hash(root: &Path) -> Result<String> {
    git_command(&["rev-parse", "HEAD"], root).map_err(|_| IndexerError::NotAGitRepository {
        path: root.display().to_string(),
    })
}

/// Name of the checked-out branch; `HEAD` when detached
pub fn current_branch(root: &Path) -> Result<String> {
    git_command(&["rev-parse", "--abbrev-ref", "HEAD"], root).map_err(|_| {
        IndexerError::NotAGitRepository {
            path: root.display().to_string(),
        }
    })
}

/// Whether the working tree has any uncommitted source changes
pub fn is_working_tree_dirty(root: &Path) -> Result<bool> {
    Ok(!working_tree_changes(root)?.is_empty())
}
