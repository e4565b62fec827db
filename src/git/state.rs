//! Per-branch change computation

use std::path::Path;

use super::{changed_files_since, current_commit_hash, working_tree_changes};
use crate::db::IndexDb;
use crate::error::Result;

/// Compute the set of files to reindex for a branch.
///
/// Compares the branch cache's recorded commit against HEAD: equal commits
/// mean only working-tree changes are stale; differing commits widen to the
/// full diff-since set. `None` (no cached state) signals that a full rebuild
/// is required.
pub fn changed_files_for_branch(
    project_root: &Path,
    branch_db: &Path,
) -> Result<Option<Vec<String>>> {
    if !branch_db.exists() {
        return Ok(None);
    }

    let state = match IndexDb::open_read_only(branch_db) {
        Ok(db) => db.load_state()?,
        Err(e) => {
            tracing::warn!("unreadable branch cache {}: {e}", branch_db.display());
            return Ok(None);
        }
    };

    let state = match state {
        Some(state) => state,
        None => return Ok(None),
    };

    let head = current_commit_hash(project_root)?;
    if state.commit == head {
        Ok(Some(working_tree_changes(project_root)?))
    } else {
        Ok(Some(changed_files_since(project_root, &state.commit)?))
    }
}
