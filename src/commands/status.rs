//! Status command handler - report repository and cache state

use std::fmt::Write as _;

use chrono::{DateTime, Local};
use console::style;

use crate::branch_cache::BranchCacheManager;
use crate::cli::StatusArgs;
use crate::commands::CommandContext;
use crate::error::Result;
use crate::git;

/// Run the status command. Read-only: never touches caches or state.
pub fn run_status(args: &StatusArgs, ctx: &CommandContext) -> Result<String> {
    let project_root = &args.project_root;
    let mut out = String::new();

    if !git::is_repository(project_root) {
        writeln!(out, "{} is not a git repository", project_root.display()).ok();
        writeln!(out, "Branch caches and incremental indexing are unavailable").ok();
        return Ok(out);
    }

    let branch = git::current_branch(project_root)?;
    let commit = git::current_commit_hash(project_root)?;
    let dirty = git::is_working_tree_dirty(project_root)?;

    writeln!(out, "Branch:       {}", style(&branch).bold()).ok();
    writeln!(out, "Commit:       {}", &commit[..commit.len().min(8)]).ok();
    writeln!(
        out,
        "Working tree: {}",
        if dirty { "dirty" } else { "clean" }
    )
    .ok();

    let cache = BranchCacheManager::new(project_root);
    let branches = cache.list_cached_branches()?;
    if branches.is_empty() {
        writeln!(out, "\nNo branch caches").ok();
    } else {
        writeln!(out, "\nCached branches:").ok();
        for name in &branches {
            if let Some(info) = cache.get_branch_cache(name)? {
                let when = info
                    .modified
                    .map(|t| {
                        DateTime::<Local>::from(t)
                            .format("%Y-%m-%d %H:%M:%S")
                            .to_string()
                    })
                    .unwrap_or_else(|| "unknown".to_string());
                let commit = if info.commit.is_empty() {
                    "no state".to_string()
                } else {
                    info.commit[..info.commit.len().min(8)].to_string()
                };
                writeln!(out, "  {name}  {commit}  {when}").ok();
            }
        }
    }

    let sanitized = cache.current_branch()?;
    match git::changed_files_for_branch(project_root, &cache.branch_database_path(&sanitized))? {
        Some(changed) if changed.is_empty() => {
            writeln!(out, "\nIndex is current: no files changed").ok();
        }
        Some(changed) => {
            writeln!(
                out,
                "\n{} file(s) changed since last index",
                style(changed.len()).bold()
            )
            .ok();
            if ctx.verbose {
                for file in &changed {
                    writeln!(out, "  {file}").ok();
                }
            }
        }
        None => {
            writeln!(out, "\nNo index state for this branch (full rebuild required)").ok();
        }
    }

    Ok(out)
}
