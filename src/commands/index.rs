//! Index command handler - the orchestrator
//!
//! Composes the reader, storage engine, VCS tracker and branch cache into
//! one decision tree: fast-switch when the branch cache already matches
//! HEAD, incremental update when the changed-file set is known, full rebuild
//! otherwise. Projects without a repository (and explicit `--json` runs)
//! fall back to the legacy JSON back-end.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use console::style;

use crate::branch_cache::{BranchCacheManager, LEGACY_STATE_FILE};
use crate::cli::IndexArgs;
use crate::commands::CommandContext;
use crate::db::IndexDb;
use crate::error::Result;
use crate::git;
use crate::json_output;
use crate::model::{OccurrenceRecord, RelationshipRecord, SymbolRecord};
use crate::store::{IndexStoreReader, RawStore};

/// How the run will bring the output up to date
enum IndexPlan {
    /// Replace only these changed files, seeded from the branch cache
    Incremental(Vec<String>),
    /// Rebuild every document from the store
    Full,
}

/// Run the index command against the native index store
pub fn run_index(args: &IndexArgs, ctx: &CommandContext) -> Result<String> {
    run_index_with(args, ctx, || {
        let reader = IndexStoreReader::open(
            &args.derived_data,
            &args.project_root,
            args.include_snippets(),
        )?;
        Ok(reader.with_module_filter(args.modules.iter().cloned()))
    })
}

/// Run the index command over any [`RawStore`] backend.
///
/// The reader is built lazily: the fast-switch and restore paths complete
/// without touching the compiler's store at all.
pub fn run_index_with<S, F>(args: &IndexArgs, ctx: &CommandContext, make_reader: F) -> Result<String>
where
    S: RawStore,
    F: FnOnce() -> Result<IndexStoreReader<S>>,
{
    let project_root = &args.project_root;

    if args.json || !git::is_repository(project_root) {
        if !args.json {
            tracing::info!(
                "{} is not a git repository; falling back to JSON output",
                project_root.display()
            );
        }
        return run_legacy(args, ctx, make_reader()?);
    }

    let cache = BranchCacheManager::new(project_root);
    match cache.migrate_legacy_state() {
        Ok(true) => {
            if ctx.verbose {
                eprintln!("Migrated legacy state file into the branch cache");
            }
        }
        Ok(false) => {}
        Err(e) => tracing::warn!("legacy state migration skipped: {e}"),
    }

    let branch = cache.current_branch()?;
    let commit = git::current_commit_hash(project_root)?;
    let output = normalize_output(&args.output);

    // Opportunistic fast path: the cache already matches HEAD
    if !args.force {
        if let Some(cached) = cache.get_branch_cache(&branch)? {
            if cached.commit == commit {
                cache.fast_switch_to_branch(&branch, &output)?;
                return Ok(format!(
                    "Fast-switched to branch '{}' at {} ({})",
                    branch,
                    short(&commit),
                    output.display()
                ));
            }
        }
    }

    let plan = if args.incremental && !args.force {
        match git::changed_files_for_branch(project_root, &cache.branch_database_path(&branch))? {
            Some(changed) if changed.is_empty() => {
                if cache.get_branch_cache(&branch)?.is_some() {
                    return restore_unchanged(&cache, &branch, &commit, &output);
                }
                IndexPlan::Full
            }
            Some(changed) => IndexPlan::Incremental(changed),
            None => IndexPlan::Full,
        }
    } else {
        IndexPlan::Full
    };

    if ctx.verbose {
        match &plan {
            IndexPlan::Incremental(changed) => {
                eprintln!(
                    "Incremental update: {} changed file(s)",
                    style(changed.len()).bold()
                );
            }
            IndexPlan::Full => eprintln!("Full rebuild"),
        }
    }

    let mut reader = make_reader()?;

    // Symbols and relationships are cheap relative to occurrence
    // enumeration; always collect them in full
    let symbols = reader.collect_symbols()?;
    let relationships = reader.collect_relationships()?;

    match plan {
        IndexPlan::Incremental(changed) => {
            let filter: HashSet<String> = changed.iter().cloned().collect();
            let occurrences = reader.collect_occurrences(Some(&filter))?;
            write_incremental(
                &cache, &branch, &commit, &output, project_root, &changed, &symbols, &occurrences,
            )
        }
        IndexPlan::Full => {
            let occurrences = reader.collect_occurrences(None)?;
            write_full(
                &cache,
                &branch,
                &commit,
                &output,
                project_root,
                &symbols,
                &occurrences,
                &relationships,
            )
        }
    }
}

/// Legacy mode: full harvest, one JSON document, optional legacy state file
fn run_legacy<S: RawStore>(
    args: &IndexArgs,
    ctx: &CommandContext,
    mut reader: IndexStoreReader<S>,
) -> Result<String> {
    let project_root = &args.project_root;

    let symbols = reader.collect_symbols()?;
    let relationships = reader.collect_relationships()?;
    let occurrences = reader.collect_occurrences(None)?;

    if ctx.verbose {
        eprintln!(
            "Collected {} symbols, {} occurrences, {} relationships",
            style(symbols.len()).bold(),
            style(occurrences.len()).bold(),
            style(relationships.len()).bold()
        );
    }

    let json = json_output::render(&symbols, &occurrences, &relationships, project_root);
    fs::write(&args.output, &json)?;

    if args.incremental && git::is_repository(project_root) {
        save_legacy_state(project_root, &occurrences)?;
    }

    Ok(format!(
        "Wrote JSON index with {} document(s) to {}",
        count_documents(&occurrences),
        args.output.display()
    ))
}

/// Nothing changed: re-seed the output from the cache and stamp the state
/// with the current commit
fn restore_unchanged(
    cache: &BranchCacheManager,
    branch: &str,
    commit: &str,
    output: &Path,
) -> Result<String> {
    cache.fast_switch_to_branch(branch, output)?;
    {
        let mut db = IndexDb::open(output)?;
        let files = db.get_indexed_file_paths()?;
        db.save_state(commit, &files)?;
    }
    cache.save_to_branch_cache(branch, output)?;
    Ok(format!(
        "No changes since last index; restored cache for branch '{}' at {}",
        branch,
        short(commit)
    ))
}

#[allow(clippy::too_many_arguments)]
fn write_incremental(
    cache: &BranchCacheManager,
    branch: &str,
    commit: &str,
    output: &Path,
    project_root: &Path,
    changed: &[String],
    symbols: &[SymbolRecord],
    occurrences: &[OccurrenceRecord],
) -> Result<String> {
    // Seed the output with the branch's previous database
    cache.fast_switch_to_branch(branch, output)?;

    let replaced;
    let deleted;
    {
        let mut db = IndexDb::open(output)?;

        deleted = match db.load_state()? {
            Some(state) => {
                let gone = git::deleted_files_since(project_root, &state.commit)?;
                db.delete_documents(&gone)?
            }
            None => 0,
        };

        replaced = db.update_documents(changed, symbols, occurrences)?;

        let files = db.get_indexed_file_paths()?;
        db.save_state(commit, &files)?;
    }

    cache.save_to_branch_cache(branch, output)?;

    Ok(format!(
        "Incrementally updated {} document(s) ({} removed) on branch '{}' at {}",
        replaced,
        deleted,
        branch,
        short(commit)
    ))
}

#[allow(clippy::too_many_arguments)]
fn write_full(
    cache: &BranchCacheManager,
    branch: &str,
    commit: &str,
    output: &Path,
    project_root: &Path,
    symbols: &[SymbolRecord],
    occurrences: &[OccurrenceRecord],
    relationships: &[RelationshipRecord],
) -> Result<String> {
    cache.create_branch_cache(branch)?;

    let stats;
    {
        let mut db = IndexDb::open(output)?;
        stats = db.write(symbols, occurrences, relationships, project_root)?;

        let mut files: Vec<String> = occurrences
            .iter()
            .map(|occ| occ.path.clone())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        files.sort();
        db.save_state(commit, &files)?;
    }

    cache.save_to_branch_cache(branch, output)?;

    Ok(format!(
        "Indexed {} document(s), {} symbol(s), {} occurrence(s), {} relationship(s) on branch '{}' at {}",
        stats.documents,
        stats.symbols,
        stats.occurrences,
        stats.relationships,
        branch,
        short(commit)
    ))
}

/// The relational back-end always writes a `.db` file
fn normalize_output(output: &Path) -> PathBuf {
    let mut normalized = output.to_path_buf();
    normalized.set_extension("db");
    normalized
}

/// Write the pre-branch-cache state file shape used by older consumers
fn save_legacy_state(project_root: &Path, occurrences: &[OccurrenceRecord]) -> Result<()> {
    let commit = git::current_commit_hash(project_root)?;
    let files: BTreeMap<&str, &str> = occurrences
        .iter()
        .map(|occ| (occ.path.as_str(), ""))
        .collect();

    let state = serde_json::json!({
        "lastCommitHash": commit,
        "indexedFiles": files,
    });
    fs::write(
        project_root.join(LEGACY_STATE_FILE),
        serde_json::to_string_pretty(&state).unwrap_or_default(),
    )?;
    Ok(())
}

fn count_documents(occurrences: &[OccurrenceRecord]) -> usize {
    occurrences
        .iter()
        .map(|occ| occ.path.as_str())
        .collect::<HashSet<_>>()
        .len()
}

/// Abbreviated commit hash for user-facing messages
fn short(commit: &str) -> &str {
    &commit[..commit.len().min(8)]
}
