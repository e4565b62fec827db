//! Per-branch on-disk caches of the index database
//!
//! Each branch gets a snapshot under
//! `<project>/.swift-scip/branches/<sanitized>/index.db`, so switching
//! branches costs one file copy instead of a full re-read of the compiler's
//! store. The legacy single-file JSON state is migrated into this layout on
//! first contact.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::Deserialize;

use crate::db::IndexDb;
use crate::error::{IndexerError, Result};
use crate::git;

/// Directory holding all indexer state inside a project
pub const STATE_DIR: &str = ".swift-scip";

/// File name of every cached database
pub const CACHE_DB_NAME: &str = "index.db";

/// Pre-branch-cache state file, read once for migration
pub const LEGACY_STATE_FILE: &str = ".swift-scip-state.json";

/// Characters not welcome in cache directory names
const UNSAFE_BRANCH_CHARS: &[char] = &['/', '\\', '?', '%', '*', '|', '"', '<', '>', ':'];

/// Summary of one cached branch database
#[derive(Debug, Clone)]
pub struct BranchCache {
    pub branch: String,
    pub commit: String,
    pub path: PathBuf,
    pub modified: Option<SystemTime>,
}

/// Owns the branch cache tree of one project
pub struct BranchCacheManager {
    project_root: PathBuf,
}

impl BranchCacheManager {
    pub fn new(project_root: &Path) -> Self {
        Self {
            project_root: project_root.to_path_buf(),
        }
    }

    /// The working tree's branch, sanitized for filesystem use
    pub fn current_branch(&self) -> Result<String> {
        let branch = git::current_branch(&self.project_root)?;
        Ok(sanitize_branch_name(&branch))
    }

    pub fn branches_root(&self) -> PathBuf {
        self.project_root.join(STATE_DIR).join("branches")
    }

    pub fn branch_cache_dir(&self, branch: &str) -> PathBuf {
        self.branches_root().join(sanitize_branch_name(branch))
    }

    pub fn branch_database_path(&self, branch: &str) -> PathBuf {
        self.branch_cache_dir(branch).join(CACHE_DB_NAME)
    }

    /// Read a branch's cache summary; `None` when no cache file exists
    pub fn get_branch_cache(&self, branch: &str) -> Result<Option<BranchCache>> {
        let path = self.branch_database_path(branch);
        if !path.exists() {
            return Ok(None);
        }

        let db = IndexDb::open_read_only(&path)?;
        let commit = db
            .load_state()?
            .map(|state| state.commit)
            .unwrap_or_default();
        let modified = fs::metadata(&path).and_then(|m| m.modified()).ok();

        Ok(Some(BranchCache {
            branch: sanitize_branch_name(branch),
            commit,
            path,
            modified,
        }))
    }

    /// Ensure the branch's cache directory exists; idempotent
    pub fn create_branch_cache(&self, branch: &str) -> Result<()> {
        fs::create_dir_all(self.branch_cache_dir(branch))?;
        Ok(())
    }

    /// Copy the branch's cached database to `output`. This is the O(size)
    /// branch switch: no re-read of the compiler's store.
    pub fn fast_switch_to_branch(&self, branch: &str, output: &Path) -> Result<()> {
        let cached = self.branch_database_path(branch);
        if !cached.exists() {
            return Err(IndexerError::CacheNotFound {
                branch: sanitize_branch_name(branch),
            });
        }
        copy_database(&cached, output)
    }

    /// Snapshot `source` into the branch's cache slot
    pub fn save_to_branch_cache(&self, branch: &str, source: &Path) -> Result<()> {
        self.create_branch_cache(branch)?;
        copy_database(source, &self.branch_database_path(branch))
    }

    /// Sanitized names of every branch with a cached database, sorted
    pub fn list_cached_branches(&self) -> Result<Vec<String>> {
        let root = self.branches_root();
        if !root.exists() {
            return Ok(Vec::new());
        }

        let mut branches = Vec::new();
        for entry in fs::read_dir(&root)? {
            let entry = entry?;
            if entry.path().join(CACHE_DB_NAME).exists() {
                branches.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        branches.sort();
        Ok(branches)
    }

    /// Delete one branch's cache directory
    pub fn clean_branch_cache(&self, branch: &str) -> Result<()> {
        let dir = self.branch_cache_dir(branch);
        if dir.exists() {
            fs::remove_dir_all(dir)?;
        }
        Ok(())
    }

    /// Delete every branch cache
    pub fn clean_all_caches(&self) -> Result<()> {
        let root = self.branches_root();
        if root.exists() {
            fs::remove_dir_all(root)?;
        }
        Ok(())
    }

    /// Convert a legacy JSON state file into a branch cache, renaming the
    /// original to `.json.backup`. Returns whether a migration ran.
    pub fn migrate_legacy_state(&self) -> Result<bool> {
        let legacy_path = self.project_root.join(LEGACY_STATE_FILE);
        if !legacy_path.exists() {
            return Ok(false);
        }

        let content =
            fs::read_to_string(&legacy_path).map_err(|e| IndexerError::MigrationFailure {
                message: format!("failed to read {}: {e}", legacy_path.display()),
            })?;
        let legacy: LegacyState =
            serde_json::from_str(&content).map_err(|e| IndexerError::MigrationFailure {
                message: format!("malformed legacy state: {e}"),
            })?;

        let branch = self
            .current_branch()
            .unwrap_or_else(|_| "main".to_string());
        self.create_branch_cache(&branch)?;

        let mut files: Vec<String> = legacy.indexed_files.keys().cloned().collect();
        files.sort();

        let mut db = IndexDb::open(&self.branch_database_path(&branch))?;
        db.save_state(&legacy.last_commit_hash, &files)?;

        let backup = legacy_path.with_extension("json.backup");
        fs::rename(&legacy_path, &backup).map_err(|e| IndexerError::MigrationFailure {
            message: format!("failed to back up legacy state: {e}"),
        })?;

        tracing::info!(branch, "migrated legacy state file");
        Ok(true)
    }
}

/// Replace filesystem-unsafe characters in a branch name with underscores
pub fn sanitize_branch_name(branch: &str) -> String {
    branch
        .chars()
        .map(|c| if UNSAFE_BRANCH_CHARS.contains(&c) { '_' } else { c })
        .collect()
}

/// SQLite write-ahead-log and shared-memory sidecars of a database file
fn sidecar_paths(db: &Path) -> [PathBuf; 2] {
    let name = db.file_name().unwrap_or_default().to_string_lossy();
    let parent = db.parent().unwrap_or_else(|| Path::new(""));
    [
        parent.join(format!("{name}-wal")),
        parent.join(format!("{name}-shm")),
    ]
}

/// Copy a database and any sidecars, replacing whatever is at `target`
fn copy_database(source: &Path, target: &Path) -> Result<()> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }

    if target.exists() {
        fs::remove_file(target)?;
    }
    for sidecar in sidecar_paths(target) {
        if sidecar.exists() {
            fs::remove_file(&sidecar)?;
        }
    }

    fs::copy(source, target)?;
    for (from, to) in sidecar_paths(source).iter().zip(sidecar_paths(target)) {
        if from.exists() {
            fs::copy(from, to)?;
        }
    }
    Ok(())
}

/// Shape of the pre-branch-cache state file
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyState {
    last_commit_hash: String,
    #[serde(default)]
    indexed_files: serde_json::Map<String, serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn manager(dir: &TempDir) -> BranchCacheManager {
        BranchCacheManager::new(dir.path())
    }

    fn seed_cache(manager: &BranchCacheManager, branch: &str, commit: &str) {
        manager.create_branch_cache(branch).unwrap();
        let mut db = IndexDb::open(&manager.branch_database_path(branch)).unwrap();
        db.save_state(commit, &[]).unwrap();
    }

    #[test]
    fn test_sanitize_branch_name() {
        assert_eq!(sanitize_branch_name("feature/login"), "feature_login");
        assert_eq!(sanitize_branch_name("a\\b?c%d*e|f\"g<h>i:j"), "a_b_c_d_e_f_g_h_i_j");
        assert_eq!(sanitize_branch_name("main"), "main");
    }

    #[test]
    fn test_path_derivations() {
        let dir = TempDir::new().unwrap();
        let mgr = manager(&dir);
        let db = mgr.branch_database_path("feature/x");
        assert!(db.ends_with(".swift-scip/branches/feature_x/index.db"));
    }

    #[test]
    fn test_create_branch_cache_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let mgr = manager(&dir);
        mgr.create_branch_cache("main").unwrap();
        mgr.create_branch_cache("main").unwrap();
        assert!(mgr.branch_cache_dir("main").is_dir());
    }

    #[test]
    fn test_get_branch_cache_missing_is_none() {
        let dir = TempDir::new().unwrap();
        assert!(manager(&dir).get_branch_cache("main").unwrap().is_none());
    }

    #[test]
    fn test_get_branch_cache_reads_commit() {
        let dir = TempDir::new().unwrap();
        let mgr = manager(&dir);
        seed_cache(&mgr, "main", "abc123");

        let cache = mgr.get_branch_cache("main").unwrap().unwrap();
        assert_eq!(cache.commit, "abc123");
        assert_eq!(cache.branch, "main");
    }

    #[test]
    fn test_fast_switch_missing_cache_fails() {
        let dir = TempDir::new().unwrap();
        let mgr = manager(&dir);
        let out = dir.path().join("out.db");
        assert!(matches!(
            mgr.fast_switch_to_branch("main", &out),
            Err(IndexerError::CacheNotFound { .. })
        ));
    }

    #[test]
    fn test_fast_switch_copies_database() {
        let dir = TempDir::new().unwrap();
        let mgr = manager(&dir);
        seed_cache(&mgr, "main", "abc123");

        let out = dir.path().join("output/index.db");
        mgr.fast_switch_to_branch("main", &out).unwrap();

        let db = IndexDb::open_read_only(&out).unwrap();
        assert_eq!(db.load_state().unwrap().unwrap().commit, "abc123");
    }

    #[test]
    fn test_fast_switch_replaces_stale_output() {
        let dir = TempDir::new().unwrap();
        let mgr = manager(&dir);
        seed_cache(&mgr, "main", "new");

        let out = dir.path().join("out.db");
        {
            let mut db = IndexDb::open(&out).unwrap();
            db.save_state("old", &[]).unwrap();
        }
        mgr.fast_switch_to_branch("main", &out).unwrap();
        let db = IndexDb::open_read_only(&out).unwrap();
        assert_eq!(db.load_state().unwrap().unwrap().commit, "new");
    }

    #[test]
    fn test_branch_isolation() {
        let dir = TempDir::new().unwrap();
        let mgr = manager(&dir);
        seed_cache(&mgr, "main", "commit-a");
        seed_cache(&mgr, "develop", "commit-b");

        mgr.clean_branch_cache("main").unwrap();

        assert!(mgr.get_branch_cache("main").unwrap().is_none());
        let develop = mgr.get_branch_cache("develop").unwrap().unwrap();
        assert_eq!(develop.commit, "commit-b");
    }

    #[test]
    fn test_save_to_branch_cache_and_list() {
        let dir = TempDir::new().unwrap();
        let mgr = manager(&dir);

        let src = dir.path().join("built.db");
        {
            let mut db = IndexDb::open(&src).unwrap();
            db.save_state("xyz", &[]).unwrap();
        }
        mgr.save_to_branch_cache("feature/x", &src).unwrap();
        mgr.save_to_branch_cache("main", &src).unwrap();

        assert_eq!(
            mgr.list_cached_branches().unwrap(),
            vec!["feature_x".to_string(), "main".to_string()]
        );
    }

    #[test]
    fn test_clean_all_caches() {
        let dir = TempDir::new().unwrap();
        let mgr = manager(&dir);
        seed_cache(&mgr, "a", "1");
        seed_cache(&mgr, "b", "2");

        mgr.clean_all_caches().unwrap();
        assert!(mgr.list_cached_branches().unwrap().is_empty());
    }

    #[test]
    fn test_legacy_migration() {
        let dir = TempDir::new().unwrap();
        let mgr = manager(&dir);
        fs::write(
            dir.path().join(LEGACY_STATE_FILE),
            r#"{"lastCommitHash": "abc", "indexedFiles": {"f.swift": ""}}"#,
        )
        .unwrap();

        // No git repository here, so migration falls back to "main"
        assert!(mgr.migrate_legacy_state().unwrap());

        assert!(!dir.path().join(LEGACY_STATE_FILE).exists());
        assert!(dir.path().join(".swift-scip-state.json.backup").exists());

        let cache = mgr.get_branch_cache("main").unwrap().unwrap();
        assert_eq!(cache.commit, "abc");

        let db = IndexDb::open_read_only(&cache.path).unwrap();
        let state = db.load_state().unwrap().unwrap();
        assert_eq!(state.files, vec!["f.swift".to_string()]);
    }

    #[test]
    fn test_migration_without_legacy_file_is_noop() {
        let dir = TempDir::new().unwrap();
        assert!(!manager(&dir).migrate_legacy_state().unwrap());
    }
}
