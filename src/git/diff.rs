//! Changed and deleted file queries

use std::collections::HashSet;
use std::path::Path;

use super::git_command;
use crate::error::Result;
use crate::store::SOURCE_EXTENSION;

/// Source files changed between `commit` and HEAD, unioned with uncommitted
/// working-tree changes. The result is deduplicated, diff order first.
pub fn changed_files_since(root: &Path, commit: &str) -> Result<Vec<String>> {
    let output = git_command(&["diff", "--name-only", commit, "HEAD"], root)?;

    let mut seen: HashSet<String> = HashSet::new();
    let mut files = Vec::new();
    for path in source_files(&output).chain(working_tree_changes(root)?) {
        if seen.insert(path.clone()) {
            files.push(path);
        }
    }
    Ok(files)
}

/// Source files deleted between `commit` and HEAD
pub fn deleted_files_since(root: &Path, commit: &str) -> Result<Vec<String>> {
    let output = git_command(
        &["diff", "--name-only", "--diff-filter=D", commit, "HEAD"],
        root,
    )?;
    Ok(source_files(&output).collect())
}

/// Uncommitted source changes from porcelain status, renames resolved to
/// their new path
pub fn working_tree_changes(root: &Path) -> Result<Vec<String>> {
    let output = git_command(&["status", "--porcelain"], root)?;
    Ok(parse_porcelain(&output))
}

/// Parse `git status --porcelain` output: a two-character status, a space,
/// then the path (`old -> new` for renames)
fn parse_porcelain(output: &str) -> Vec<String> {
    output
        .lines()
        .filter_map(|line| {
            if line.len() < 4 {
                return None;
            }
            let path = &line[3..];
            let path = match path.split_once(" -> ") {
                Some((_, new_path)) => new_path,
                None => path,
            };
            path.ends_with(SOURCE_EXTENSION)
                .then(|| path.to_string())
        })
        .collect()
}

fn source_files(output: &str) -> impl Iterator<Item = String> + '_ {
    output
        .lines()
        .filter(|line| !line.is_empty() && line.ends_with(SOURCE_EXTENSION))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_porcelain_modified() {
        let output = " M Sources/App.swift";
        assert_eq!(parse_porcelain(output), vec!["Sources/App.swift"]);
    }

    #[test]
    fn test_parse_porcelain_untracked() {
        let output = "?? Sources/New.swift";
        assert_eq!(parse_porcelain(output), vec!["Sources/New.swift"]);
    }

    #[test]
    fn test_parse_porcelain_rename_returns_new_path() {
        let output = "R  Sources/Old.swift -> Sources/New.swift";
        assert_eq!(parse_porcelain(output), vec!["Sources/New.swift"]);
    }

    #[test]
    fn test_parse_porcelain_ignores_non_source_files() {
        let output = " M README.md\n M Sources/App.swift\n?? notes.txt";
        assert_eq!(parse_porcelain(output), vec!["Sources/App.swift"]);
    }

    #[test]
    fn test_parse_porcelain_empty() {
        assert!(parse_porcelain("").is_empty());
    }

    #[test]
    fn test_source_files_filters_extension() {
        let output = "Sources/A.swift\nPackage.resolved\nSources/B.swift";
        let files: Vec<String> = source_files(output).collect();
        assert_eq!(files, vec!["Sources/A.swift", "Sources/B.swift"]);
    }
}
