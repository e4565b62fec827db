//! Cached one-line source reader for occurrence snippets
//!
//! Owned by a single index run and dropped with it; unreadable files yield
//! absent snippets, never errors.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Per-run line cache keyed by file path
#[derive(Debug, Default)]
pub struct SnippetReader {
    /// `None` marks a file that could not be read, so it is probed only once
    cache: HashMap<PathBuf, Option<Vec<String>>>,
}

impl SnippetReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the source line at `line` (0-indexed), trimmed of trailing
    /// whitespace. Returns `None` for unreadable files and out-of-range lines.
    pub fn line(&mut self, path: &Path, line: u32) -> Option<String> {
        let lines = self
            .cache
            .entry(path.to_path_buf())
            .or_insert_with(|| read_lines(path));

        lines
            .as_ref()?
            .get(line as usize)
            .map(|l| l.trim_end().to_string())
    }

    /// Number of files currently cached
    pub fn cached_files(&self) -> usize {
        self.cache.len()
    }
}

fn read_lines(path: &Path) -> Option<Vec<String>> {
    let content = fs::read_to_string(path).ok()?;
    Some(content.lines().map(str::to_string).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_reads_requested_line() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "line zero").unwrap();
        writeln!(file, "line one  ").unwrap();

        let mut reader = SnippetReader::new();
        assert_eq!(reader.line(file.path(), 0), Some("line zero".to_string()));
        assert_eq!(reader.line(file.path(), 1), Some("line one".to_string()));
        assert_eq!(reader.cached_files(), 1);
    }

    #[test]
    fn test_out_of_range_line_is_none() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "only line").unwrap();

        let mut reader = SnippetReader::new();
        assert_eq!(reader.line(file.path(), 5), None);
    }

    #[test]
    fn test_missing_file_is_none_and_cached() {
        let mut reader = SnippetReader::new();
        let path = Path::new("/nonexistent/source.swift");
        assert_eq!(reader.line(path, 0), None);
        assert_eq!(reader.line(path, 1), None);
        assert_eq!(reader.cached_files(), 1);
    }
}
