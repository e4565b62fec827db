//! SCIP storage engine
//!
//! A SQLite-backed relational store of documents, symbols, occurrences and
//! relationships, with batched full overwrites, surgical per-file updates,
//! cascade-on-delete, and the embedded index-state row used for change
//! detection.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, OpenFlags, OptionalExtension};

use crate::error::{IndexerError, Result};
use crate::model::{
    IndexState, OccurrenceRecord, RelationshipRecord, SymbolRecord, SCIP_VERSION, TEXT_ENCODING,
    TOOL_NAME, TOOL_VERSION,
};

/// Language tag stored on every document
const DOCUMENT_LANGUAGE: &str = "swift";

/// Counts reported after a successful full write
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteStats {
    pub documents: usize,
    pub symbols: usize,
    pub occurrences: usize,
    pub relationships: usize,
}

/// One open index database. Each instance exclusively owns its connection.
pub struct IndexDb {
    conn: Connection,
    path: PathBuf,
}

impl IndexDb {
    /// Open read-write, creating the file and schema when absent
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|e| IndexerError::OpenFailed {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let db = Self {
            conn,
            path: path.to_path_buf(),
        };
        db.configure()?;
        db.create_schema()?;
        Ok(db)
    }

    /// Open an existing database read-only; fails when the file is missing
    pub fn open_read_only(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(IndexerError::OpenFailed {
                path: path.display().to_string(),
                message: "file does not exist".to_string(),
            });
        }
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY).map_err(
            |e| IndexerError::OpenFailed {
                path: path.display().to_string(),
                message: e.to_string(),
            },
        )?;
        Ok(Self {
            conn,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Performance pragmas; foreign keys must be on for the cascades
    fn configure(&self) -> Result<()> {
        self.conn
            .execute_batch(
                "PRAGMA journal_mode = WAL;
                 PRAGMA cache_size = -81920;
                 PRAGMA synchronous = NORMAL;
                 PRAGMA foreign_keys = ON;",
            )
            .map_err(|e| IndexerError::OpenFailed {
                path: self.path.display().to_string(),
                message: e.to_string(),
            })
    }

    /// Create tables and indexes; idempotent
    fn create_schema(&self) -> Result<()> {
        self.conn
            .execute_batch(
                r#"
                CREATE TABLE IF NOT EXISTS metadata (
                    key TEXT PRIMARY KEY,
                    value TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS index_state (
                    commit_hash TEXT NOT NULL,
                    indexed_at TEXT NOT NULL,
                    files_json TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS documents (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    rel_path TEXT NOT NULL UNIQUE,
                    language TEXT NOT NULL,
                    indexed_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS symbols (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    symbol_id TEXT NOT NULL,
                    kind TEXT NOT NULL,
                    doc_json TEXT,
                    file_id INTEGER NOT NULL REFERENCES documents(id) ON DELETE CASCADE
                );

                CREATE TABLE IF NOT EXISTS occurrences (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    symbol_id TEXT NOT NULL,
                    file_id INTEGER NOT NULL REFERENCES documents(id) ON DELETE CASCADE,
                    start_line INTEGER NOT NULL,
                    start_col INTEGER NOT NULL,
                    end_line INTEGER NOT NULL,
                    end_col INTEGER NOT NULL,
                    roles INTEGER NOT NULL,
                    enclosing TEXT,
                    snippet TEXT
                );

                CREATE TABLE IF NOT EXISTS relationships (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    symbol_id TEXT NOT NULL,
                    target_symbol_id TEXT NOT NULL,
                    kind TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_documents_rel_path ON documents(rel_path);
                CREATE INDEX IF NOT EXISTS idx_symbols_symbol_id ON symbols(symbol_id);
                CREATE INDEX IF NOT EXISTS idx_symbols_file_id ON symbols(file_id);
                CREATE INDEX IF NOT EXISTS idx_occurrences_symbol_id ON occurrences(symbol_id);
                CREATE INDEX IF NOT EXISTS idx_occurrences_file_id ON occurrences(file_id);
                CREATE INDEX IF NOT EXISTS idx_relationships_symbol_id ON relationships(symbol_id);
                "#,
            )
            .map_err(|e| IndexerError::SchemaCreation {
                message: e.to_string(),
            })
    }

    /// Full overwrite: replace every document, symbol, occurrence and
    /// relationship in one transaction, rewriting the metadata block.
    pub fn write(
        &mut self,
        symbols: &[SymbolRecord],
        occurrences: &[OccurrenceRecord],
        relationships: &[RelationshipRecord],
        project_root: &Path,
    ) -> Result<WriteStats> {
        let tx = self.conn.transaction().map_err(exec_err)?;
        let mut stats = WriteStats::default();

        // Delete order respects the foreign keys
        tx.execute("DELETE FROM occurrences", []).map_err(exec_err)?;
        tx.execute("DELETE FROM relationships", [])
            .map_err(exec_err)?;
        tx.execute("DELETE FROM symbols", []).map_err(exec_err)?;
        tx.execute("DELETE FROM documents", []).map_err(exec_err)?;

        write_metadata(&tx, project_root)?;

        let by_file = group_by_file(occurrences);
        let defining = definition_files(occurrences);
        let now = chrono::Utc::now().to_rfc3339();

        {
            let mut doc_stmt = tx
                .prepare("INSERT INTO documents (rel_path, language, indexed_at) VALUES (?1, ?2, ?3)")
                .map_err(prep_err)?;
            let mut sym_stmt = tx
                .prepare("INSERT INTO symbols (symbol_id, kind, doc_json, file_id) VALUES (?1, ?2, ?3, ?4)")
                .map_err(prep_err)?;
            let mut occ_stmt = tx
                .prepare(
                    "INSERT INTO occurrences
                     (symbol_id, file_id, start_line, start_col, end_line, end_col, roles, enclosing, snippet)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                )
                .map_err(prep_err)?;
            let mut rel_stmt = tx
                .prepare(
                    "INSERT INTO relationships (symbol_id, target_symbol_id, kind) VALUES (?1, ?2, ?3)",
                )
                .map_err(prep_err)?;

            for (path, file_occurrences) in &by_file {
                doc_stmt
                    .execute(params![path, DOCUMENT_LANGUAGE, now])
                    .map_err(exec_err)?;
                let file_id = tx.last_insert_rowid();
                stats.documents += 1;

                for symbol in symbols {
                    if defining.get(symbol.symbol_id.as_str()) == Some(path) {
                        sym_stmt
                            .execute(params![
                                symbol.symbol_id,
                                symbol.kind.as_str(),
                                doc_json(&symbol.documentation),
                                file_id,
                            ])
                            .map_err(exec_err)?;
                        stats.symbols += 1;
                    }
                }

                for occ in file_occurrences {
                    insert_occurrence(&mut occ_stmt, occ, file_id)?;
                    stats.occurrences += 1;
                }
            }

            for rel in relationships {
                rel_stmt
                    .execute(params![rel.symbol_id, rel.target_symbol_id, rel.kind.as_str()])
                    .map_err(exec_err)?;
                stats.relationships += 1;
            }
        }

        tx.commit().map_err(exec_err)?;
        Ok(stats)
    }

    /// Surgical per-file replacement. Documents not named in `paths` are
    /// untouched; relationships are never touched here.
    ///
    /// Returns the number of documents now present for the named paths.
    pub fn update_documents(
        &mut self,
        paths: &[String],
        symbols: &[SymbolRecord],
        occurrences: &[OccurrenceRecord],
    ) -> Result<usize> {
        let tx = self.conn.transaction().map_err(exec_err)?;
        let path_set: HashSet<&str> = paths.iter().map(String::as_str).collect();

        let by_file = group_by_file(occurrences);
        let defining = definition_files(occurrences);
        let now = chrono::Utc::now().to_rfc3339();
        let mut replaced = 0;

        {
            let mut lookup_stmt = tx
                .prepare("SELECT id FROM documents WHERE rel_path = ?1")
                .map_err(prep_err)?;
            let mut doc_stmt = tx
                .prepare("INSERT INTO documents (rel_path, language, indexed_at) VALUES (?1, ?2, ?3)")
                .map_err(prep_err)?;
            let mut sym_stmt = tx
                .prepare("INSERT INTO symbols (symbol_id, kind, doc_json, file_id) VALUES (?1, ?2, ?3, ?4)")
                .map_err(prep_err)?;
            let mut occ_stmt = tx
                .prepare(
                    "INSERT INTO occurrences
                     (symbol_id, file_id, start_line, start_col, end_line, end_col, roles, enclosing, snippet)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                )
                .map_err(prep_err)?;

            for path in paths {
                let existing: Option<i64> = lookup_stmt
                    .query_row(params![path], |row| row.get(0))
                    .optional()
                    .map_err(exec_err)?;

                // The cascade would cover the children, but explicit deletes
                // keep the replacement legible
                if let Some(doc_id) = existing {
                    tx.execute("DELETE FROM occurrences WHERE file_id = ?1", params![doc_id])
                        .map_err(exec_err)?;
                    tx.execute("DELETE FROM symbols WHERE file_id = ?1", params![doc_id])
                        .map_err(exec_err)?;
                    tx.execute("DELETE FROM documents WHERE id = ?1", params![doc_id])
                        .map_err(exec_err)?;
                }

                let file_occurrences = match by_file.get(path.as_str()) {
                    Some(occs) => occs,
                    // A changed file with no occurrences left (emptied or
                    // now failing to compile) ends up deleted, not re-added
                    None => continue,
                };

                doc_stmt
                    .execute(params![path, DOCUMENT_LANGUAGE, now])
                    .map_err(exec_err)?;
                let file_id = tx.last_insert_rowid();
                replaced += 1;

                for symbol in symbols {
                    if defining.get(symbol.symbol_id.as_str()) == Some(&path.as_str()) {
                        sym_stmt
                            .execute(params![
                                symbol.symbol_id,
                                symbol.kind.as_str(),
                                doc_json(&symbol.documentation),
                                file_id,
                            ])
                            .map_err(exec_err)?;
                    }
                }

                for occ in file_occurrences {
                    if path_set.contains(occ.path.as_str()) {
                        insert_occurrence(&mut occ_stmt, occ, file_id)?;
                    }
                }
            }
        }

        tx.commit().map_err(exec_err)?;
        Ok(replaced)
    }

    /// Remove documents by path; symbols and occurrences cascade
    pub fn delete_documents(&mut self, paths: &[String]) -> Result<usize> {
        let tx = self.conn.transaction().map_err(exec_err)?;
        let mut deleted = 0;
        {
            let mut stmt = tx
                .prepare("DELETE FROM documents WHERE rel_path = ?1")
                .map_err(prep_err)?;
            for path in paths {
                deleted += stmt.execute(params![path]).map_err(exec_err)?;
            }
        }
        tx.commit().map_err(exec_err)?;
        Ok(deleted)
    }

    /// Replace the singleton index-state row
    pub fn save_state(&mut self, commit: &str, files: &[String]) -> Result<()> {
        let files_json =
            serde_json::to_string(files).map_err(|e| IndexerError::StatementExecution {
                message: format!("failed to encode file list: {e}"),
            })?;
        let now = chrono::Utc::now().to_rfc3339();

        let tx = self.conn.transaction().map_err(exec_err)?;
        tx.execute("DELETE FROM index_state", []).map_err(exec_err)?;
        tx.execute(
            "INSERT INTO index_state (commit_hash, indexed_at, files_json) VALUES (?1, ?2, ?3)",
            params![commit, now, files_json],
        )
        .map_err(exec_err)?;
        tx.commit().map_err(exec_err)?;
        Ok(())
    }

    /// Read the index-state row, when one exists
    pub fn load_state(&self) -> Result<Option<IndexState>> {
        let row: Option<(String, String, String)> = self
            .conn
            .query_row(
                "SELECT commit_hash, indexed_at, files_json FROM index_state",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()
            .map_err(exec_err)?;

        match row {
            Some((commit, indexed_at, files_json)) => {
                let files: Vec<String> = serde_json::from_str(&files_json).unwrap_or_default();
                Ok(Some(IndexState {
                    commit,
                    indexed_at,
                    files,
                }))
            }
            None => Ok(None),
        }
    }

    /// Every document path, sorted
    pub fn get_indexed_file_paths(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT rel_path FROM documents ORDER BY rel_path")
            .map_err(prep_err)?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(exec_err)?;
        let mut paths = Vec::new();
        for row in rows {
            paths.push(row.map_err(exec_err)?);
        }
        Ok(paths)
    }

    /// Row count of an index table, for status output and tests
    pub fn count(&self, table: Table) -> Result<usize> {
        let sql = match table {
            Table::Documents => "SELECT COUNT(*) FROM documents",
            Table::Symbols => "SELECT COUNT(*) FROM symbols",
            Table::Occurrences => "SELECT COUNT(*) FROM occurrences",
            Table::Relationships => "SELECT COUNT(*) FROM relationships",
        };
        let count: i64 = self
            .conn
            .query_row(sql, [], |row| row.get(0))
            .map_err(exec_err)?;
        Ok(count as usize)
    }
}

/// Tables exposed through [`IndexDb::count`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Documents,
    Symbols,
    Occurrences,
    Relationships,
}

fn prep_err(e: rusqlite::Error) -> IndexerError {
    IndexerError::StatementPreparation {
        message: e.to_string(),
    }
}

fn exec_err(e: rusqlite::Error) -> IndexerError {
    IndexerError::StatementExecution {
        message: e.to_string(),
    }
}

fn doc_json(documentation: &[String]) -> Option<String> {
    if documentation.is_empty() {
        None
    } else {
        serde_json::to_string(documentation).ok()
    }
}

/// Group occurrences by containing file, deterministically ordered
fn group_by_file(occurrences: &[OccurrenceRecord]) -> BTreeMap<&str, Vec<&OccurrenceRecord>> {
    let mut by_file: BTreeMap<&str, Vec<&OccurrenceRecord>> = BTreeMap::new();
    for occ in occurrences {
        by_file.entry(occ.path.as_str()).or_default().push(occ);
    }
    by_file
}

/// Map each symbol-ID to the file containing its definition occurrence
fn definition_files(occurrences: &[OccurrenceRecord]) -> HashMap<&str, &str> {
    let mut defining = HashMap::new();
    for occ in occurrences {
        if occ.roles.is_definition() {
            defining.entry(occ.symbol_id.as_str()).or_insert(occ.path.as_str());
        }
    }
    defining
}

fn insert_occurrence(
    stmt: &mut rusqlite::Statement<'_>,
    occ: &OccurrenceRecord,
    file_id: i64,
) -> Result<()> {
    stmt.execute(params![
        occ.symbol_id,
        file_id,
        occ.range.start_line,
        occ.range.start_col,
        occ.range.end_line,
        occ.range.end_col,
        occ.roles.bits(),
        occ.enclosing_symbol,
        occ.snippet,
    ])
    .map_err(exec_err)?;
    Ok(())
}

/// Rewrite the metadata block describing this index
fn write_metadata(tx: &rusqlite::Transaction<'_>, project_root: &Path) -> Result<()> {
    tx.execute("DELETE FROM metadata", []).map_err(exec_err)?;
    let mut stmt = tx
        .prepare("INSERT INTO metadata (key, value) VALUES (?1, ?2)")
        .map_err(prep_err)?;
    let entries = [
        ("scip_version", SCIP_VERSION.to_string()),
        ("tool_name", TOOL_NAME.to_string()),
        ("tool_version", TOOL_VERSION.to_string()),
        (
            "project_root",
            format!("file://{}", project_root.display()),
        ),
        ("text_encoding", TEXT_ENCODING.to_string()),
    ];
    for (key, value) in entries {
        stmt.execute(params![key, value]).map_err(exec_err)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{SourceRange, SymbolKind, SymbolRoles};
    use tempfile::TempDir;

    fn occurrence(symbol_id: &str, path: &str, roles: SymbolRoles, line: u32) -> OccurrenceRecord {
        OccurrenceRecord {
            symbol_id: symbol_id.to_string(),
            path: path.to_string(),
            range: SourceRange::new(line, 0, line, 5),
            roles,
            snippet: None,
            enclosing_symbol: None,
            enclosing_name: None,
        }
    }

    fn symbol(symbol_id: &str, kind: SymbolKind) -> SymbolRecord {
        SymbolRecord {
            symbol_id: symbol_id.to_string(),
            kind,
            module: Some("App".to_string()),
            documentation: Vec::new(),
        }
    }

    fn sample_data() -> (Vec<SymbolRecord>, Vec<OccurrenceRecord>, Vec<RelationshipRecord>) {
        let symbols = vec![
            symbol("swift App A#", SymbolKind::Class),
            symbol("swift App B#", SymbolKind::Struct),
        ];
        let occurrences = vec![
            occurrence("swift App A#", "a.swift", SymbolRoles::DEFINITION, 0),
            occurrence("swift App A#", "b.swift", SymbolRoles::REFERENCE, 3),
            occurrence("swift App B#", "b.swift", SymbolRoles::DEFINITION, 1),
        ];
        let relationships = vec![RelationshipRecord {
            symbol_id: "swift App B#".to_string(),
            target_symbol_id: "swift App A#".to_string(),
            kind: crate::model::RelationshipKind::Inherits,
        }];
        (symbols, occurrences, relationships)
    }

    fn open_db(dir: &TempDir) -> IndexDb {
        IndexDb::open(&dir.path().join("index.db")).unwrap()
    }

    #[test]
    fn test_full_write_counts() {
        let dir = TempDir::new().unwrap();
        let mut db = open_db(&dir);
        let (symbols, occurrences, relationships) = sample_data();

        let stats = db
            .write(&symbols, &occurrences, &relationships, Path::new("/project"))
            .unwrap();
        assert_eq!(stats.documents, 2);
        assert_eq!(stats.symbols, 2);
        assert_eq!(stats.occurrences, 3);
        assert_eq!(stats.relationships, 1);
    }

    #[test]
    fn test_symbols_stored_under_defining_document() {
        let dir = TempDir::new().unwrap();
        let mut db = open_db(&dir);
        let (symbols, occurrences, relationships) = sample_data();
        db.write(&symbols, &occurrences, &relationships, Path::new("/p"))
            .unwrap();

        // "swift App A#" defines in a.swift even though b.swift references it
        let file: String = db
            .conn
            .query_row(
                "SELECT d.rel_path FROM symbols s JOIN documents d ON s.file_id = d.id
                 WHERE s.symbol_id = 'swift App A#'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(file, "a.swift");
    }

    #[test]
    fn test_full_write_is_an_overwrite() {
        let dir = TempDir::new().unwrap();
        let mut db = open_db(&dir);
        let (symbols, occurrences, relationships) = sample_data();
        db.write(&symbols, &occurrences, &relationships, Path::new("/p"))
            .unwrap();
        db.write(&symbols, &occurrences, &relationships, Path::new("/p"))
            .unwrap();

        assert_eq!(db.count(Table::Documents).unwrap(), 2);
        assert_eq!(db.count(Table::Occurrences).unwrap(), 3);
        assert_eq!(db.count(Table::Relationships).unwrap(), 1);
    }

    #[test]
    fn test_metadata_block() {
        let dir = TempDir::new().unwrap();
        let mut db = open_db(&dir);
        let (symbols, occurrences, relationships) = sample_data();
        db.write(&symbols, &occurrences, &relationships, Path::new("/my/project"))
            .unwrap();

        let root: String = db
            .conn
            .query_row(
                "SELECT value FROM metadata WHERE key = 'project_root'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(root, "file:///my/project");
    }

    #[test]
    fn test_cascade_delete() {
        let dir = TempDir::new().unwrap();
        let mut db = open_db(&dir);
        let (symbols, occurrences, relationships) = sample_data();
        db.write(&symbols, &occurrences, &relationships, Path::new("/p"))
            .unwrap();

        let deleted = db.delete_documents(&["b.swift".to_string()]).unwrap();
        assert_eq!(deleted, 1);

        // b.swift held one definition symbol and two occurrences
        assert_eq!(db.count(Table::Documents).unwrap(), 1);
        assert_eq!(db.count(Table::Symbols).unwrap(), 1);
        assert_eq!(db.count(Table::Occurrences).unwrap(), 1);
    }

    #[test]
    fn test_incremental_update_touches_only_named_paths() {
        let dir = TempDir::new().unwrap();
        let mut db = open_db(&dir);
        let (symbols, occurrences, relationships) = sample_data();
        db.write(&symbols, &occurrences, &relationships, Path::new("/p"))
            .unwrap();

        let new_symbols = vec![symbol("swift App B2#", SymbolKind::Struct)];
        let new_occurrences = vec![
            occurrence("swift App B2#", "b.swift", SymbolRoles::DEFINITION, 9),
            occurrence("swift App B2#", "b.swift", SymbolRoles::REFERENCE, 10),
        ];
        let replaced = db
            .update_documents(&["b.swift".to_string()], &new_symbols, &new_occurrences)
            .unwrap();
        assert_eq!(replaced, 1);

        // a.swift untouched, b.swift fully replaced, relationships preserved
        let paths = db.get_indexed_file_paths().unwrap();
        assert_eq!(paths, vec!["a.swift".to_string(), "b.swift".to_string()]);
        assert_eq!(db.count(Table::Occurrences).unwrap(), 3);
        assert_eq!(db.count(Table::Relationships).unwrap(), 1);

        let b2_count: i64 = db
            .conn
            .query_row(
                "SELECT COUNT(*) FROM occurrences WHERE symbol_id = 'swift App B2#'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(b2_count, 2);
    }

    #[test]
    fn test_incremental_update_drops_emptied_documents() {
        let dir = TempDir::new().unwrap();
        let mut db = open_db(&dir);
        let (symbols, occurrences, relationships) = sample_data();
        db.write(&symbols, &occurrences, &relationships, Path::new("/p"))
            .unwrap();

        let replaced = db
            .update_documents(&["b.swift".to_string()], &[], &[])
            .unwrap();
        assert_eq!(replaced, 0);
        assert_eq!(
            db.get_indexed_file_paths().unwrap(),
            vec!["a.swift".to_string()]
        );
    }

    #[test]
    fn test_state_round_trip() {
        let dir = TempDir::new().unwrap();
        let mut db = open_db(&dir);
        assert!(db.load_state().unwrap().is_none());

        let files = vec!["a.swift".to_string(), "b.swift".to_string()];
        db.save_state("abc123", &files).unwrap();

        let state = db.load_state().unwrap().unwrap();
        assert_eq!(state.commit, "abc123");
        assert_eq!(state.files, files);
    }

    #[test]
    fn test_state_row_is_singleton() {
        let dir = TempDir::new().unwrap();
        let mut db = open_db(&dir);
        db.save_state("one", &[]).unwrap();
        db.save_state("two", &[]).unwrap();

        let rows: i64 = db
            .conn
            .query_row("SELECT COUNT(*) FROM index_state", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, 1);
        assert_eq!(db.load_state().unwrap().unwrap().commit, "two");
    }

    #[test]
    fn test_read_only_requires_existing_file() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("absent.db");
        assert!(matches!(
            IndexDb::open_read_only(&missing),
            Err(IndexerError::OpenFailed { .. })
        ));
    }

    #[test]
    fn test_read_only_reads_state() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("index.db");
        {
            let mut db = IndexDb::open(&path).unwrap();
            db.save_state("abc", &["f.swift".to_string()]).unwrap();
        }
        let db = IndexDb::open_read_only(&path).unwrap();
        assert_eq!(db.load_state().unwrap().unwrap().commit, "abc");
    }

    #[test]
    fn test_schema_creation_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("index.db");
        drop(IndexDb::open(&path).unwrap());
        drop(IndexDb::open(&path).unwrap());
    }
}
