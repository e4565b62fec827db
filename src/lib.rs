//! swift-scip: SCIP code-intelligence indexing for Swift projects
//!
//! This library reads the raw index store the Swift compiler emits during a
//! build and produces a SCIP-model code-intelligence index: documents,
//! symbols, occurrences and relationships, stored in a SQLite database (or a
//! legacy JSON document). Indexing is branch-aware and incremental: git is
//! the change oracle, and per-branch snapshots of the database make a branch
//! switch a single file copy.
//!
//! # Pipeline
//!
//! 1. [`store::IndexStoreReader`] harvests normalized symbol, occurrence and
//!    relationship records from the compiler's store, synthesizing SCIP
//!    symbol-IDs through [`symbol::build_symbol_id`].
//! 2. [`db::IndexDb`] persists them with batched inserts, per-file
//!    incremental replacement and cascade deletes.
//! 3. [`git`] computes what changed since the last recorded commit, and
//!    [`branch_cache::BranchCacheManager`] snapshots the database per branch.
//!
//! # Example
//!
//! ```ignore
//! use std::path::Path;
//! use swift_scip::store::IndexStoreReader;
//! use swift_scip::db::IndexDb;
//!
//! let mut reader = IndexStoreReader::open(
//!     Path::new("/path/to/DerivedData/MyApp"),
//!     Path::new("/path/to/project"),
//!     true,
//! )?;
//! let symbols = reader.collect_symbols()?;
//! let relationships = reader.collect_relationships()?;
//! let occurrences = reader.collect_occurrences(None)?;
//!
//! let mut db = IndexDb::open(Path::new("index.db"))?;
//! db.write(&symbols, &occurrences, &relationships, Path::new("/path/to/project"))?;
//! ```

pub mod branch_cache;
pub mod cli;
pub mod commands;
pub mod db;
pub mod error;
pub mod git;
pub mod json_output;
pub mod model;
pub mod snippet;
pub mod store;
pub mod symbol;

// Re-export commonly used types
pub use branch_cache::{BranchCache, BranchCacheManager};
pub use cli::{Cli, Commands, IndexArgs, StatusArgs};
pub use db::{IndexDb, WriteStats};
pub use error::{IndexerError, Result};
pub use model::{
    IndexState, OccurrenceRecord, RelationshipKind, RelationshipRecord, SourceRange, SymbolKind,
    SymbolRecord, SymbolRoles,
};
pub use snippet::SnippetReader;
pub use store::{IndexStoreReader, RawOccurrence, RawRecords, RawRelation, RawRoles, RawStore};
pub use symbol::build_symbol_id;
