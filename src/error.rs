//! Error types and exit codes for swift-scip

use std::process::ExitCode;
use thiserror::Error;

/// Main error type for swift-scip operations
#[derive(Error, Debug)]
pub enum IndexerError {
    #[error("Index store not found under derived data: {path}")]
    IndexStoreNotFound { path: String },

    #[error("libIndexStore could not be located; searched: {}", .searched.join(", "))]
    LibraryNotFound { searched: Vec<String> },

    #[error("Failed to create database schema: {message}")]
    SchemaCreation { message: String },

    #[error("Failed to prepare statement: {message}")]
    StatementPreparation { message: String },

    #[error("Failed to execute statement: {message}")]
    StatementExecution { message: String },

    #[error("Failed to open database {path}: {message}")]
    OpenFailed { path: String, message: String },

    #[error("Not a git repository: {path}")]
    NotAGitRepository { path: String },

    #[error("Git error: {message}")]
    GitOperation { message: String },

    #[error("No branch cache for '{branch}'")]
    CacheNotFound { branch: String },

    #[error("Legacy state migration failed: {message}")]
    MigrationFailure { message: String },

    #[error("Index store error: {message}")]
    StoreIteration { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl IndexerError {
    /// Convert error to the exit code surfaced by the CLI:
    /// - 0: Success
    /// - 1: IO error
    /// - 2: Index store / native library not found
    /// - 3: Database error
    /// - 4: Git error
    /// - 5: Branch cache error
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::Io(_) => ExitCode::from(1),
            Self::IndexStoreNotFound { .. } => ExitCode::from(2),
            Self::LibraryNotFound { .. } => ExitCode::from(2),
            Self::StoreIteration { .. } => ExitCode::from(2),
            Self::SchemaCreation { .. } => ExitCode::from(3),
            Self::StatementPreparation { .. } => ExitCode::from(3),
            Self::StatementExecution { .. } => ExitCode::from(3),
            Self::OpenFailed { .. } => ExitCode::from(3),
            Self::NotAGitRepository { .. } => ExitCode::from(4),
            Self::GitOperation { .. } => ExitCode::from(4),
            Self::CacheNotFound { .. } => ExitCode::from(5),
            Self::MigrationFailure { .. } => ExitCode::from(5),
        }
    }
}

/// Result type alias for swift-scip operations
pub type Result<T> = std::result::Result<T, IndexerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_not_found_lists_candidates() {
        let err = IndexerError::LibraryNotFound {
            searched: vec!["/usr/lib/a.dylib".into(), "/usr/lib/b.so".into()],
        };
        let msg = err.to_string();
        assert!(msg.contains("/usr/lib/a.dylib"));
        assert!(msg.contains("/usr/lib/b.so"));
    }

    #[test]
    fn test_every_variant_maps_to_an_exit_code() {
        let errors = [
            IndexerError::IndexStoreNotFound { path: "dd".into() },
            IndexerError::NotAGitRepository { path: "p".into() },
            IndexerError::CacheNotFound {
                branch: "main".into(),
            },
            IndexerError::MigrationFailure {
                message: "bad json".into(),
            },
        ];
        for err in errors {
            let _ = err.exit_code();
        }
    }
}
