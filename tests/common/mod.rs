//! Shared test infrastructure
//!
//! Tests use tempfile to create throwaway git repositories and fixture
//! record stores instead of shipping a real DerivedData tree.

use std::fs;
use std::path::Path;
use std::process::Command;

use tempfile::TempDir;

use swift_scip::store::{RawOccurrence, RawRecords, RawRelation, RawRoles, RawSymbolKind};

/// A temporary git repository holding Swift sources
pub struct TestProject {
    dir: TempDir,
}

impl TestProject {
    /// Create an initialized repository with user config set
    pub fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        let project = Self { dir };
        project.git(&["init"]);
        project.git(&["config", "user.email", "tests@example.com"]);
        project.git(&["config", "user.name", "Tests"]);
        project
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write a file relative to the project root, creating parents
    pub fn write_file(&self, rel: &str, content: &str) {
        let path = self.dir.path().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("failed to create parent dirs");
        }
        fs::write(path, content).expect("failed to write file");
    }

    pub fn remove_file(&self, rel: &str) {
        fs::remove_file(self.dir.path().join(rel)).expect("failed to remove file");
    }

    /// Stage everything and commit; returns the new HEAD hash
    pub fn commit_all(&self, message: &str) -> String {
        self.git(&["add", "-A"]);
        self.git(&["commit", "-m", message, "--allow-empty"]);
        self.git(&["rev-parse", "HEAD"])
    }

    /// Run git in the project, panicking on failure
    pub fn git(&self, args: &[&str]) -> String {
        let output = Command::new("git")
            .args(args)
            .current_dir(self.dir.path())
            .output()
            .expect("failed to run git");
        assert!(
            output.status.success(),
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
        String::from_utf8_lossy(&output.stdout).trim().to_string()
    }

    /// Absolute path of a project file, as the index store would report it
    pub fn abs(&self, rel: &str) -> String {
        self.dir.path().join(rel).to_string_lossy().into_owned()
    }
}

/// Builder for fixture record stores
#[derive(Default)]
pub struct FixtureStore {
    occurrences: Vec<RawOccurrence>,
}

impl FixtureStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A class definition occurrence with a conventional Swift USR
    pub fn class(mut self, module: &str, name: &str, path: &str, line: u32) -> Self {
        self.occurrences.push(RawOccurrence {
            usr: class_usr(module, name),
            name: name.to_string(),
            kind: RawSymbolKind::Class,
            roles: RawRoles::DEFINITION,
            path: path.to_string(),
            line,
            column: 7,
            relations: Vec::new(),
        });
        self
    }

    /// A method definition inside `container`
    pub fn method(mut self, module: &str, container: &str, name: &str, path: &str, line: u32) -> Self {
        self.occurrences.push(RawOccurrence {
            usr: format!("{}{}{}yyF", class_usr(module, container), name.len(), name),
            name: name.to_string(),
            kind: RawSymbolKind::InstanceMethod,
            roles: RawRoles::DEFINITION,
            path: path.to_string(),
            line,
            column: 10,
            relations: vec![RawRelation {
                roles: RawRoles::CHILD_OF,
                usr: class_usr(module, container),
                name: container.to_string(),
                kind: RawSymbolKind::Class,
            }],
        });
        self
    }

    /// A reference to a class defined elsewhere in the fixture
    pub fn reference(mut self, module: &str, name: &str, path: &str, line: u32) -> Self {
        self.occurrences.push(RawOccurrence {
            usr: class_usr(module, name),
            name: name.to_string(),
            kind: RawSymbolKind::Class,
            roles: RawRoles::REFERENCE,
            path: path.to_string(),
            line,
            column: 13,
            relations: Vec::new(),
        });
        self
    }

    /// Mark `sub` as inheriting from `base` (a base-of relation on the
    /// base class's definition, as the store records it)
    pub fn inherits(mut self, module: &str, sub: &str, base: &str) -> Self {
        if let Some(occ) = self
            .occurrences
            .iter_mut()
            .find(|o| o.name == base && o.roles.contains(RawRoles::DEFINITION))
        {
            occ.relations.push(RawRelation {
                roles: RawRoles::BASE_OF,
                usr: class_usr(module, sub),
                name: sub.to_string(),
                kind: RawSymbolKind::Class,
            });
        }
        self
    }

    pub fn build(self) -> RawRecords {
        RawRecords::from_occurrences(self.occurrences)
    }
}

/// Mangled-shape USR: `s:<len><module><len><name>C`
pub fn class_usr(module: &str, name: &str) -> String {
    format!("s:{}{}{}{}C", module.len(), module, name.len(), name)
}

