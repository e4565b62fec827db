//! SCIP-side data model for the index
//!
//! These are the records the reader produces and the back-ends persist:
//! source ranges with SCIP wire compaction, the occurrence role bitmask,
//! symbol/relationship kinds, and the per-run index state.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use serde::{Deserialize, Serialize};

/// Name reported in the metadata block of every emitted index
pub const TOOL_NAME: &str = "swift-scip";

/// Version reported in the metadata block of every emitted index
pub const TOOL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// SCIP format version written to metadata
pub const SCIP_VERSION: i64 = 1;

/// Text encoding of every indexed document
pub const TEXT_ENCODING: &str = "UTF-8";

/// A 0-indexed, half-open source range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRange {
    pub start_line: u32,
    pub start_col: u32,
    pub end_line: u32,
    pub end_col: u32,
}

impl SourceRange {
    pub fn new(start_line: u32, start_col: u32, end_line: u32, end_col: u32) -> Self {
        Self {
            start_line,
            start_col,
            end_line,
            end_col,
        }
    }

    /// Whether start and end fall on the same line
    pub fn is_single_line(&self) -> bool {
        self.start_line == self.end_line
    }

    /// Pack into SCIP wire form: `[line, startCol, endCol]` for a
    /// single-line range, `[startLine, startCol, endLine, endCol]` otherwise.
    pub fn scip(&self) -> Vec<i64> {
        if self.is_single_line() {
            vec![
                self.start_line as i64,
                self.start_col as i64,
                self.end_col as i64,
            ]
        } else {
            vec![
                self.start_line as i64,
                self.start_col as i64,
                self.end_line as i64,
                self.end_col as i64,
            ]
        }
    }
}

/// Occurrence role bitmask, SCIP flag values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SymbolRoles(pub u32);

impl SymbolRoles {
    pub const NONE: SymbolRoles = SymbolRoles(0);
    pub const DEFINITION: SymbolRoles = SymbolRoles(1);
    pub const IMPORT: SymbolRoles = SymbolRoles(2);
    pub const WRITE_ACCESS: SymbolRoles = SymbolRoles(4);
    pub const READ_ACCESS: SymbolRoles = SymbolRoles(8);
    /// Alias: plain references carry the read-access bit
    pub const REFERENCE: SymbolRoles = SymbolRoles(8);
    pub const GENERATED: SymbolRoles = SymbolRoles(16);
    pub const TEST: SymbolRoles = SymbolRoles(32);

    /// Raw flag value
    pub fn bits(&self) -> u32 {
        self.0
    }

    /// Whether every bit of `other` is set in `self`
    pub fn contains(&self, other: SymbolRoles) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Whether this occurrence defines its symbol
    pub fn is_definition(&self) -> bool {
        self.contains(Self::DEFINITION)
    }
}

impl BitOr for SymbolRoles {
    type Output = SymbolRoles;

    fn bitor(self, rhs: SymbolRoles) -> SymbolRoles {
        SymbolRoles(self.0 | rhs.0)
    }
}

impl BitOrAssign for SymbolRoles {
    fn bitor_assign(&mut self, rhs: SymbolRoles) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for SymbolRoles {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of an indexed symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    Class,
    Struct,
    Protocol,
    Enum,
    Function,
    Property,
    EnumCase,
    TypeAlias,
    Local,
    Unknown,
}

impl SymbolKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Class => "class",
            Self::Struct => "struct",
            Self::Protocol => "protocol",
            Self::Enum => "enum",
            Self::Function => "function",
            Self::Property => "property",
            Self::EnumCase => "enum_case",
            Self::TypeAlias => "type_alias",
            Self::Local => "local",
            Self::Unknown => "unknown",
        }
    }

    /// Parse the string stored in the symbols table
    pub fn from_db_str(s: &str) -> Self {
        match s {
            "class" => Self::Class,
            "struct" => Self::Struct,
            "protocol" => Self::Protocol,
            "enum" => Self::Enum,
            "function" => Self::Function,
            "property" => Self::Property,
            "enum_case" => Self::EnumCase,
            "type_alias" => Self::TypeAlias,
            "local" => Self::Local,
            _ => Self::Unknown,
        }
    }

    /// Whether this kind names a type declaration
    pub fn is_type_like(&self) -> bool {
        matches!(
            self,
            Self::Class | Self::Struct | Self::Protocol | Self::Enum | Self::TypeAlias
        )
    }
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of a directed symbol-to-symbol edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipKind {
    Conforms,
    Inherits,
    Overrides,
}

impl RelationshipKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Conforms => "conforms",
            Self::Inherits => "inherits",
            Self::Overrides => "overrides",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "conforms" => Some(Self::Conforms),
            "inherits" => Some(Self::Inherits),
            "overrides" => Some(Self::Overrides),
            _ => None,
        }
    }
}

impl fmt::Display for RelationshipKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A definable named entity harvested from the index store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolRecord {
    /// SCIP-formatted symbol-ID string
    pub symbol_id: String,
    pub kind: SymbolKind,
    /// Owning module, when it could be extracted from the USR
    pub module: Option<String>,
    /// Ordered documentation strings; usually empty for store-harvested symbols
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub documentation: Vec<String>,
}

/// One textual appearance of a symbol in a document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OccurrenceRecord {
    pub symbol_id: String,
    /// Project-relative path; absolute only when the file lies outside the root
    pub path: String,
    pub range: SourceRange,
    pub roles: SymbolRoles,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
    /// Symbol-ID of the innermost enclosing declaration, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enclosing_symbol: Option<String>,
    /// Display name of the enclosing declaration; not persisted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enclosing_name: Option<String>,
}

/// A directed edge between two symbols
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RelationshipRecord {
    pub symbol_id: String,
    pub target_symbol_id: String,
    pub kind: RelationshipKind,
}

/// The singleton change-detection record embedded in each database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexState {
    /// Commit hash of HEAD when the index was written
    pub commit: String,
    /// Wall clock at the end of the run, RFC 3339
    pub indexed_at: String,
    /// Project-relative paths covered by the index
    pub files: Vec<String>,
}
