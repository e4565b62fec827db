//! Raw index-store vocabulary and the collaborator boundary
//!
//! The compiler's store speaks its own language: store-level symbol kinds,
//! a wide role bitmask shared between occurrences and relations, and
//! callback-driven iteration. Everything upstream of the reader uses these
//! types; the SCIP-side model never leaks down here.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Symbol kind as recorded by the compiler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RawSymbolKind {
    Unknown,
    Module,
    Enum,
    Struct,
    Class,
    Protocol,
    Extension,
    TypeAlias,
    Function,
    Variable,
    Field,
    EnumConstant,
    InstanceMethod,
    ClassMethod,
    StaticMethod,
    InstanceProperty,
    ClassProperty,
    StaticProperty,
    Constructor,
    Destructor,
    Parameter,
}

impl RawSymbolKind {
    /// Decode the integer kind used by libIndexStore
    pub fn from_store_value(value: u32) -> Self {
        match value {
            1 => Self::Module,
            5 => Self::Enum,
            6 => Self::Struct,
            7 => Self::Class,
            8 => Self::Protocol,
            9 => Self::Extension,
            11 => Self::TypeAlias,
            12 => Self::Function,
            13 => Self::Variable,
            14 => Self::Field,
            15 => Self::EnumConstant,
            16 => Self::InstanceMethod,
            17 => Self::ClassMethod,
            18 => Self::StaticMethod,
            19 => Self::InstanceProperty,
            20 => Self::ClassProperty,
            21 => Self::StaticProperty,
            22 => Self::Constructor,
            23 => Self::Destructor,
            25 => Self::Parameter,
            _ => Self::Unknown,
        }
    }
}

/// Occurrence and relation role bits, libIndexStore flag values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawRoles(pub u64);

impl RawRoles {
    pub const DECLARATION: RawRoles = RawRoles(1 << 0);
    pub const DEFINITION: RawRoles = RawRoles(1 << 1);
    pub const REFERENCE: RawRoles = RawRoles(1 << 2);
    pub const READ: RawRoles = RawRoles(1 << 3);
    pub const WRITE: RawRoles = RawRoles(1 << 4);
    pub const CALL: RawRoles = RawRoles(1 << 5);
    pub const DYNAMIC: RawRoles = RawRoles(1 << 6);
    pub const ADDRESS_OF: RawRoles = RawRoles(1 << 7);
    pub const IMPLICIT: RawRoles = RawRoles(1 << 8);

    pub const CHILD_OF: RawRoles = RawRoles(1 << 9);
    pub const BASE_OF: RawRoles = RawRoles(1 << 10);
    pub const OVERRIDE_OF: RawRoles = RawRoles(1 << 11);
    pub const RECEIVED_BY: RawRoles = RawRoles(1 << 12);
    pub const CALLED_BY: RawRoles = RawRoles(1 << 13);
    pub const EXTENDED_BY: RawRoles = RawRoles(1 << 14);
    pub const ACCESSOR_OF: RawRoles = RawRoles(1 << 15);
    pub const CONTAINED_BY: RawRoles = RawRoles(1 << 16);

    pub fn bits(&self) -> u64 {
        self.0
    }

    pub fn contains(&self, other: RawRoles) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for RawRoles {
    type Output = RawRoles;

    fn bitor(self, rhs: RawRoles) -> RawRoles {
        RawRoles(self.0 | rhs.0)
    }
}

/// A relation attached to an occurrence: how the occurrence's symbol and the
/// related symbol connect (child-of, base-of, override-of, ...)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRelation {
    pub roles: RawRoles,
    pub usr: String,
    pub name: String,
    pub kind: RawSymbolKind,
}

/// One symbol occurrence as the store reports it: 1-indexed point
/// coordinates, absolute file path, store-level roles and relations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawOccurrence {
    pub usr: String,
    pub name: String,
    pub kind: RawSymbolKind,
    pub roles: RawRoles,
    /// Absolute path of the containing source file
    pub path: String,
    /// 1-indexed line
    pub line: u32,
    /// 1-indexed UTF-8 column
    pub column: u32,
    #[serde(default)]
    pub relations: Vec<RawRelation>,
}

/// Interface to an opened index store.
///
/// Iteration is visitor-driven: the callback returns `true` to continue and
/// `false` to stop the walk, mirroring the native library's applier contract.
pub trait RawStore {
    /// Walk the canonical occurrence of each symbol (its definition when one
    /// exists, otherwise a distinguished stand-in).
    fn for_each_canonical(&self, visit: &mut dyn FnMut(&RawOccurrence) -> bool) -> Result<()>;

    /// Walk every occurrence of the symbol identified by `usr`, at any role.
    fn for_each_occurrence_of(
        &self,
        usr: &str,
        visit: &mut dyn FnMut(&RawOccurrence) -> bool,
    ) -> Result<()>;
}

/// Owned, in-memory store of harvested occurrences.
///
/// The native scanner accumulates into this; tests construct it directly.
/// Canonical selection prefers a definition-role occurrence and otherwise
/// keeps the first occurrence seen for the USR.
#[derive(Debug, Default)]
pub struct RawRecords {
    occurrences: Vec<RawOccurrence>,
    by_usr: HashMap<String, Vec<usize>>,
    canonical: HashMap<String, usize>,
}

impl RawRecords {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_occurrences(occurrences: Vec<RawOccurrence>) -> Self {
        let mut records = Self::new();
        for occ in occurrences {
            records.push(occ);
        }
        records
    }

    pub fn push(&mut self, occ: RawOccurrence) {
        let index = self.occurrences.len();
        let usr = occ.usr.clone();
        let is_definition = occ.roles.contains(RawRoles::DEFINITION);
        self.occurrences.push(occ);

        self.by_usr.entry(usr.clone()).or_default().push(index);
        let replace = match self.canonical.get(&usr).copied() {
            Some(current) => {
                is_definition && !self.occurrences[current].roles.contains(RawRoles::DEFINITION)
            }
            None => true,
        };
        if replace {
            self.canonical.insert(usr, index);
        }
    }

    pub fn len(&self) -> usize {
        self.occurrences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.occurrences.is_empty()
    }

    /// Number of distinct USRs
    pub fn symbol_count(&self) -> usize {
        self.by_usr.len()
    }
}

impl RawStore for RawRecords {
    fn for_each_canonical(&self, visit: &mut dyn FnMut(&RawOccurrence) -> bool) -> Result<()> {
        // Deterministic walk order keeps reader output stable across runs
        let mut usrs: Vec<&String> = self.canonical.keys().collect();
        usrs.sort();
        for usr in usrs {
            let occ = &self.occurrences[self.canonical[usr]];
            if !visit(occ) {
                break;
            }
        }
        Ok(())
    }

    fn for_each_occurrence_of(
        &self,
        usr: &str,
        visit: &mut dyn FnMut(&RawOccurrence) -> bool,
    ) -> Result<()> {
        if let Some(indices) = self.by_usr.get(usr) {
            for &index in indices {
                if !visit(&self.occurrences[index]) {
                    break;
                }
            }
        }
        Ok(())
    }
}
