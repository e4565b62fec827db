//! Index-store harvesting
//!
//! Turns the compiler's raw occurrence stream into normalized SCIP-side
//! records: deduplicated symbols, project-relative occurrences with 0-indexed
//! ranges, and inheritance/override relationships.

pub mod libindexstore;
pub mod raw;

pub use libindexstore::LibIndexStore;
pub use raw::{RawOccurrence, RawRecords, RawRelation, RawRoles, RawStore, RawSymbolKind};

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use crate::error::{IndexerError, Result};
use crate::model::{
    OccurrenceRecord, RelationshipKind, RelationshipRecord, SourceRange, SymbolKind, SymbolRecord,
    SymbolRoles,
};
use crate::snippet::SnippetReader;
use crate::symbol::{build_symbol_id, module_from_usr};

/// Extension of indexable source files
pub const SOURCE_EXTENSION: &str = ".swift";

/// Locate the DataStore directory under a derived-data root.
///
/// Newer toolchains write `Index.noindex/DataStore`; older ones `Index/DataStore`.
pub fn resolve_datastore(derived_data: &Path) -> Result<PathBuf> {
    let preferred = derived_data.join("Index.noindex").join("DataStore");
    if preferred.is_dir() {
        return Ok(preferred);
    }
    let legacy = derived_data.join("Index").join("DataStore");
    if legacy.is_dir() {
        return Ok(legacy);
    }
    Err(IndexerError::IndexStoreNotFound {
        path: derived_data.display().to_string(),
    })
}

/// Identity of one harvested symbol, computed once per USR
#[derive(Debug, Clone)]
struct SymbolIdentity {
    symbol_id: String,
    name: String,
    kind: SymbolKind,
    module: Option<String>,
}

/// Streams normalized records out of a raw index store
pub struct IndexStoreReader<S: RawStore> {
    store: S,
    project_root: PathBuf,
    include_snippets: bool,
    module_filter: Option<HashSet<String>>,
    snippets: SnippetReader,
}

impl IndexStoreReader<RawRecords> {
    /// Open the index store under `derived_data` through the native library
    /// and scan it into memory.
    pub fn open(
        derived_data: &Path,
        project_root: &Path,
        include_snippets: bool,
    ) -> Result<IndexStoreReader<RawRecords>> {
        let datastore = resolve_datastore(derived_data)?;
        let library = LibIndexStore::load()?;
        let records = library.scan(&datastore)?;
        tracing::debug!(
            occurrences = records.len(),
            symbols = records.symbol_count(),
            "scanned index store at {}",
            datastore.display()
        );
        Ok(Self::with_store(records, project_root, include_snippets))
    }
}

impl<S: RawStore> IndexStoreReader<S> {
    /// Build a reader over an already-opened store
    pub fn with_store(store: S, project_root: &Path, include_snippets: bool) -> Self {
        Self {
            store,
            project_root: project_root.to_path_buf(),
            include_snippets,
            module_filter: None,
            snippets: SnippetReader::new(),
        }
    }

    /// Restrict harvesting to symbols owned by the given modules
    pub fn with_module_filter<I, T>(mut self, modules: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let filter: HashSet<String> = modules.into_iter().map(Into::into).collect();
        self.module_filter = (!filter.is_empty()).then_some(filter);
        self
    }

    /// Collect one `SymbolRecord` per USR in the store
    pub fn collect_symbols(&self) -> Result<Vec<SymbolRecord>> {
        let mut symbols = Vec::new();
        let filter = self.module_filter.as_ref();

        self.store.for_each_canonical(&mut |occ| {
            let identity = identity_for(occ);
            if module_passes(filter, identity.module.as_deref()) {
                symbols.push(SymbolRecord {
                    symbol_id: identity.symbol_id,
                    kind: identity.kind,
                    module: identity.module,
                    documentation: Vec::new(),
                });
            }
            true
        })?;

        Ok(symbols)
    }

    /// Collect inheritance and override edges from canonical relation lists
    pub fn collect_relationships(&self) -> Result<Vec<RelationshipRecord>> {
        let mut seen: HashSet<RelationshipRecord> = HashSet::new();
        let mut relationships = Vec::new();
        let filter = self.module_filter.as_ref();

        self.store.for_each_canonical(&mut |occ| {
            let identity = identity_for(occ);
            if !module_passes(filter, identity.module.as_deref()) {
                return true;
            }
            for relation in &occ.relations {
                let related = relation_symbol_id(relation);
                let record = if relation.roles.contains(RawRoles::BASE_OF) {
                    // The occurrence's symbol is the base: the related symbol
                    // inherits from it
                    RelationshipRecord {
                        symbol_id: related,
                        target_symbol_id: identity.symbol_id.clone(),
                        kind: RelationshipKind::Inherits,
                    }
                } else if relation.roles.contains(RawRoles::OVERRIDE_OF) {
                    RelationshipRecord {
                        symbol_id: identity.symbol_id.clone(),
                        target_symbol_id: related,
                        kind: RelationshipKind::Overrides,
                    }
                } else {
                    continue;
                };
                if seen.insert(record.clone()) {
                    relationships.push(record);
                }
            }
            true
        })?;

        Ok(relationships)
    }

    /// Collect every occurrence, optionally restricted to a whitelist of
    /// project-relative paths. `None` means all files.
    ///
    /// Two passes: a canonical walk fixes each USR's symbol identity, then a
    /// per-USR walk enumerates occurrences at every role. Per-USR enumeration
    /// failures are skipped; canonical-walk failures abort the run.
    pub fn collect_occurrences(
        &mut self,
        path_filter: Option<&HashSet<String>>,
    ) -> Result<Vec<OccurrenceRecord>> {
        let identities = self.collect_identities()?;

        let mut usrs: Vec<&String> = identities.keys().collect();
        usrs.sort();

        let mut occurrences = Vec::new();
        for usr in usrs {
            let identity = &identities[usr];
            let mut partial = Vec::new();
            let walk = self.store.for_each_occurrence_of(usr, &mut |occ| {
                if let Some(record) = normalize_occurrence(
                    occ,
                    identity,
                    &self.project_root,
                    path_filter,
                ) {
                    partial.push(record);
                }
                true
            });

            match walk {
                Ok(()) => {
                    if self.include_snippets {
                        for record in &mut partial {
                            record.snippet = self.snippets.line(
                                &absolute_path(&self.project_root, &record.path),
                                record.range.start_line,
                            );
                        }
                    }
                    occurrences.append(&mut partial);
                }
                Err(e) => {
                    tracing::warn!("skipping occurrences of {usr}: {e}");
                }
            }
        }

        Ok(occurrences)
    }

    /// Pass 1: canonical walk, fixing each live USR's identity
    fn collect_identities(&self) -> Result<HashMap<String, SymbolIdentity>> {
        let filter = self.module_filter.as_ref();
        let mut identities = HashMap::new();

        self.store.for_each_canonical(&mut |occ| {
            let identity = identity_for(occ);
            if module_passes(filter, identity.module.as_deref()) {
                identities.insert(occ.usr.clone(), identity);
            }
            true
        })?;

        Ok(identities)
    }
}

/// Map a store-level kind onto the SCIP-side enumeration
pub fn map_kind(raw: RawSymbolKind) -> SymbolKind {
    match raw {
        RawSymbolKind::Class => SymbolKind::Class,
        RawSymbolKind::Struct => SymbolKind::Struct,
        RawSymbolKind::Protocol => SymbolKind::Protocol,
        RawSymbolKind::Enum => SymbolKind::Enum,
        RawSymbolKind::TypeAlias => SymbolKind::TypeAlias,
        RawSymbolKind::Function
        | RawSymbolKind::InstanceMethod
        | RawSymbolKind::ClassMethod
        | RawSymbolKind::StaticMethod
        | RawSymbolKind::Constructor
        | RawSymbolKind::Destructor => SymbolKind::Function,
        RawSymbolKind::Variable
        | RawSymbolKind::Field
        | RawSymbolKind::InstanceProperty
        | RawSymbolKind::ClassProperty
        | RawSymbolKind::StaticProperty => SymbolKind::Property,
        RawSymbolKind::EnumConstant => SymbolKind::EnumCase,
        RawSymbolKind::Parameter => SymbolKind::Local,
        RawSymbolKind::Unknown | RawSymbolKind::Module | RawSymbolKind::Extension => {
            SymbolKind::Unknown
        }
    }
}

/// Map store-level occurrence roles onto the SCIP bitmask
pub fn map_roles(raw: RawRoles) -> SymbolRoles {
    let mut roles = SymbolRoles::NONE;
    if raw.contains(RawRoles::DEFINITION) {
        roles |= SymbolRoles::DEFINITION;
    }
    if raw.contains(RawRoles::WRITE) {
        roles |= SymbolRoles::WRITE_ACCESS;
    }
    if raw.contains(RawRoles::READ)
        || raw.contains(RawRoles::REFERENCE)
        || raw.contains(RawRoles::DECLARATION)
        || raw.contains(RawRoles::CALL)
    {
        roles |= SymbolRoles::READ_ACCESS;
    }
    if raw.contains(RawRoles::IMPLICIT) {
        roles |= SymbolRoles::GENERATED;
    }
    roles
}

fn module_passes(filter: Option<&HashSet<String>>, module: Option<&str>) -> bool {
    match (filter, module) {
        (None, _) => true,
        (Some(filter), Some(module)) => filter.contains(module),
        (Some(_), None) => false,
    }
}

/// Compute the symbol identity for a canonical occurrence. A type-like
/// parent in the child-of relation list becomes the descriptor container.
fn identity_for(occ: &RawOccurrence) -> SymbolIdentity {
    let kind = map_kind(occ.kind);
    let module = module_from_usr(&occ.usr);
    let container = occ
        .relations
        .iter()
        .find(|r| r.roles.contains(RawRoles::CHILD_OF) && map_kind(r.kind).is_type_like())
        .map(|r| r.name.as_str());

    SymbolIdentity {
        symbol_id: build_symbol_id(&occ.usr, &occ.name, kind, module.as_deref(), container),
        name: occ.name.clone(),
        kind,
        module,
    }
}

/// Symbol-ID of a related symbol, built from the relation's own info
fn relation_symbol_id(relation: &RawRelation) -> String {
    let kind = map_kind(relation.kind);
    let module = module_from_usr(&relation.usr);
    build_symbol_id(
        &relation.usr,
        &relation.name,
        kind,
        module.as_deref(),
        None,
    )
}

/// Normalize one raw occurrence, or drop it (wrong extension, filtered out)
fn normalize_occurrence(
    occ: &RawOccurrence,
    identity: &SymbolIdentity,
    project_root: &Path,
    path_filter: Option<&HashSet<String>>,
) -> Option<OccurrenceRecord> {
    if !occ.path.ends_with(SOURCE_EXTENSION) {
        return None;
    }

    let path = relative_path(project_root, &occ.path);
    if let Some(filter) = path_filter {
        if !filter.contains(&path) {
            return None;
        }
    }

    let start_line = occ.line.saturating_sub(1);
    let start_col = occ.column.saturating_sub(1);
    // The store records a point; the identifier's UTF-8 byte length is the
    // best available end-column proxy
    let end_col = start_col + identity.name.len() as u32;
    let range = SourceRange::new(start_line, start_col, start_line, end_col);

    let enclosing = occ
        .relations
        .iter()
        .find(|r| r.roles.contains(RawRoles::CHILD_OF));

    Some(OccurrenceRecord {
        symbol_id: identity.symbol_id.clone(),
        path,
        range,
        roles: map_roles(occ.roles),
        snippet: None,
        enclosing_symbol: enclosing.map(relation_symbol_id),
        enclosing_name: enclosing.map(|r| r.name.clone()),
    })
}

/// Strip the project root from an absolute store path; paths outside the
/// root keep their absolute form
fn relative_path(project_root: &Path, path: &str) -> String {
    Path::new(path)
        .strip_prefix(project_root)
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_else(|_| path.to_string())
}

fn absolute_path(project_root: &Path, path: &str) -> PathBuf {
    let p = Path::new(path);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        project_root.join(p)
    }
}
