//! libIndexStore loader and scanner
//!
//! The native index-reading library is an external collaborator: this module
//! locates it among the conventional toolchain paths, loads it, and performs
//! one full scan of a DataStore directory into [`RawRecords`]. Nothing else
//! in the crate touches the native API.

use std::collections::HashSet;
use std::ffi::{c_char, c_uint, c_void, CString};
use std::path::{Path, PathBuf};
use std::ptr;

use libloading::Library;

use crate::error::{IndexerError, Result};
use crate::store::raw::{RawOccurrence, RawRecords, RawRelation, RawRoles, RawSymbolKind};

/// Dependency kind value for record files in the native API
const DEPENDENCY_KIND_RECORD: c_uint = 2;

/// Conventional install locations of libIndexStore, probed in order
fn candidate_paths() -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    if cfg!(target_os = "macos") {
        candidates.push(PathBuf::from(
            "/Applications/Xcode.app/Contents/Developer/Toolchains/XcodeDefault.xctoolchain/usr/lib/libIndexStore.dylib",
        ));
        candidates.push(PathBuf::from(
            "/Library/Developer/CommandLineTools/usr/lib/libIndexStore.dylib",
        ));
    } else {
        candidates.push(PathBuf::from("/usr/lib/libIndexStore.so"));
        candidates.push(PathBuf::from("/usr/local/lib/libIndexStore.so"));
        candidates.push(PathBuf::from("/usr/lib/swift/linux/libIndexStore.so"));
    }

    candidates
}

#[repr(C)]
#[derive(Clone, Copy)]
struct StringRef {
    data: *const c_char,
    length: usize,
}

impl StringRef {
    /// Copy into an owned String; invalid UTF-8 is replaced, never fatal
    unsafe fn into_string(self) -> String {
        if self.data.is_null() || self.length == 0 {
            return String::new();
        }
        let bytes = std::slice::from_raw_parts(self.data as *const u8, self.length);
        String::from_utf8_lossy(bytes).into_owned()
    }
}

type StoreRef = *mut c_void;
type ErrorRef = *mut c_void;
type UnitReaderRef = *mut c_void;
type RecordReaderRef = *mut c_void;
type UnitDependencyRef = *mut c_void;
type OccurrenceRef = *mut c_void;
type SymbolRef = *mut c_void;
type RelationRef = *mut c_void;

type StoreCreateFn = unsafe extern "C" fn(*const c_char, *mut ErrorRef) -> StoreRef;
type StoreDisposeFn = unsafe extern "C" fn(StoreRef);
type ErrorDescriptionFn = unsafe extern "C" fn(ErrorRef) -> *const c_char;
type ErrorDisposeFn = unsafe extern "C" fn(ErrorRef);
type UnitsIterateFn = unsafe extern "C" fn(
    StoreRef,
    *mut c_void,
    unsafe extern "C" fn(*mut c_void, StringRef) -> bool,
) -> bool;
type UnitReaderCreateFn = unsafe extern "C" fn(StoreRef, *const c_char, *mut ErrorRef) -> UnitReaderRef;
type UnitReaderDisposeFn = unsafe extern "C" fn(UnitReaderRef);
type DependenciesApplyFn = unsafe extern "C" fn(
    UnitReaderRef,
    *mut c_void,
    unsafe extern "C" fn(*mut c_void, UnitDependencyRef) -> bool,
) -> bool;
type DependencyGetKindFn = unsafe extern "C" fn(UnitDependencyRef) -> c_uint;
type DependencyGetNameFn = unsafe extern "C" fn(UnitDependencyRef) -> StringRef;
type DependencyGetFilePathFn = unsafe extern "C" fn(UnitDependencyRef) -> StringRef;
type RecordReaderCreateFn =
    unsafe extern "C" fn(StoreRef, *const c_char, *mut ErrorRef) -> RecordReaderRef;
type RecordReaderDisposeFn = unsafe extern "C" fn(RecordReaderRef);
type OccurrencesApplyFn = unsafe extern "C" fn(
    RecordReaderRef,
    *mut c_void,
    unsafe extern "C" fn(*mut c_void, OccurrenceRef) -> bool,
) -> bool;
type OccurrenceGetSymbolFn = unsafe extern "C" fn(OccurrenceRef) -> SymbolRef;
type OccurrenceGetRolesFn = unsafe extern "C" fn(OccurrenceRef) -> u64;
type OccurrenceGetLineColFn = unsafe extern "C" fn(OccurrenceRef, *mut c_uint, *mut c_uint);
type RelationsApplyFn = unsafe extern "C" fn(
    OccurrenceRef,
    *mut c_void,
    unsafe extern "C" fn(*mut c_void, RelationRef) -> bool,
) -> bool;
type RelationGetRolesFn = unsafe extern "C" fn(RelationRef) -> u64;
type RelationGetSymbolFn = unsafe extern "C" fn(RelationRef) -> SymbolRef;
type SymbolGetKindFn = unsafe extern "C" fn(SymbolRef) -> c_uint;
type SymbolGetUsrFn = unsafe extern "C" fn(SymbolRef) -> StringRef;
type SymbolGetNameFn = unsafe extern "C" fn(SymbolRef) -> StringRef;

/// Resolved entry points of the loaded library
struct Api {
    store_create: StoreCreateFn,
    store_dispose: StoreDisposeFn,
    error_description: ErrorDescriptionFn,
    error_dispose: ErrorDisposeFn,
    units_iterate: UnitsIterateFn,
    unit_reader_create: UnitReaderCreateFn,
    unit_reader_dispose: UnitReaderDisposeFn,
    dependencies_apply: DependenciesApplyFn,
    dependency_get_kind: DependencyGetKindFn,
    dependency_get_name: DependencyGetNameFn,
    dependency_get_filepath: DependencyGetFilePathFn,
    record_reader_create: RecordReaderCreateFn,
    record_reader_dispose: RecordReaderDisposeFn,
    occurrences_apply: OccurrencesApplyFn,
    occurrence_get_symbol: OccurrenceGetSymbolFn,
    occurrence_get_roles: OccurrenceGetRolesFn,
    occurrence_get_line_col: OccurrenceGetLineColFn,
    relations_apply: RelationsApplyFn,
    relation_get_roles: RelationGetRolesFn,
    relation_get_symbol: RelationGetSymbolFn,
    symbol_get_kind: SymbolGetKindFn,
    symbol_get_usr: SymbolGetUsrFn,
    symbol_get_name: SymbolGetNameFn,
}

/// Handle to a loaded libIndexStore
pub struct LibIndexStore {
    api: Api,
    // Keeps the resolved entry points valid for the lifetime of this handle
    _library: Library,
}

impl LibIndexStore {
    /// Locate libIndexStore among the conventional toolchain paths
    pub fn locate() -> Result<PathBuf> {
        let candidates = candidate_paths();
        for candidate in &candidates {
            if candidate.exists() {
                return Ok(candidate.clone());
            }
        }
        Err(IndexerError::LibraryNotFound {
            searched: candidates
                .iter()
                .map(|p| p.display().to_string())
                .collect(),
        })
    }

    /// Locate and load the library, resolving every entry point up front
    pub fn load() -> Result<Self> {
        let path = Self::locate()?;
        let library = unsafe { Library::new(&path) }.map_err(|e| IndexerError::StoreIteration {
            message: format!("failed to load {}: {}", path.display(), e),
        })?;
        let api = Self::bind(&library)?;
        Ok(Self {
            api,
            _library: library,
        })
    }

    fn bind(library: &Library) -> Result<Api> {
        unsafe fn get<T: Copy>(library: &Library, name: &[u8]) -> Result<T> {
            let symbol = unsafe { library.get::<T>(name) }.map_err(|e| {
                IndexerError::StoreIteration {
                    message: format!(
                        "missing entry point {}: {}",
                        String::from_utf8_lossy(name),
                        e
                    ),
                }
            })?;
            Ok(*symbol)
        }

        unsafe {
            Ok(Api {
                store_create: get(library, b"indexstore_store_create\0")?,
                store_dispose: get(library, b"indexstore_store_dispose\0")?,
                error_description: get(library, b"indexstore_error_get_description\0")?,
                error_dispose: get(library, b"indexstore_error_dispose\0")?,
                units_iterate: get(library, b"indexstore_store_units_iterate_f\0")?,
                unit_reader_create: get(library, b"indexstore_unit_reader_create\0")?,
                unit_reader_dispose: get(library, b"indexstore_unit_reader_dispose\0")?,
                dependencies_apply: get(library, b"indexstore_unit_reader_dependencies_apply_f\0")?,
                dependency_get_kind: get(library, b"indexstore_unit_dependency_get_kind\0")?,
                dependency_get_name: get(library, b"indexstore_unit_dependency_get_name\0")?,
                dependency_get_filepath: get(library, b"indexstore_unit_dependency_get_filepath\0")?,
                record_reader_create: get(library, b"indexstore_record_reader_create\0")?,
                record_reader_dispose: get(library, b"indexstore_record_reader_dispose\0")?,
                occurrences_apply: get(library, b"indexstore_record_reader_occurrences_apply_f\0")?,
                occurrence_get_symbol: get(library, b"indexstore_occurrence_get_symbol\0")?,
                occurrence_get_roles: get(library, b"indexstore_occurrence_get_roles\0")?,
                occurrence_get_line_col: get(library, b"indexstore_occurrence_get_line_col\0")?,
                relations_apply: get(library, b"indexstore_occurrence_relations_apply_f\0")?,
                relation_get_roles: get(library, b"indexstore_symbol_relation_get_roles\0")?,
                relation_get_symbol: get(library, b"indexstore_symbol_relation_get_symbol\0")?,
                symbol_get_kind: get(library, b"indexstore_symbol_get_kind\0")?,
                symbol_get_usr: get(library, b"indexstore_symbol_get_usr\0")?,
                symbol_get_name: get(library, b"indexstore_symbol_get_name\0")?,
            })
        }
    }

    /// Scan every record of the DataStore at `path` into memory.
    ///
    /// Records shared between units are read once. Store-open and
    /// unit-iteration failures are fatal; a record that fails to open is
    /// skipped, matching the reader's per-record failure policy.
    pub fn scan(&self, path: &Path) -> Result<RawRecords> {
        let c_path = CString::new(path.to_string_lossy().as_bytes()).map_err(|_| {
            IndexerError::StoreIteration {
                message: format!("store path contains NUL: {}", path.display()),
            }
        })?;

        let mut error: ErrorRef = ptr::null_mut();
        let store = unsafe { (self.api.store_create)(c_path.as_ptr(), &mut error) };
        if store.is_null() {
            return Err(IndexerError::StoreIteration {
                message: unsafe { self.describe_error(error) },
            });
        }

        let mut records = RawRecords::new();
        let mut seen_records: HashSet<String> = HashSet::new();

        let result = self.scan_units(store, &mut records, &mut seen_records);
        unsafe { (self.api.store_dispose)(store) };
        result?;

        Ok(records)
    }

    fn scan_units(
        &self,
        store: StoreRef,
        records: &mut RawRecords,
        seen_records: &mut HashSet<String>,
    ) -> Result<()> {
        let mut unit_names: Vec<String> = Vec::new();

        unsafe extern "C" fn collect_unit(context: *mut c_void, name: StringRef) -> bool {
            let units = unsafe { &mut *(context as *mut Vec<String>) };
            units.push(unsafe { name.into_string() });
            true
        }

        unsafe {
            (self.api.units_iterate)(
                store,
                &mut unit_names as *mut Vec<String> as *mut c_void,
                collect_unit,
            );
        }

        for unit_name in unit_names {
            self.scan_unit(store, &unit_name, records, seen_records)?;
        }
        Ok(())
    }

    fn scan_unit(
        &self,
        store: StoreRef,
        unit_name: &str,
        records: &mut RawRecords,
        seen_records: &mut HashSet<String>,
    ) -> Result<()> {
        let c_name = match CString::new(unit_name) {
            Ok(n) => n,
            Err(_) => return Ok(()),
        };

        let mut error: ErrorRef = ptr::null_mut();
        let reader = unsafe { (self.api.unit_reader_create)(store, c_name.as_ptr(), &mut error) };
        if reader.is_null() {
            return Err(IndexerError::StoreIteration {
                message: unsafe { self.describe_error(error) },
            });
        }

        struct DependencyContext<'a> {
            api: &'a Api,
            // (record name, source file path)
            record_files: Vec<(String, String)>,
        }

        unsafe extern "C" fn collect_dependency(
            context: *mut c_void,
            dependency: UnitDependencyRef,
        ) -> bool {
            let ctx = unsafe { &mut *(context as *mut DependencyContext) };
            let kind = unsafe { (ctx.api.dependency_get_kind)(dependency) };
            if kind == DEPENDENCY_KIND_RECORD {
                let name = unsafe { (ctx.api.dependency_get_name)(dependency).into_string() };
                let file = unsafe { (ctx.api.dependency_get_filepath)(dependency).into_string() };
                ctx.record_files.push((name, file));
            }
            true
        }

        let mut dep_ctx = DependencyContext {
            api: &self.api,
            record_files: Vec::new(),
        };
        unsafe {
            (self.api.dependencies_apply)(
                reader,
                &mut dep_ctx as *mut DependencyContext as *mut c_void,
                collect_dependency,
            );
            (self.api.unit_reader_dispose)(reader);
        }

        for (record_name, file_path) in dep_ctx.record_files {
            if !seen_records.insert(record_name.clone()) {
                continue;
            }
            self.scan_record(store, &record_name, &file_path, records);
        }
        Ok(())
    }

    /// Read one record's occurrences; open failures skip the record
    fn scan_record(
        &self,
        store: StoreRef,
        record_name: &str,
        file_path: &str,
        records: &mut RawRecords,
    ) {
        let c_name = match CString::new(record_name) {
            Ok(n) => n,
            Err(_) => return,
        };

        let mut error: ErrorRef = ptr::null_mut();
        let reader = unsafe { (self.api.record_reader_create)(store, c_name.as_ptr(), &mut error) };
        if reader.is_null() {
            let message = unsafe { self.describe_error(error) };
            tracing::warn!(record = record_name, "skipping unreadable record: {message}");
            return;
        }

        struct OccurrenceContext<'a> {
            api: &'a Api,
            file_path: &'a str,
            records: &'a mut RawRecords,
        }

        unsafe extern "C" fn collect_relation(context: *mut c_void, relation: RelationRef) -> bool {
            let ctx = unsafe { &mut *(context as *mut (&Api, &mut Vec<RawRelation>)) };
            let (api, relations) = (ctx.0, &mut *ctx.1);
            unsafe {
                let symbol = (api.relation_get_symbol)(relation);
                relations.push(RawRelation {
                    roles: RawRoles((api.relation_get_roles)(relation)),
                    usr: (api.symbol_get_usr)(symbol).into_string(),
                    name: (api.symbol_get_name)(symbol).into_string(),
                    kind: RawSymbolKind::from_store_value((api.symbol_get_kind)(symbol)),
                });
            }
            true
        }

        unsafe extern "C" fn collect_occurrence(
            context: *mut c_void,
            occurrence: OccurrenceRef,
        ) -> bool {
            let ctx = unsafe { &mut *(context as *mut OccurrenceContext) };
            let api = ctx.api;
            unsafe {
                let symbol = (api.occurrence_get_symbol)(occurrence);
                let mut line: c_uint = 0;
                let mut column: c_uint = 0;
                (api.occurrence_get_line_col)(occurrence, &mut line, &mut column);

                let mut relations: Vec<RawRelation> = Vec::new();
                let mut rel_ctx = (api, &mut relations);
                (api.relations_apply)(
                    occurrence,
                    &mut rel_ctx as *mut (&Api, &mut Vec<RawRelation>) as *mut c_void,
                    collect_relation,
                );

                ctx.records.push(RawOccurrence {
                    usr: (api.symbol_get_usr)(symbol).into_string(),
                    name: (api.symbol_get_name)(symbol).into_string(),
                    kind: RawSymbolKind::from_store_value((api.symbol_get_kind)(symbol)),
                    roles: RawRoles((api.occurrence_get_roles)(occurrence)),
                    path: ctx.file_path.to_string(),
                    line,
                    column,
                    relations,
                });
            }
            true
        }

        let mut occ_ctx = OccurrenceContext {
            api: &self.api,
            file_path,
            records,
        };
        unsafe {
            (self.api.occurrences_apply)(
                reader,
                &mut occ_ctx as *mut OccurrenceContext as *mut c_void,
                collect_occurrence,
            );
            (self.api.record_reader_dispose)(reader);
        }
    }

    unsafe fn describe_error(&self, error: ErrorRef) -> String {
        if error.is_null() {
            return "unknown index store error".to_string();
        }
        let description = unsafe {
            let c_str = (self.api.error_description)(error);
            if c_str.is_null() {
                "unknown index store error".to_string()
            } else {
                std::ffi::CStr::from_ptr(c_str).to_string_lossy().into_owned()
            }
        };
        unsafe { (self.api.error_dispose)(error) };
        description
    }
}
