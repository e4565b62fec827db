//! Symbol-ID synthesis
//!
//! Maps `(USR, name, kind, module, container)` to a SCIP symbol-ID string of
//! the form `swift <module> <descriptor>`. Symbols whose USR is not a Swift
//! mangled name, or whose module is unknown, get a `local <fingerprint>` ID
//! instead; the fingerprint is a deterministic FNV-1a hash so reindexing an
//! unchanged file yields bit-identical IDs.

use crate::model::SymbolKind;

// FNV-1a constants for 64-bit hash
const FNV_OFFSET: u64 = 0xcbf29ce484222325;
const FNV_PRIME: u64 = 0x100000001b3;

/// Prefix of Swift-mangled USRs
const SWIFT_USR_PREFIX: &str = "s:";

/// Compute a stable FNV-1a hash (deterministic across runs and platforms)
pub fn fnv1a_hash(data: &str) -> u64 {
    let mut hash = FNV_OFFSET;
    for byte in data.bytes() {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Build a SCIP symbol-ID.
///
/// Pure: the same inputs always produce the same string.
pub fn build_symbol_id(
    usr: &str,
    name: &str,
    kind: SymbolKind,
    module: Option<&str>,
    container: Option<&str>,
) -> String {
    let module = match module {
        Some(m) if usr.starts_with(SWIFT_USR_PREFIX) => m,
        _ => return format!("local {}", fnv1a_hash(usr)),
    };

    let suffix = kind_suffix(kind);
    let descriptor = match container {
        Some(container) if !container.is_empty() => format!("{}#{}{}", container, name, suffix),
        _ => format!("{}{}", name, suffix),
    };

    format!("swift {} {}", module, descriptor)
}

/// Descriptor suffix for a symbol kind, per the SCIP convention that lets
/// consumers recover the kind by suffix inspection
fn kind_suffix(kind: SymbolKind) -> &'static str {
    match kind {
        SymbolKind::Class
        | SymbolKind::Struct
        | SymbolKind::Protocol
        | SymbolKind::Enum
        | SymbolKind::TypeAlias => "#",
        SymbolKind::Function => "().",
        SymbolKind::Property | SymbolKind::EnumCase => ".",
        SymbolKind::Local | SymbolKind::Unknown => "",
    }
}

/// Extract the module name from a Swift-mangled USR.
///
/// Mangled top-level names carry a length-prefixed module identifier right
/// after the `s:` marker: `s:8MyModule7MyClassC` encodes module `MyModule`.
/// The parse is intentionally conservative: anything that does not match the
/// length-prefix shape yields `None`, and nested contexts (extensions of
/// types from other modules) can attribute a symbol to the wrong module.
pub fn module_from_usr(usr: &str) -> Option<String> {
    let mangled = usr.strip_prefix(SWIFT_USR_PREFIX)?;

    let digits: String = mangled.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }

    let len: usize = digits.parse().ok()?;
    if len == 0 {
        return None;
    }

    let rest = &mangled[digits.len()..];
    if rest.len() < len || !rest.is_char_boundary(len) {
        return None;
    }

    Some(rest[..len].to_string())
}
