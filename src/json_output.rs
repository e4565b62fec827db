//! Legacy JSON back-end
//!
//! Emits a single document grouped by file, with sorted document order and
//! fixed key order so output is reproducible byte-for-byte.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;

use crate::model::{
    OccurrenceRecord, RelationshipKind, RelationshipRecord, SymbolRecord, SCIP_VERSION,
    TEXT_ENCODING, TOOL_NAME, TOOL_VERSION,
};

// Struct fields are declared in alphabetical key order; serde preserves
// declaration order, which keeps every object's keys sorted.

#[derive(Debug, Serialize)]
struct JsonIndex {
    documents: Vec<JsonDocument>,
    metadata: JsonMetadata,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonMetadata {
    project_root: String,
    text_document_encoding: String,
    tool_info: JsonToolInfo,
    version: i64,
}

#[derive(Debug, Serialize)]
struct JsonToolInfo {
    name: String,
    version: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonDocument {
    language: String,
    occurrences: Vec<JsonOccurrence>,
    relative_path: String,
    symbols: Vec<JsonSymbol>,
}

#[derive(Debug, Serialize)]
struct JsonSymbol {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    documentation: Vec<String>,
    kind: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    relationships: Vec<JsonRelationship>,
    symbol: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonRelationship {
    #[serde(skip_serializing_if = "Option::is_none")]
    is_implementation: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    is_type_definition: Option<bool>,
    symbol: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonOccurrence {
    #[serde(skip_serializing_if = "Option::is_none")]
    enclosing_symbol: Option<String>,
    range: Vec<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    snippet: Option<String>,
    symbol: String,
    symbol_roles: u32,
}

/// Render the harvested records as the legacy JSON document
pub fn render(
    symbols: &[SymbolRecord],
    occurrences: &[OccurrenceRecord],
    relationships: &[RelationshipRecord],
    project_root: &Path,
) -> String {
    let index = JsonIndex {
        documents: build_documents(symbols, occurrences, relationships),
        metadata: JsonMetadata {
            project_root: format!("file://{}", project_root.display()),
            text_document_encoding: TEXT_ENCODING.to_string(),
            tool_info: JsonToolInfo {
                name: TOOL_NAME.to_string(),
                version: TOOL_VERSION.to_string(),
            },
            version: SCIP_VERSION,
        },
    };

    serde_json::to_string_pretty(&index)
        .unwrap_or_else(|e| format!("{{\"error\": \"JSON encoding failed: {e}\"}}"))
}

fn build_documents(
    symbols: &[SymbolRecord],
    occurrences: &[OccurrenceRecord],
    relationships: &[RelationshipRecord],
) -> Vec<JsonDocument> {
    // BTreeMap keys give the sorted document order
    let mut by_file: BTreeMap<&str, Vec<&OccurrenceRecord>> = BTreeMap::new();
    for occ in occurrences {
        by_file.entry(occ.path.as_str()).or_default().push(occ);
    }

    let mut defining: BTreeMap<&str, &str> = BTreeMap::new();
    for occ in occurrences {
        if occ.roles.is_definition() {
            defining.entry(occ.symbol_id.as_str()).or_insert(occ.path.as_str());
        }
    }

    by_file
        .into_iter()
        .map(|(path, file_occurrences)| JsonDocument {
            language: "swift".to_string(),
            occurrences: file_occurrences
                .iter()
                .map(|occ| JsonOccurrence {
                    enclosing_symbol: occ.enclosing_symbol.clone(),
                    range: occ.range.scip(),
                    snippet: occ.snippet.clone(),
                    symbol: occ.symbol_id.clone(),
                    symbol_roles: occ.roles.bits(),
                })
                .collect(),
            relative_path: path.to_string(),
            symbols: symbols
                .iter()
                .filter(|s| defining.get(s.symbol_id.as_str()) == Some(&path))
                .map(|s| JsonSymbol {
                    documentation: s.documentation.clone(),
                    kind: s.kind.as_str().to_string(),
                    relationships: symbol_relationships(&s.symbol_id, relationships),
                    symbol: s.symbol_id.clone(),
                })
                .collect(),
        })
        .collect()
}

fn symbol_relationships(
    symbol_id: &str,
    relationships: &[RelationshipRecord],
) -> Vec<JsonRelationship> {
    relationships
        .iter()
        .filter(|rel| rel.symbol_id == symbol_id)
        .map(|rel| match rel.kind {
            RelationshipKind::Conforms | RelationshipKind::Overrides => JsonRelationship {
                is_implementation: Some(true),
                is_type_definition: None,
                symbol: rel.target_symbol_id.clone(),
            },
            RelationshipKind::Inherits => JsonRelationship {
                is_implementation: None,
                is_type_definition: Some(true),
                symbol: rel.target_symbol_id.clone(),
            },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{SourceRange, SymbolKind, SymbolRoles};

    fn sample() -> (Vec<SymbolRecord>, Vec<OccurrenceRecord>, Vec<RelationshipRecord>) {
        let symbols = vec![SymbolRecord {
            symbol_id: "swift App A#".to_string(),
            kind: SymbolKind::Class,
            module: Some("App".to_string()),
            documentation: Vec::new(),
        }];
        let occurrences = vec![OccurrenceRecord {
            symbol_id: "swift App A#".to_string(),
            path: "a.swift".to_string(),
            range: SourceRange::new(2, 6, 2, 13),
            roles: SymbolRoles::DEFINITION,
            snippet: Some("class A {".to_string()),
            enclosing_symbol: None,
            enclosing_name: None,
        }];
        let relationships = vec![RelationshipRecord {
            symbol_id: "swift App A#".to_string(),
            target_symbol_id: "swift App Base#".to_string(),
            kind: RelationshipKind::Inherits,
        }];
        (symbols, occurrences, relationships)
    }

    #[test]
    fn test_metadata_fields() {
        let (symbols, occurrences, relationships) = sample();
        let json = render(&symbols, &occurrences, &relationships, Path::new("/proj"));
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["metadata"]["version"], 1);
        assert_eq!(value["metadata"]["projectRoot"], "file:///proj");
        assert_eq!(value["metadata"]["textDocumentEncoding"], "UTF-8");
        assert_eq!(value["metadata"]["toolInfo"]["name"], "swift-scip");
    }

    #[test]
    fn test_single_line_range_is_three_ints() {
        let (symbols, occurrences, relationships) = sample();
        let json = render(&symbols, &occurrences, &relationships, Path::new("/proj"));
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        let range = &value["documents"][0]["occurrences"][0]["range"];
        assert_eq!(range.as_array().unwrap().len(), 3);
    }

    #[test]
    fn test_inherits_maps_to_type_definition() {
        let (symbols, occurrences, relationships) = sample();
        let json = render(&symbols, &occurrences, &relationships, Path::new("/proj"));
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        let rel = &value["documents"][0]["symbols"][0]["relationships"][0];
        assert_eq!(rel["isTypeDefinition"], true);
        assert!(rel.get("isImplementation").is_none());
    }

    #[test]
    fn test_documents_sorted_by_path() {
        let (mut symbols, mut occurrences, relationships) = sample();
        symbols.clear();
        occurrences[0].path = "z.swift".to_string();
        occurrences.push(OccurrenceRecord {
            symbol_id: "swift App B#".to_string(),
            path: "a.swift".to_string(),
            range: SourceRange::new(0, 0, 0, 1),
            roles: SymbolRoles::REFERENCE,
            snippet: None,
            enclosing_symbol: None,
            enclosing_name: None,
        });

        let json = render(&symbols, &occurrences, &relationships, Path::new("/proj"));
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let docs = value["documents"].as_array().unwrap();
        assert_eq!(docs[0]["relativePath"], "a.swift");
        assert_eq!(docs[1]["relativePath"], "z.swift");
    }

    #[test]
    fn test_output_is_deterministic() {
        let (symbols, occurrences, relationships) = sample();
        let a = render(&symbols, &occurrences, &relationships, Path::new("/proj"));
        let b = render(&symbols, &occurrences, &relationships, Path::new("/proj"));
        assert_eq!(a, b);
    }
}
