//! Core domain types for converted Firestore exports.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{FsExportError, Result};
use crate::value::{Fields, Value};

/// Internal field holding the final path segment's identifier.
pub const DOCUMENT_ID_FIELD: &str = "_document_id";

/// Internal field holding the [`DocumentKey`] descriptor.
pub const KEY_FIELD: &str = "_key";

/// Fields added during normalization, in the order they are appended.
const INTERNAL_FIELDS: [&str; 2] = [DOCUMENT_ID_FIELD, KEY_FIELD];

/// Whether a (possibly flattened) field name belongs to the internal fields.
///
/// Any name starting with `_key_` counts as internal because flattening
/// `_key` produces `_key_path`, `_key_id` and so on. A user field with such a
/// name is therefore treated as internal too (hidden from the viewer's
/// structure listing and from CSV unless internal columns are requested).
pub fn is_internal_field(name: &str) -> bool {
    INTERNAL_FIELDS.contains(&name)
        || name
            .strip_prefix(KEY_FIELD)
            .is_some_and(|rest| rest.starts_with('_'))
}

// ---------------------------------------------------------------------------
// Paths
// ---------------------------------------------------------------------------

/// Identifier of one path element: a numeric id or a string name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Identifier {
    Id(i64),
    Name(String),
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{id}"),
            Self::Name(name) => f.write_str(name),
        }
    }
}

/// One raw path element as produced by the export reader, before it has been
/// validated into `(kind, identifier)` pairs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathElement {
    Kind(String),
    Id(i64),
    Name(String),
}

impl fmt::Display for PathElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Kind(s) | Self::Name(s) => f.write_str(s),
            Self::Id(id) => write!(f, "{id}"),
        }
    }
}

/// A validated `(collection kind, identifier)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathSegment {
    pub kind: String,
    pub id: Identifier,
}

/// A validated document path: one or more segments, innermost last.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentPath {
    segments: Vec<PathSegment>,
}

impl DocumentPath {
    /// Validate raw path elements into `(kind, identifier)` pairs.
    ///
    /// Fails when the path is empty, has an odd number of elements (a
    /// collection rather than a document), or contains an empty element.
    pub fn from_elements(elements: &[PathElement]) -> Result<Self> {
        if elements.is_empty() {
            return Err(FsExportError::record_parse("empty document path"));
        }
        if elements.len() % 2 != 0 {
            return Err(FsExportError::record_parse(format!(
                "path '{}' has {} elements; expected collection/document pairs",
                join_elements(elements),
                elements.len()
            )));
        }

        let mut segments = Vec::with_capacity(elements.len() / 2);
        for pair in elements.chunks_exact(2) {
            let kind = match &pair[0] {
                PathElement::Kind(k) | PathElement::Name(k) if !k.is_empty() => k.clone(),
                other => {
                    return Err(FsExportError::record_parse(format!(
                        "invalid collection element '{other}' in path '{}'",
                        join_elements(elements)
                    )));
                }
            };
            let id = match &pair[1] {
                PathElement::Id(id) => Identifier::Id(*id),
                PathElement::Name(n) | PathElement::Kind(n) if !n.is_empty() => {
                    Identifier::Name(n.clone())
                }
                _ => {
                    return Err(FsExportError::record_parse(format!(
                        "empty document id in path '{}'",
                        join_elements(elements)
                    )));
                }
            };
            segments.push(PathSegment { kind, id });
        }

        Ok(Self { segments })
    }

    /// Innermost segment (the document itself).
    pub fn leaf(&self) -> &PathSegment {
        // Construction guarantees at least one segment.
        &self.segments[self.segments.len() - 1]
    }

    /// Outermost segment (the top-level collection).
    pub fn root(&self) -> &PathSegment {
        &self.segments[0]
    }

    /// Slash-joined full path.
    pub fn joined(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for DocumentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, seg) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            write!(f, "{}/{}", seg.kind, seg.id)?;
        }
        Ok(())
    }
}

fn join_elements(elements: &[PathElement]) -> String {
    elements
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("/")
}

// ---------------------------------------------------------------------------
// RawRecord
// ---------------------------------------------------------------------------

/// One decoded export entry, as handed over by the export reader.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    /// Raw path elements, outermost first.
    pub path: Vec<PathElement>,
    /// Application id from the source key, if any.
    pub app: Option<String>,
    /// Namespace from the source key, if any.
    pub namespace: Option<String>,
    /// User fields in source order.
    pub fields: Fields,
}

impl RawRecord {
    /// The unvalidated path, slash-joined, for diagnostics.
    pub fn raw_path(&self) -> String {
        join_elements(&self.path)
    }

    /// Build a record from a slash-separated path, treating every element as
    /// a string name.
    pub fn from_path_str(path: &str, fields: Fields) -> Self {
        let path = if path.is_empty() {
            Vec::new()
        } else {
            path.split('/')
                .map(|s| PathElement::Name(s.to_string()))
                .collect()
        };
        Self {
            path,
            app: None,
            namespace: None,
            fields,
        }
    }
}

// ---------------------------------------------------------------------------
// DocumentKey
// ---------------------------------------------------------------------------

/// The `_key` descriptor attached to every normalized document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentKey {
    /// Numeric identifier of the final segment, if it has one.
    pub id: Option<i64>,
    /// String identifier of the final segment, if it has one.
    pub name: Option<String>,
    pub namespace: Option<String>,
    pub app: Option<String>,
    /// Slash-joined full path.
    pub path: String,
}

impl DocumentKey {
    pub fn new(path: &DocumentPath, app: Option<String>, namespace: Option<String>) -> Self {
        let (id, name) = match &path.leaf().id {
            Identifier::Id(id) => (Some(*id), None),
            Identifier::Name(name) => (None, Some(name.clone())),
        };
        Self {
            id,
            name,
            namespace,
            app,
            path: path.joined(),
        }
    }

    /// The key as a map value, fields in declaration order.
    pub fn to_value(&self) -> Value {
        let mut fields = Fields::new();
        fields.insert("id".into(), Value::from(self.id));
        fields.insert("name".into(), Value::from(self.name.clone()));
        fields.insert("namespace".into(), Value::from(self.namespace.clone()));
        fields.insert("app".into(), Value::from(self.app.clone()));
        fields.insert("path".into(), Value::from(self.path.clone()));
        Value::Map(fields)
    }
}

// ---------------------------------------------------------------------------
// Collections and metadata
// ---------------------------------------------------------------------------

/// A normalized document: user fields followed by the internal fields.
pub type Document = Fields;

/// Collection name → documents, both in first-seen order.
pub type CollectionStore = IndexMap<String, Vec<Document>>;

/// The `metadata` block of the converted JSON file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExportMetadata {
    /// Not recoverable from the export; always null, kept for output shape.
    #[serde(default)]
    pub export_date: Option<String>,
    #[serde(default)]
    pub total_documents: usize,
    #[serde(default)]
    pub total_collections: usize,
    #[serde(default)]
    pub export_files_processed: usize,
    /// Records excluded from `collections` (see `orphaned_documents`).
    #[serde(default)]
    pub skipped_records: usize,
    /// Opaque contents of the export's metadata file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export_metadata: Option<String>,
}

/// A record that could not be placed in any collection.
///
/// Kept in the output so its data is not lost: either a decoded entity whose
/// path names no document, or a source entry that could not be decoded at
/// all (no path, no fields, only the reason).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrphanedRecord {
    /// Raw slash-joined path, when the entry was decoded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Why the record has no collection.
    pub reason: String,
    /// User fields of the decoded entity.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub fields: Fields,
}

/// Root structure of the converted JSON file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExportFile {
    pub metadata: ExportMetadata,
    #[serde(default)]
    pub collections: CollectionStore,
    /// Records without a collection; omitted from the JSON when empty.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub orphaned_documents: Vec<OrphanedRecord>,
}

impl ExportFile {
    /// Sum of documents across all collections.
    pub fn document_count(&self) -> usize {
        self.collections.values().map(Vec::len).sum()
    }
}
