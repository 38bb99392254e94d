//! Read-only queries over a converted export.
//!
//! A [`Session`] owns the loaded [`ExportFile`] and is handed to every
//! command handler. All operations are linear scans over stored order.

use std::path::Path;

use tracing::debug;

use fsexport_shared::{Document, ExportFile, FsExportError, Result, Value, is_internal_field};

use crate::assembler::load_export_file;

/// Totals plus per-collection document counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub total_documents: usize,
    pub total_collections: usize,
    pub export_files_processed: usize,
    pub skipped_records: usize,
    /// Skipped records preserved in the file for inspection.
    pub orphaned_documents: usize,
    /// `(collection, document count)` in stored order.
    pub collections: Vec<(String, usize)>,
}

/// One field of a sample document, prepared for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldOverview {
    pub name: String,
    pub type_name: &'static str,
    pub preview: String,
}

/// Bounded preview of a collection.
#[derive(Debug, Clone)]
pub struct CollectionView<'a> {
    pub name: &'a str,
    /// Total number of documents in the collection.
    pub total: usize,
    /// The first `limit` documents (all of them when no limit was given).
    pub documents: &'a [Document],
    /// Non-internal fields of the first document.
    pub fields: Vec<FieldOverview>,
}

/// A document matched by [`Session::search`].
#[derive(Debug, Clone, Copy)]
pub struct SearchHit<'a> {
    /// Position of the document in its collection.
    pub index: usize,
    pub document: &'a Document,
}

/// Lazy iterator over search hits.
#[derive(Debug, Clone)]
pub struct Search<'a> {
    documents: std::iter::Enumerate<std::slice::Iter<'a, Document>>,
    field: String,
    needle: String,
}

impl<'a> Iterator for Search<'a> {
    type Item = SearchHit<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        for (index, document) in self.documents.by_ref() {
            let Some(value) = document.get(&self.field) else {
                continue;
            };
            if value.to_string().to_lowercase().contains(&self.needle) {
                return Some(SearchHit { index, document });
            }
        }
        None
    }
}

/// An interactive query session over one loaded export.
#[derive(Debug, Clone)]
pub struct Session {
    export: ExportFile,
    /// Max characters shown for string values in field overviews.
    preview_chars: usize,
}

impl Session {
    /// Default truncation for field overview strings.
    pub const DEFAULT_PREVIEW_CHARS: usize = 50;

    pub fn new(export: ExportFile) -> Self {
        Self {
            export,
            preview_chars: Self::DEFAULT_PREVIEW_CHARS,
        }
    }

    /// Load a converted JSON file into a new session.
    pub fn open(path: &Path) -> Result<Self> {
        load_export_file(path).map(Self::new)
    }

    /// Set the string truncation used by [`Session::show`].
    pub fn with_preview_chars(mut self, chars: usize) -> Self {
        self.preview_chars = chars;
        self
    }

    pub fn export(&self) -> &ExportFile {
        &self.export
    }

    pub fn summary(&self) -> Summary {
        let meta = &self.export.metadata;
        Summary {
            total_documents: meta.total_documents,
            total_collections: meta.total_collections,
            export_files_processed: meta.export_files_processed,
            skipped_records: meta.skipped_records,
            orphaned_documents: self.export.orphaned_documents.len(),
            collections: self
                .export
                .collections
                .iter()
                .map(|(name, docs)| (name.clone(), docs.len()))
                .collect(),
        }
    }

    pub fn list_collections(&self) -> Vec<&str> {
        self.export.collections.keys().map(String::as_str).collect()
    }

    /// All documents of a collection.
    pub fn collection(&self, name: &str) -> Result<&[Document]> {
        self.export
            .collections
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| FsExportError::not_found(format!("collection '{name}' not found")))
    }

    /// Preview a collection: the first `limit` documents and the structure
    /// of the first one.
    pub fn show(&self, name: &str, limit: Option<usize>) -> Result<CollectionView<'_>> {
        let (name, docs) = self
            .export
            .collections
            .get_key_value(name)
            .ok_or_else(|| FsExportError::not_found(format!("collection '{name}' not found")))?;

        let shown = limit.map_or(docs.len(), |n| n.min(docs.len()));
        let fields = docs
            .first()
            .map(|doc| field_overview(doc, self.preview_chars))
            .unwrap_or_default();

        Ok(CollectionView {
            name: name.as_str(),
            total: docs.len(),
            documents: &docs[..shown],
            fields,
        })
    }

    pub fn get_document(&self, collection: &str, index: usize) -> Result<&Document> {
        let docs = self.collection(collection)?;
        docs.get(index).ok_or_else(|| {
            FsExportError::not_found(format!(
                "document index {index} out of range; collection '{collection}' has {} documents",
                docs.len()
            ))
        })
    }

    /// Documents whose `field`, coerced to text, contains `value`
    /// (case-insensitive). An unknown collection yields nothing.
    pub fn search(&self, collection: &str, field: &str, value: &str) -> Search<'_> {
        let docs: &[Document] = self
            .export
            .collections
            .get(collection)
            .map_or(&[][..], Vec::as_slice);

        debug!(collection, field, value, candidates = docs.len(), "search");

        Search {
            documents: docs.iter().enumerate(),
            field: field.to_string(),
            needle: value.to_lowercase(),
        }
    }
}

/// Describe the non-internal fields of a document.
pub fn field_overview(document: &Document, preview_chars: usize) -> Vec<FieldOverview> {
    document
        .iter()
        .filter(|(name, _)| !is_internal_field(name))
        .map(|(name, value)| FieldOverview {
            name: name.clone(),
            type_name: value.type_name(),
            preview: preview_value(value, preview_chars),
        })
        .collect()
}

/// Short display form: long strings are cut, containers are summarized.
pub fn preview_value(value: &Value, max_chars: usize) -> String {
    match value {
        Value::String(s) => truncate(s, max_chars),
        Value::Map(fields) => format!("{{map with {} keys}}", fields.len()),
        Value::List(items) => format!("[list with {} items]", items.len()),
        other => other.to_string(),
    }
}

/// Cut `text` to at most `max_chars` characters, appending `...` when cut.
pub fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => format!("{}...", &text[..end]),
        None => text.to_string(),
    }
}
