//! Tabular projection of one collection, and CSV output.
//!
//! Columns are chosen from the union of field names across the collection's
//! documents; cells are rendered with fixed, deterministic rules so the same
//! export always produces the same CSV.

use std::collections::BTreeSet;
use std::io::Write;
use std::path::Path;

use indexmap::IndexMap;
use indexmap::map::Entry;
use tracing::{debug, info, instrument, warn};

use fsexport_shared::{CollectionStore, Document, FsExportError, Result, Value, is_internal_field};

/// Separator used when flattening nested map keys.
const FLATTEN_SEPARATOR: char = '_';

/// Column selection and rendering options.
#[derive(Debug, Clone, Default)]
pub struct ProjectionOptions {
    /// Only these fields, in this order.
    pub include_fields: Option<Vec<String>>,
    /// Fields removed after all other selection.
    pub exclude_fields: Vec<String>,
    /// Keep `_document_id` / `_key` (and flattened `_key_*`) columns.
    pub include_internal: bool,
    /// Expand nested maps into `parent_child` columns instead of JSON text.
    pub flatten: bool,
}

/// A rendered table: header plus one row per document in stored order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Projection {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
    /// Requested include fields that no document has.
    pub missing_fields: Vec<String>,
}

/// Project a collection into rows and columns.
#[instrument(skip(store, options), fields(flatten = options.flatten))]
pub fn project(
    store: &CollectionStore,
    collection: &str,
    options: &ProjectionOptions,
) -> Result<Projection> {
    let documents = store.get(collection).ok_or_else(|| {
        let available: Vec<&str> = store.keys().map(String::as_str).collect();
        FsExportError::not_found(format!(
            "collection '{collection}' not found; available collections: {}",
            available.join(", ")
        ))
    })?;

    if documents.is_empty() {
        return Err(FsExportError::validation(format!(
            "collection '{collection}' is empty"
        )));
    }

    let flattened: Vec<IndexMap<String, Value>> = documents
        .iter()
        .map(|doc| flatten_document(doc, options.flatten))
        .collect();

    let universe: BTreeSet<&str> = flattened
        .iter()
        .flat_map(|doc| doc.keys())
        .map(String::as_str)
        .filter(|name| options.include_internal || !is_internal_field(name))
        .collect();

    let mut missing_fields = Vec::new();
    let mut columns: Vec<String> = match &options.include_fields {
        Some(requested) => {
            let mut picked: Vec<String> = Vec::with_capacity(requested.len());
            for name in requested {
                if picked.contains(name) {
                    continue;
                }
                if universe.contains(name.as_str()) {
                    picked.push(name.clone());
                } else {
                    missing_fields.push(name.clone());
                }
            }
            picked
        }
        None => universe.iter().map(|s| (*s).to_string()).collect(),
    };

    if !missing_fields.is_empty() {
        warn!(fields = ?missing_fields, "requested fields not found");
    }

    columns.retain(|c| !options.exclude_fields.contains(c));

    if columns.is_empty() {
        return Err(FsExportError::validation(
            "no fields to export after applying filters",
        ));
    }

    let rows: Vec<Vec<String>> = flattened
        .iter()
        .map(|doc| {
            columns
                .iter()
                .map(|c| doc.get(c).map(cell_text).unwrap_or_default())
                .collect()
        })
        .collect();

    debug!(columns = columns.len(), rows = rows.len(), "projection built");

    Ok(Projection {
        columns,
        rows,
        missing_fields,
    })
}

/// Top-level fields of a document, with nested maps expanded into
/// `parent_child` keys when `flatten` is set.
///
/// An empty nested map contributes no keys when flattened. When a flattened
/// name collides with an existing one (`album_name` next to `album{name}`),
/// the first value in document order wins and a warning is logged.
pub fn flatten_document(document: &Document, flatten: bool) -> IndexMap<String, Value> {
    let mut out = IndexMap::with_capacity(document.len());
    for (name, value) in document {
        if flatten {
            flatten_into(&mut out, name.clone(), value);
        } else {
            out.insert(name.clone(), value.clone());
        }
    }
    out
}

fn flatten_into(out: &mut IndexMap<String, Value>, prefix: String, value: &Value) {
    match value {
        Value::Map(fields) => {
            for (name, nested) in fields {
                flatten_into(out, format!("{prefix}{FLATTEN_SEPARATOR}{name}"), nested);
            }
        }
        other => match out.entry(prefix) {
            Entry::Occupied(entry) => {
                warn!(column = %entry.key(), "duplicate flattened column, keeping first value");
            }
            Entry::Vacant(entry) => {
                entry.insert(other.clone());
            }
        },
    }
}

/// Render one value as a CSV cell.
///
/// Null is empty, strings are verbatim, lists and maps are compact JSON,
/// everything else uses its display form.
pub fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Write a projection as CSV (header row first).
pub fn write_csv<W: Write>(projection: &Projection, writer: W) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);

    csv_writer
        .write_record(&projection.columns)
        .map_err(|e| FsExportError::Serialization(format!("CSV write error: {e}")))?;
    for row in &projection.rows {
        csv_writer
            .write_record(row)
            .map_err(|e| FsExportError::Serialization(format!("CSV write error: {e}")))?;
    }

    csv_writer
        .flush()
        .map_err(|e| FsExportError::Serialization(format!("CSV flush error: {e}")))?;
    Ok(())
}

/// Write a projection to a CSV file.
pub fn write_csv_file(path: &Path, projection: &Projection) -> Result<()> {
    let file = std::fs::File::create(path).map_err(|e| FsExportError::io(path, e))?;
    write_csv(projection, std::io::BufWriter::new(file))?;

    info!(
        path = %path.display(),
        rows = projection.rows.len(),
        columns = projection.columns.len(),
        "wrote CSV file"
    );
    Ok(())
}
