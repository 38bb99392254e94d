//! Collection assembler.
//!
//! Takes raw exported records, validates their paths, normalizes each into a
//! document with `_document_id` / `_key` attached, and groups documents into
//! collections. Also reads and writes the converted JSON file.

use std::path::Path;

use tracing::{debug, info, instrument, warn};

use fsexport_shared::{
    CollectionGrouping, CollectionStore, DOCUMENT_ID_FIELD, Document, DocumentKey, DocumentPath,
    ExportFile, ExportMetadata, Fields, FsExportError, KEY_FIELD, OrphanedRecord, RawRecord, Result,
    Value,
};

/// Options controlling how records are grouped.
#[derive(Debug, Clone, Copy, Default)]
pub struct AssembleOptions {
    /// Which path segment names a document's collection.
    pub grouping: CollectionGrouping,
}

/// Counters collected while assembling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssembleReport {
    /// Records normalized and stored.
    pub documents: usize,
    /// Records kept out of the collections because they failed to decode or
    /// had a bad path. Equals the number of orphaned records.
    pub skipped: usize,
    /// Internal fields not written because the record already had a field
    /// with that name.
    pub collisions: usize,
}

/// Output of a completed assembly pass.
#[derive(Debug, Clone)]
pub struct Assembly {
    pub store: CollectionStore,
    pub orphans: Vec<OrphanedRecord>,
    pub metadata: ExportMetadata,
    pub report: AssembleReport,
}

impl Assembly {
    /// Consume the assembly into the serializable file structure.
    pub fn into_export_file(self) -> ExportFile {
        ExportFile {
            metadata: self.metadata,
            collections: self.store,
            orphaned_documents: self.orphans,
        }
    }
}

/// A record normalized and ready to be stored.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedDocument {
    pub collection: String,
    pub document: Document,
    /// How many internal fields were withheld because of name collisions.
    pub collisions: usize,
}

// ---------------------------------------------------------------------------
// Assembler
// ---------------------------------------------------------------------------

/// Incremental, single-pass collection builder.
///
/// Feed records in arrival order with [`Assembler::push`], then call
/// [`Assembler::finish`].
#[derive(Debug, Default)]
pub struct Assembler {
    options: AssembleOptions,
    store: CollectionStore,
    orphans: Vec<OrphanedRecord>,
    report: AssembleReport,
}

impl Assembler {
    pub fn new(options: AssembleOptions) -> Self {
        Self {
            options,
            store: CollectionStore::new(),
            orphans: Vec::new(),
            report: AssembleReport::default(),
        }
    }

    /// Add one record. Failures are logged, counted, and kept as orphans;
    /// they are never returned.
    pub fn push(&mut self, record: Result<RawRecord>) {
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                warn!(error = %e, "skipping undecodable record");
                self.orphan(None, &e, Fields::new());
                return;
            }
        };

        let path = match DocumentPath::from_elements(&record.path) {
            Ok(path) => path,
            Err(e) => {
                warn!(error = %e, "skipping record with invalid path");
                self.orphan(Some(record.raw_path()), &e, record.fields);
                return;
            }
        };

        let normalized = normalize_at(record, &path, self.options.grouping);
        self.report.collisions += normalized.collisions;
        self.store
            .entry(normalized.collection)
            .or_default()
            .push(normalized.document);
        self.report.documents += 1;
    }

    fn orphan(&mut self, path: Option<String>, reason: &FsExportError, fields: Fields) {
        self.report.skipped += 1;
        self.orphans.push(OrphanedRecord {
            path,
            reason: reason.to_string(),
            fields,
        });
    }

    /// Finish the pass and build the metadata block.
    pub fn finish(self, source_file_count: usize, export_metadata: Option<String>) -> Assembly {
        let metadata = ExportMetadata {
            export_date: None,
            total_documents: self.report.documents,
            total_collections: self.store.len(),
            export_files_processed: source_file_count,
            skipped_records: self.report.skipped,
            export_metadata,
        };

        info!(
            documents = metadata.total_documents,
            collections = metadata.total_collections,
            skipped = metadata.skipped_records,
            collisions = self.report.collisions,
            "assembly complete"
        );

        Assembly {
            store: self.store,
            orphans: self.orphans,
            metadata,
            report: self.report,
        }
    }
}

/// Assemble a complete collection store from a sequence of records.
///
/// Per-record failures (decode errors from the source, malformed paths) are
/// logged and counted in [`AssembleReport::skipped`]; the pass never aborts.
#[instrument(skip_all, fields(source_files = source_file_count))]
pub fn assemble<I>(records: I, source_file_count: usize, options: &AssembleOptions) -> Assembly
where
    I: IntoIterator<Item = Result<RawRecord>>,
{
    let mut assembler = Assembler::new(*options);
    for record in records {
        assembler.push(record);
    }
    assembler.finish(source_file_count, None)
}

/// Name of the collection a document path belongs to.
pub fn collection_name(path: &DocumentPath, grouping: CollectionGrouping) -> &str {
    match grouping {
        CollectionGrouping::Leaf => &path.leaf().kind,
        CollectionGrouping::Root => &path.root().kind,
    }
}

/// Normalize one record: validate its path and append the internal fields.
///
/// If the record already has a field called `_document_id` or `_key`, that
/// field keeps its original value and the internal one is not written.
pub fn normalize(record: RawRecord, grouping: CollectionGrouping) -> Result<NormalizedDocument> {
    let path = DocumentPath::from_elements(&record.path)?;
    Ok(normalize_at(record, &path, grouping))
}

/// Normalize a record whose path has already been validated into `path`.
fn normalize_at(
    record: RawRecord,
    path: &DocumentPath,
    grouping: CollectionGrouping,
) -> NormalizedDocument {
    let key = DocumentKey::new(path, record.app, record.namespace);
    let document_id = path.leaf().id.to_string();
    let collection = collection_name(path, grouping).to_string();

    let mut document = record.fields;
    let mut collisions = 0;

    for (name, value) in [
        (DOCUMENT_ID_FIELD, Value::String(document_id)),
        (KEY_FIELD, key.to_value()),
    ] {
        if document.contains_key(name) {
            warn!(
                path = %key.path,
                field = name,
                "record already has an internal field name; keeping original value"
            );
            collisions += 1;
        } else {
            document.insert(name.to_string(), value);
        }
    }

    NormalizedDocument {
        collection,
        document,
        collisions,
    }
}

// ---------------------------------------------------------------------------
// JSON file I/O
// ---------------------------------------------------------------------------

/// Render the export file as pretty-printed JSON (2-space indent, UTF-8).
pub fn to_json_string(file: &ExportFile) -> Result<String> {
    serde_json::to_string_pretty(file)
        .map_err(|e| FsExportError::Serialization(format!("JSON serialization failed: {e}")))
}

/// Write the export file atomically (write to temp, then rename).
pub fn write_export_file(path: &Path, file: &ExportFile) -> Result<()> {
    let json = to_json_string(file)?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "export.json".to_string());
    let temp = path.with_file_name(format!(".{file_name}.tmp"));

    std::fs::write(&temp, json).map_err(|e| FsExportError::io(&temp, e))?;
    if let Err(e) = std::fs::rename(&temp, path) {
        if let Err(cleanup) = std::fs::remove_file(&temp) {
            warn!(path = %temp.display(), error = %cleanup, "could not remove temp file");
        }
        return Err(FsExportError::io(path, e));
    }

    debug!(path = %path.display(), "wrote JSON file");
    Ok(())
}

/// Load a converted JSON file.
pub fn load_export_file(path: &Path) -> Result<ExportFile> {
    if !path.is_file() {
        return Err(FsExportError::input_not_found(path));
    }

    let content = std::fs::read_to_string(path).map_err(|e| FsExportError::io(path, e))?;
    let file: ExportFile = serde_json::from_str(&content).map_err(|e| {
        FsExportError::validation(format!("invalid export file {}: {e}", path.display()))
    })?;

    let counted = file.document_count();
    if counted != file.metadata.total_documents {
        warn!(
            path = %path.display(),
            metadata = file.metadata.total_documents,
            counted,
            "metadata document total does not match collection contents"
        );
    }

    debug!(
        path = %path.display(),
        collections = file.collections.len(),
        orphans = file.orphaned_documents.len(),
        "loaded export file"
    );
    Ok(file)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
