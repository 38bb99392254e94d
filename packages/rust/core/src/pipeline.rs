//! End-to-end conversion pipeline: export directory → shards → assemble → JSON.

use std::path::PathBuf;
use std::time::Instant;

use tracing::{info, instrument, warn};

use fsexport_reader::{RecordSource, find_export_files, read_export_metadata};
use fsexport_shared::{CollectionGrouping, ExportMetadata, FsExportError, Result};

use crate::assembler::{AssembleOptions, AssembleReport, Assembler, write_export_file};

/// Configuration for the conversion pipeline.
#[derive(Debug, Clone)]
pub struct ConvertOptions {
    /// Directory holding the `output-<N>` shard files.
    pub export_dir: PathBuf,
    /// Where to write the converted JSON file.
    pub output_file: PathBuf,
    /// Collection grouping policy for nested paths.
    pub grouping: CollectionGrouping,
}

/// Result of the conversion pipeline.
#[derive(Debug)]
pub struct ConvertResult {
    /// Path of the written JSON file.
    pub output_file: PathBuf,
    /// The metadata block that was written.
    pub metadata: ExportMetadata,
    /// Assembly counters.
    pub report: AssembleReport,
    /// Document count per collection, in stored order.
    pub collections: Vec<(String, usize)>,
    /// Shards that could not be read at all.
    pub failed_shards: Vec<String>,
    /// Total elapsed time.
    pub elapsed: std::time::Duration,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called after each shard has been decoded.
    fn shard_read(&self, shard: &str, current: usize, total: usize, records: usize);
    /// Called when the pipeline completes.
    fn done(&self, result: &ConvertResult);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn shard_read(&self, _shard: &str, _current: usize, _total: usize, _records: usize) {}
    fn done(&self, _result: &ConvertResult) {}
}

/// Run the full conversion.
///
/// 1. Find `output-<N>` shards (fails if the directory is missing or empty)
/// 2. Decode each shard through `source`, feeding records to the assembler
/// 3. Read the optional export metadata file
/// 4. Write the JSON file atomically
///
/// A shard that cannot be read is logged and skipped; the run continues.
#[instrument(skip_all, fields(dir = %options.export_dir.display(), source = source.name()))]
pub fn convert_export(
    options: &ConvertOptions,
    source: &dyn RecordSource,
    progress: &dyn ProgressReporter,
) -> Result<ConvertResult> {
    let start = Instant::now();

    info!(output = %options.output_file.display(), "starting conversion");

    // --- Phase 1: Discover shards ---
    progress.phase("Finding export files");
    let shards = find_export_files(&options.export_dir)?;
    if shards.is_empty() {
        return Err(FsExportError::validation(format!(
            "no output-* files found in {}; is this a Firestore export directory?",
            options.export_dir.display()
        )));
    }

    // --- Phase 2: Decode and assemble ---
    progress.phase("Reading export files");
    let mut assembler = Assembler::new(AssembleOptions {
        grouping: options.grouping,
    });
    let mut failed_shards = Vec::new();
    let total = shards.len();

    for (i, shard) in shards.iter().enumerate() {
        let name = shard.name();
        match source.records(&shard.path) {
            Ok(records) => {
                let count = records.len();
                info!(shard = %name, records = count, "parsed shard");
                for record in records {
                    assembler.push(record);
                }
                progress.shard_read(&name, i + 1, total, count);
            }
            Err(e) => {
                warn!(shard = %name, error = %e, "failed to read shard, skipping");
                failed_shards.push(name.clone());
                progress.shard_read(&name, i + 1, total, 0);
            }
        }
    }

    // --- Phase 3: Metadata ---
    progress.phase("Reading export metadata");
    let export_metadata = read_export_metadata(&options.export_dir);

    let assembly = assembler.finish(shards.len(), export_metadata);
    let report = assembly.report;
    let collections: Vec<(String, usize)> = assembly
        .store
        .iter()
        .map(|(name, docs)| (name.clone(), docs.len()))
        .collect();

    // --- Phase 4: Write ---
    progress.phase("Writing JSON");
    let file = assembly.into_export_file();
    write_export_file(&options.output_file, &file)?;

    let result = ConvertResult {
        output_file: options.output_file.clone(),
        metadata: file.metadata,
        report,
        collections,
        failed_shards,
        elapsed: start.elapsed(),
    };

    progress.done(&result);

    info!(
        documents = result.metadata.total_documents,
        collections = result.metadata.total_collections,
        skipped = result.metadata.skipped_records,
        elapsed_ms = result.elapsed.as_millis(),
        "conversion complete"
    );

    Ok(result)
}
