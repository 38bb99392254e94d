//! `firestore-to-json`: convert an export directory into one JSON file.

use std::io::Write;
use std::path::PathBuf;

use clap::Parser;
use color_eyre::eyre::Result;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use fsexport_core::pipeline::{ConvertOptions, ConvertResult, ProgressReporter, convert_export};
use fsexport_reader::JsonLinesSource;

use crate::logging::CommonArgs;

/// Convert a Firestore export directory into a single JSON file.
#[derive(Parser, Debug)]
#[command(
    name = "firestore-to-json",
    version,
    about = "Convert a Firestore export directory (output-N shards) into one JSON file.",
    long_about = None,
)]
pub struct Cli {
    /// Directory holding the export's output-<N> files.
    pub export_directory: PathBuf,

    /// Output JSON file (defaults to firestore_export.json, or the config value).
    pub output_file: Option<PathBuf>,

    #[command(flatten)]
    pub common: CommonArgs,
}

/// Run the converter and print the per-collection summary to stdout.
pub fn run(cli: Cli) -> Result<()> {
    let config = cli.common.load_config()?;

    let options = ConvertOptions {
        export_dir: cli.export_directory,
        output_file: cli
            .output_file
            .unwrap_or_else(|| PathBuf::from(&config.convert.output_file)),
        grouping: config.convert.collection_grouping,
    };

    info!(
        dir = %options.export_dir.display(),
        grouping = ?options.grouping,
        "converting export"
    );

    let reporter = CliProgress::new();
    let result = convert_export(&options, &JsonLinesSource, &reporter)?;

    print_summary(&mut std::io::stdout(), &result)?;
    Ok(())
}

/// Write the human-readable conversion summary.
pub fn print_summary(out: &mut impl Write, result: &ConvertResult) -> std::io::Result<()> {
    let meta = &result.metadata;

    writeln!(out)?;
    writeln!(out, "  Conversion complete!")?;
    writeln!(out, "  Output:       {}", result.output_file.display())?;
    writeln!(out, "  Documents:    {}", meta.total_documents)?;
    writeln!(out, "  Collections:  {}", meta.total_collections)?;
    writeln!(out, "  Files read:   {}", meta.export_files_processed)?;
    if meta.skipped_records > 0 {
        writeln!(out, "  Skipped:      {}", meta.skipped_records)?;
    }
    if result.report.collisions > 0 {
        writeln!(out, "  Collisions:   {}", result.report.collisions)?;
    }
    if !result.failed_shards.is_empty() {
        writeln!(out, "  Unreadable:   {}", result.failed_shards.join(", "))?;
    }
    writeln!(out, "  Time:         {:.1}s", result.elapsed.as_secs_f64())?;

    if !result.collections.is_empty() {
        writeln!(out)?;
        writeln!(out, "  Collections:")?;
        for (name, count) in &result.collections {
            writeln!(out, "    {name}: {count} documents")?;
        }
    }
    writeln!(out)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .map(|s| s.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]))
            .unwrap_or_else(|_| ProgressStyle::default_spinner());

        let spinner = ProgressBar::new_spinner();
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn shard_read(&self, shard: &str, current: usize, total: usize, records: usize) {
        self.spinner
            .set_message(format!("Reading [{current}/{total}] {shard} ({records} records)"));
    }

    fn done(&self, _result: &ConvertResult) {
        self.spinner.finish_and_clear();
    }
}
