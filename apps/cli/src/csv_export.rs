//! `collection-to-csv`: export one collection of a converted file as CSV.

use std::io::Write;
use std::path::PathBuf;

use clap::Parser;
use color_eyre::eyre::Result;
use tracing::info;

use fsexport_core::assembler::load_export_file;
use fsexport_core::projection::{ProjectionOptions, project, write_csv_file};
use fsexport_shared::AppConfig;

use crate::logging::CommonArgs;

/// Export a single collection to CSV.
#[derive(Parser, Debug)]
#[command(
    name = "collection-to-csv",
    version,
    about = "Export one collection of a firestore-to-json file to CSV.",
    long_about = None,
)]
pub struct Cli {
    /// Converted JSON file.
    pub json_file: PathBuf,

    /// Collection to export.
    pub collection_name: String,

    /// Output CSV file (defaults to <collection>_export.csv).
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Only export these fields, in this order.
    #[arg(long, num_args = 1..)]
    pub include_fields: Option<Vec<String>>,

    /// Drop these fields.
    #[arg(long, num_args = 1..)]
    pub exclude_fields: Vec<String>,

    /// Keep `_document_id` and `_key` columns.
    #[arg(long)]
    pub include_internal: bool,

    /// Expand nested maps into parent_child columns.
    #[arg(long)]
    pub flatten: bool,

    #[command(flatten)]
    pub common: CommonArgs,
}

impl Cli {
    /// Projection options from flags, with `[csv]` config as the fallback.
    pub fn projection_options(&self, config: &AppConfig) -> ProjectionOptions {
        ProjectionOptions {
            include_fields: self.include_fields.clone(),
            exclude_fields: self.exclude_fields.clone(),
            include_internal: self.include_internal,
            flatten: self.flatten || config.csv.flatten,
        }
    }

    /// Output path, defaulting to `<collection>_export.csv`.
    pub fn output_path(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| PathBuf::from(format!("{}_export.csv", self.collection_name)))
    }
}

pub fn run(cli: Cli) -> Result<()> {
    let config = cli.common.load_config()?;
    export(&cli, &config, &mut std::io::stdout())?;
    Ok(())
}

/// Load, project, and write the CSV, reporting progress to `out`.
///
/// Returns the path written.
pub fn export(cli: &Cli, config: &AppConfig, out: &mut impl Write) -> Result<PathBuf> {
    let file = load_export_file(&cli.json_file)?;
    let options = cli.projection_options(config);
    let projection = project(&file.collections, &cli.collection_name, &options)?;

    writeln!(
        out,
        "Exporting {} documents from '{}' collection...",
        projection.rows.len(),
        cli.collection_name
    )?;
    if !projection.missing_fields.is_empty() {
        writeln!(
            out,
            "Warning: these fields were not found: {}",
            projection.missing_fields.join(", ")
        )?;
    }
    writeln!(
        out,
        "Exporting {} fields: {}",
        projection.columns.len(),
        projection.columns.join(", ")
    )?;

    let path = cli.output_path();
    write_csv_file(&path, &projection)?;

    info!(collection = %cli.collection_name, path = %path.display(), "export complete");
    writeln!(out, "Successfully exported to {}", path.display())?;
    Ok(path)
}
