//! Exports one collection of a converted Firestore export to CSV.

use clap::Parser;
use color_eyre::eyre::Result;

use fsexport_cli::{csv_export, init_tracing};

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = csv_export::Cli::parse();
    init_tracing(&cli.common);
    csv_export::run(cli)
}
