//! Interactive viewer for converted Firestore exports.

use clap::Parser;
use color_eyre::eyre::Result;

use fsexport_cli::{init_tracing, viewer};

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = viewer::Cli::parse();
    init_tracing(&cli.common);
    viewer::run(cli)
}
