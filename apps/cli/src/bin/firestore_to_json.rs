//! Converts a Firestore export directory into a single JSON file.

use clap::Parser;
use color_eyre::eyre::Result;

use fsexport_cli::{convert, init_tracing};

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = convert::Cli::parse();
    init_tracing(&cli.common);
    convert::run(cli)
}
