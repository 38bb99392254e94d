//! `firestore-viewer`: interactive exploration of a converted export.
//!
//! The REPL reads one line at a time, parses it into a [`Command`], and runs
//! it against a [`Session`]. Query errors are printed inline and the loop
//! continues; only I/O failures on the terminal end the session.

use std::io::Write;
use std::path::PathBuf;
use std::str::FromStr;

use clap::Parser;
use color_eyre::eyre::{Result, eyre};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::{debug, info};

use fsexport_core::query::{Session, truncate};
use fsexport_shared::{DOCUMENT_ID_FIELD, ViewerConfig, is_internal_field};

use crate::logging::CommonArgs;

const RULE_WIDTH: usize = 50;
/// Extra fields shown under each search hit.
const CONTEXT_FIELDS: usize = 3;

/// Explore a converted Firestore JSON file interactively.
#[derive(Parser, Debug)]
#[command(
    name = "firestore-viewer",
    version,
    about = "Interactively explore a JSON file produced by firestore-to-json.",
    long_about = None,
)]
pub struct Cli {
    /// Converted JSON file.
    pub json_file: PathBuf,

    #[command(flatten)]
    pub common: CommonArgs,
}

/// Load the file, print the summary, then run the REPL until quit or EOF.
pub fn run(cli: Cli) -> Result<()> {
    let config = cli.common.load_config()?;
    let session =
        Session::open(&cli.json_file)?.with_preview_chars(config.viewer.preview_chars);

    let mut out = std::io::stdout();
    writeln!(out, "Loaded {}", cli.json_file.display())?;
    write_summary(&mut out, &session)?;
    write_help(&mut out)?;

    let mut rl = DefaultEditor::new().map_err(|e| eyre!("failed to init line editor: {e}"))?;

    loop {
        let line = match rl.readline("\n> ") {
            Ok(l) => l,
            Err(ReadlineError::Eof | ReadlineError::Interrupted) => {
                writeln!(out, "Exiting...")?;
                break;
            }
            Err(e) => return Err(eyre!("readline error: {e}")),
        };

        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Err(e) = rl.add_history_entry(line) {
            debug!(error = %e, "failed to record history");
        }

        if dispatch(&session, line, &config.viewer, &mut out)? == ReplControl::Exit {
            break;
        }
    }

    info!("viewer closed");
    Ok(())
}

// ---------------------------------------------------------------------------
// Command parsing
// ---------------------------------------------------------------------------

/// One REPL command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Summary,
    List,
    Show {
        collection: String,
        limit: Option<usize>,
    },
    Doc {
        collection: String,
        index: usize,
    },
    Search {
        collection: String,
        field: String,
        value: String,
    },
    Help,
    Quit,
}

impl FromStr for Command {
    type Err = String;

    fn from_str(line: &str) -> std::result::Result<Self, Self::Err> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let Some((&cmd, args)) = tokens.split_first() else {
            return Err("empty command".to_string());
        };

        match cmd {
            "summary" => Ok(Self::Summary),
            "list" => Ok(Self::List),
            "help" | "?" => Ok(Self::Help),
            "quit" | "exit" => Ok(Self::Quit),
            "show" => match args {
                [collection] => Ok(Self::Show {
                    collection: (*collection).to_string(),
                    limit: None,
                }),
                [collection, limit] => {
                    let limit = limit
                        .parse()
                        .map_err(|_| "invalid limit; must be a number".to_string())?;
                    Ok(Self::Show {
                        collection: (*collection).to_string(),
                        limit: Some(limit),
                    })
                }
                _ => Err("usage: show <collection> [limit]".to_string()),
            },
            "doc" => match args {
                [collection, index] => {
                    let index = index
                        .parse()
                        .map_err(|_| "invalid document index; must be a number".to_string())?;
                    Ok(Self::Doc {
                        collection: (*collection).to_string(),
                        index,
                    })
                }
                _ => Err("usage: doc <collection> <index>".to_string()),
            },
            "search" => match args {
                [collection, field, value @ ..] if !value.is_empty() => Ok(Self::Search {
                    collection: (*collection).to_string(),
                    field: (*field).to_string(),
                    value: value.join(" "),
                }),
                _ => Err("usage: search <collection> <field> <value...>".to_string()),
            },
            other => Err(format!("unknown command '{other}'; type 'help' for commands")),
        }
    }
}

/// Whether the REPL keeps going after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplControl {
    Continue,
    Exit,
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

/// Parse and run one input line, writing all output to `out`.
pub fn dispatch(
    session: &Session,
    line: &str,
    config: &ViewerConfig,
    out: &mut impl Write,
) -> std::io::Result<ReplControl> {
    let command = match line.parse::<Command>() {
        Ok(c) => c,
        Err(msg) => {
            writeln!(out, "error: {msg}")?;
            return Ok(ReplControl::Continue);
        }
    };

    debug!(?command, "dispatch");

    match command {
        Command::Quit => return Ok(ReplControl::Exit),
        Command::Help => write_help(out)?,
        Command::Summary => write_summary(out, session)?,
        Command::List => {
            writeln!(out, "\nAvailable collections:")?;
            for name in session.list_collections() {
                writeln!(out, "  {name}")?;
            }
        }
        Command::Show { collection, limit } => {
            write_collection(out, session, &collection, limit.unwrap_or(config.show_limit))?;
        }
        Command::Doc { collection, index } => write_document(out, session, &collection, index)?,
        Command::Search {
            collection,
            field,
            value,
        } => write_search(out, session, &collection, &field, &value, config)?,
    }

    Ok(ReplControl::Continue)
}

fn write_banner(out: &mut impl Write, title: &str) -> std::io::Result<()> {
    let rule = "=".repeat(RULE_WIDTH);
    writeln!(out, "\n{rule}")?;
    writeln!(out, "{title}")?;
    writeln!(out, "{rule}")
}

/// Print the command reference.
pub fn write_help(out: &mut impl Write) -> std::io::Result<()> {
    write_banner(out, "INTERACTIVE MODE")?;
    writeln!(out, "Commands:")?;
    writeln!(out, "  summary                              - Show data summary")?;
    writeln!(out, "  list                                 - List all collections")?;
    writeln!(out, "  show <collection> [limit]            - Show collection details")?;
    writeln!(out, "  doc <collection> <index>             - Show a specific document")?;
    writeln!(out, "  search <collection> <field> <value>  - Search documents")?;
    writeln!(out, "  help                                 - Show this help")?;
    writeln!(out, "  quit | exit                          - Exit")?;
    writeln!(out, "{}", "=".repeat(RULE_WIDTH))
}

/// Print totals and per-collection counts.
pub fn write_summary(out: &mut impl Write, session: &Session) -> std::io::Result<()> {
    let summary = session.summary();

    write_banner(out, "FIRESTORE EXPORT SUMMARY")?;
    writeln!(out, "Total documents: {}", summary.total_documents)?;
    writeln!(out, "Total collections: {}", summary.total_collections)?;
    writeln!(out, "Export files processed: {}", summary.export_files_processed)?;
    if summary.skipped_records > 0 {
        writeln!(out, "Skipped records: {}", summary.skipped_records)?;
    }
    if summary.orphaned_documents > 0 {
        writeln!(
            out,
            "Orphaned documents: {} (kept under \"orphaned_documents\")",
            summary.orphaned_documents
        )?;
    }

    writeln!(out, "\nCollections found:")?;
    for (name, count) in &summary.collections {
        writeln!(out, "  {name}: {count} documents")?;
    }
    Ok(())
}

fn write_collection(
    out: &mut impl Write,
    session: &Session,
    collection: &str,
    limit: usize,
) -> std::io::Result<()> {
    let view = match session.show(collection, Some(limit)) {
        Ok(v) => v,
        Err(e) => return writeln!(out, "error: {e}"),
    };

    write_banner(out, &format!("COLLECTION: {}", view.name))?;
    writeln!(out, "Total documents: {}", view.total)?;

    if !view.fields.is_empty() {
        writeln!(out, "\nSample document structure:")?;
        for field in &view.fields {
            writeln!(out, "  {}: {} ({})", field.name, field.preview, field.type_name)?;
        }
    }

    if !view.documents.is_empty() {
        writeln!(out, "\nFirst {} documents:", view.documents.len())?;
        for (i, doc) in view.documents.iter().enumerate() {
            let id = doc
                .get(DOCUMENT_ID_FIELD)
                .map(ToString::to_string)
                .unwrap_or_default();
            writeln!(out, "  [{i}] {id}")?;
        }
    }
    Ok(())
}

fn write_document(
    out: &mut impl Write,
    session: &Session,
    collection: &str,
    index: usize,
) -> std::io::Result<()> {
    let document = match session.get_document(collection, index) {
        Ok(d) => d,
        Err(e) => return writeln!(out, "error: {e}"),
    };

    write_banner(out, &format!("DOCUMENT: {collection}[{index}]"))?;
    match serde_json::to_string_pretty(document) {
        Ok(json) => writeln!(out, "{json}"),
        Err(e) => writeln!(out, "error: could not render document: {e}"),
    }
}

fn write_search(
    out: &mut impl Write,
    session: &Session,
    collection: &str,
    field: &str,
    value: &str,
    config: &ViewerConfig,
) -> std::io::Result<()> {
    if let Err(e) = session.collection(collection) {
        return writeln!(out, "error: {e}");
    }

    let hits: Vec<_> = session.search(collection, field, value).collect();

    write_banner(
        out,
        &format!("SEARCH RESULTS: {collection}.{field} contains '{value}'"),
    )?;
    writeln!(out, "Found {} matches:", hits.len())?;

    for (n, hit) in hits.iter().take(config.search_display_limit).enumerate() {
        writeln!(out, "\n[{}] Document {}:", n + 1, hit.index)?;
        if let Some(v) = hit.document.get(field) {
            writeln!(out, "  {field}: {v}")?;
        }

        let context = hit
            .document
            .iter()
            .filter(|(name, _)| name.as_str() != field && !is_internal_field(name))
            .take(CONTEXT_FIELDS);
        for (name, v) in context {
            writeln!(out, "  {name}: {}", truncate(&v.to_string(), config.value_chars))?;
        }
    }

    if hits.len() > config.search_display_limit {
        writeln!(
            out,
            "\n... and {} more matches",
            hits.len() - config.search_display_limit
        )?;
    }
    Ok(())
}
