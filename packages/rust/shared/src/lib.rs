//! Shared types, error model, and configuration for the Firestore export tools.
//!
//! This crate is the foundation depended on by all other crates in the workspace.
//! It provides:
//! - [`FsExportError`], the unified error type
//! - The closed field [`Value`] variant and its JSON/text conversions
//! - Domain types ([`RawRecord`], [`DocumentPath`], [`DocumentKey`], [`ExportFile`])
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;
pub mod value;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, CollectionGrouping, ConvertConfig, CsvConfig, ViewerConfig, config_dir,
    config_file_path, load_config, load_config_from, resolve_config,
};
pub use error::{FsExportError, Result};
pub use types::{
    CollectionStore, DOCUMENT_ID_FIELD, Document, DocumentKey, DocumentPath, ExportFile,
    ExportMetadata, Identifier, KEY_FIELD, OrphanedRecord, PathElement, PathSegment, RawRecord,
    is_internal_field,
};
pub use value::{Fields, Value, format_timestamp};
