//! Application configuration for the export tools.
//!
//! User config lives at `~/.fsexport/fsexport.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{FsExportError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "fsexport.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".fsexport";

// ---------------------------------------------------------------------------
// Config structs (matching fsexport.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Converter settings.
    #[serde(default)]
    pub convert: ConvertConfig,

    /// Interactive viewer settings.
    #[serde(default)]
    pub viewer: ViewerConfig,

    /// CSV exporter settings.
    #[serde(default)]
    pub csv: CsvConfig,
}

/// How documents in sub-collections are grouped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionGrouping {
    /// By the collection the document directly belongs to
    /// (`users/u1/orders/o7` → `orders`).
    #[default]
    Leaf,
    /// By the top-level collection (`users/u1/orders/o7` → `users`).
    Root,
}

/// `[convert]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvertConfig {
    /// Output file used when none is given on the command line.
    #[serde(default = "default_output_file")]
    pub output_file: String,

    /// Collection grouping policy for nested paths.
    #[serde(default)]
    pub collection_grouping: CollectionGrouping,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            output_file: default_output_file(),
            collection_grouping: CollectionGrouping::default(),
        }
    }
}

fn default_output_file() -> String {
    "firestore_export.json".into()
}

/// `[viewer]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewerConfig {
    /// Max characters of a string shown in the sample document structure.
    #[serde(default = "default_preview_chars")]
    pub preview_chars: usize,

    /// Max characters of a context value shown next to a search hit.
    #[serde(default = "default_value_chars")]
    pub value_chars: usize,

    /// Number of search hits printed before summarizing the rest.
    #[serde(default = "default_search_display_limit")]
    pub search_display_limit: usize,

    /// Number of document ids listed by `show`.
    #[serde(default = "default_show_limit")]
    pub show_limit: usize,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            preview_chars: default_preview_chars(),
            value_chars: default_value_chars(),
            search_display_limit: default_search_display_limit(),
            show_limit: default_show_limit(),
        }
    }
}

fn default_preview_chars() -> usize {
    50
}
fn default_value_chars() -> usize {
    100
}
fn default_search_display_limit() -> usize {
    10
}
fn default_show_limit() -> usize {
    5
}

/// `[csv]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CsvConfig {
    /// Expand nested maps into `parent_child` columns by default.
    #[serde(default)]
    pub flatten: bool,
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.fsexport/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| FsExportError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.fsexport/fsexport.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = match config_file_path() {
        Ok(path) => path,
        Err(e) => {
            tracing::debug!(error = %e, "no config location, using defaults");
            return Ok(AppConfig::default());
        }
    };

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| FsExportError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        FsExportError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Load from an explicit path when one is given, otherwise from the default
/// location.
pub fn resolve_config(explicit: Option<&Path>) -> Result<AppConfig> {
    match explicit {
        Some(path) => {
            if !path.exists() {
                return Err(FsExportError::input_not_found(path));
            }
            load_config_from(path)
        }
        None => load_config(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("firestore_export.json"));
        assert!(toml_str.contains("collection_grouping = \"leaf\""));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.viewer.search_display_limit, 10);
        assert_eq!(parsed.viewer.preview_chars, 50);
        assert_eq!(parsed.convert.collection_grouping, CollectionGrouping::Leaf);
        assert!(!parsed.csv.flatten);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[convert]
collection_grouping = "root"

[viewer]
search_display_limit = 3
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.convert.collection_grouping, CollectionGrouping::Root);
        assert_eq!(config.convert.output_file, "firestore_export.json");
        assert_eq!(config.viewer.search_display_limit, 3);
        assert_eq!(config.viewer.value_chars, 100);
    }

    #[test]
    fn unknown_grouping_rejected() {
        let toml_str = "[convert]\ncollection_grouping = \"sideways\"\n";
        assert!(toml::from_str::<AppConfig>(toml_str).is_err());
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("fsexport.toml");
        std::fs::write(&path, "[csv]\nflatten = true\n").expect("write");

        let config = load_config_from(&path).expect("load");
        assert!(config.csv.flatten);
    }

    #[test]
    fn resolve_missing_explicit_path() {
        let err = resolve_config(Some(Path::new("/definitely/not/here.toml"))).unwrap_err();
        assert!(matches!(err, FsExportError::InputNotFound { .. }));
    }
}
