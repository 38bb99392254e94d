//! Export directory discovery and record sources.
//!
//! A Firestore export directory holds numbered shard files (`output-0`,
//! `output-1`, ...) plus an optional `*.export_metadata` file. This crate
//! finds the shards in numeric order, reads the metadata file, and hands
//! shard contents to a [`RecordSource`] that yields [`RawRecord`]s.
//!
//! [`RawRecord`]: fsexport_shared::RawRecord

mod source;

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use fsexport_shared::{FsExportError, Result};
use regex::Regex;
use tracing::{debug, info, instrument, warn};

pub use source::{JsonLinesSource, RecordSource, ShardRecords, parse_record_line};

/// Extension of the export's metadata file.
const METADATA_EXTENSION: &str = "export_metadata";

// ---------------------------------------------------------------------------
// Shard discovery
// ---------------------------------------------------------------------------

/// One `output-<N>` shard file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportShard {
    /// The shard number `N`.
    pub index: u64,
    /// Full path to the shard file.
    pub path: PathBuf,
}

impl ExportShard {
    /// File name for display (`output-3`).
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Find all `output-<N>` shard files in the export directory, sorted by `N`.
///
/// Files that do not match the shard naming scheme are ignored.
#[instrument(skip_all, fields(dir = %export_dir.display()))]
pub fn find_export_files(export_dir: &Path) -> Result<Vec<ExportShard>> {
    static SHARD_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"^output-(\d+)$").expect("valid regex"));

    if !export_dir.is_dir() {
        return Err(FsExportError::input_not_found(export_dir));
    }

    let entries = std::fs::read_dir(export_dir).map_err(|e| FsExportError::io(export_dir, e))?;

    let mut shards = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| FsExportError::io(export_dir, e))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }

        let name = entry.file_name().to_string_lossy().into_owned();
        let Some(caps) = SHARD_RE.captures(&name) else {
            debug!(file = %name, "ignoring non-shard file");
            continue;
        };
        let Ok(index) = caps[1].parse::<u64>() else {
            warn!(file = %name, "shard number out of range, ignoring");
            continue;
        };

        shards.push(ExportShard { index, path });
    }

    shards.sort_by_key(|s| s.index);
    info!(count = shards.len(), "found export shards");

    Ok(shards)
}

// ---------------------------------------------------------------------------
// Export metadata
// ---------------------------------------------------------------------------

/// Read the export's `*.export_metadata` file as opaque text.
///
/// The first matching file (by name) is used. Returns `None` when there is no
/// such file or it cannot be read; the content is never interpreted.
#[instrument(skip_all, fields(dir = %export_dir.display()))]
pub fn read_export_metadata(export_dir: &Path) -> Option<String> {
    let entries = match std::fs::read_dir(export_dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(error = %e, "could not list export directory for metadata");
            return None;
        }
    };

    let mut candidates: Vec<PathBuf> = entries
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == METADATA_EXTENSION))
        .collect();
    candidates.sort();

    let path = candidates.into_iter().next()?;
    match std::fs::read(&path) {
        Ok(bytes) => {
            let (text, encoding) = decode_text(bytes);
            if encoding == TextEncoding::Latin1 {
                warn!(file = %path.display(), "metadata is not valid UTF-8, decoded as Latin-1");
            }
            info!(file = %path.display(), ?encoding, "read export metadata");
            Some(text)
        }
        Err(e) => {
            warn!(file = %path.display(), error = %e, "could not read metadata file");
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Text decoding
// ---------------------------------------------------------------------------

/// Encoding that was used to decode a byte buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    Utf8,
    /// Fallback: every byte maps to the code point of the same value.
    Latin1,
}

/// Decode bytes as UTF-8, falling back to Latin-1 when they are not valid
/// UTF-8. Never fails; callers log the fallback with their own context.
pub fn decode_text(bytes: Vec<u8>) -> (String, TextEncoding) {
    match String::from_utf8(bytes) {
        Ok(text) => (text, TextEncoding::Utf8),
        Err(e) => {
            let bytes = e.into_bytes();
            (bytes.iter().map(|&b| char::from(b)).collect(), TextEncoding::Latin1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(dir: &Path, name: &str, content: &[u8]) {
        std::fs::write(dir.join(name), content).expect("write fixture");
    }

    #[test]
    fn shards_sorted_numerically() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["output-10", "output-2", "output-0", "output-1"] {
            touch(dir.path(), name, b"");
        }

        let shards = find_export_files(dir.path()).unwrap();
        let indexes: Vec<u64> = shards.iter().map(|s| s.index).collect();
        assert_eq!(indexes, vec![0, 1, 2, 10]);
        assert_eq!(shards[3].name(), "output-10");
    }

    #[test]
    fn non_shard_files_ignored() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "output-0", b"");
        touch(dir.path(), "output-x", b"");
        touch(dir.path(), "output-1.bak", b"");
        touch(dir.path(), "all_namespaces_all_kinds.export_metadata", b"meta");
        std::fs::create_dir(dir.path().join("output-5")).unwrap();

        let shards = find_export_files(dir.path()).unwrap();
        assert_eq!(shards.len(), 1);
        assert_eq!(shards[0].index, 0);
    }

    #[test]
    fn missing_directory_is_input_not_found() {
        let err = find_export_files(Path::new("/no/such/export/dir")).unwrap_err();
        assert!(matches!(err, FsExportError::InputNotFound { .. }));
    }

    #[test]
    fn metadata_read_as_text() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "all_namespaces_all_kinds.export_metadata", b"kinds: all");

        assert_eq!(read_export_metadata(dir.path()).as_deref(), Some("kinds: all"));
    }

    #[test]
    fn metadata_absent() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "output-0", b"");
        assert!(read_export_metadata(dir.path()).is_none());
    }

    #[test]
    fn metadata_latin1_fallback() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "x.export_metadata", &[0x6b, 0xe9, 0xff]);

        assert_eq!(read_export_metadata(dir.path()).as_deref(), Some("k\u{e9}\u{ff}"));
    }

    #[test]
    fn decode_utf8() {
        let (text, enc) = decode_text("Beyoncé".as_bytes().to_vec());
        assert_eq!(text, "Beyoncé");
        assert_eq!(enc, TextEncoding::Utf8);
    }

    #[test]
    fn decode_invalid_utf8_as_latin1() {
        let (text, enc) = decode_text(vec![b'a', 0xe9]);
        assert_eq!(text, "a\u{e9}");
        assert_eq!(enc, TextEncoding::Latin1);
    }
}
