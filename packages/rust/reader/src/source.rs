//! Record sources: turn one shard file into a sequence of raw records.

use std::path::Path;

use fsexport_shared::{Fields, FsExportError, KEY_FIELD, PathElement, RawRecord, Result, Value};
use tracing::{debug, warn};

use crate::{TextEncoding, decode_text};

/// Records decoded from one shard. Each entry fails independently.
pub type ShardRecords = Vec<Result<RawRecord>>;

/// Decodes export shards into raw records.
///
/// This is where an entity decoder for the export's on-disk format plugs in.
/// An `Err` from [`RecordSource::records`] means the whole shard was
/// unreadable; per-record failures go inside the returned vector.
pub trait RecordSource {
    /// Human-readable name of the source format, for logs.
    fn name(&self) -> &str;

    /// Decode every record in the shard, in file order.
    fn records(&self, shard: &Path) -> Result<ShardRecords>;
}

/// Reads shards holding one decoded entity per line as a JSON object.
///
/// Each object carries its user fields plus a `_key` object with a `path`
/// (slash-separated string, or a flat `[kind, id, kind, id, ...]` array where
/// ids may be integers) and optional `app` / `namespace` strings.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonLinesSource;

impl RecordSource for JsonLinesSource {
    fn name(&self) -> &str {
        "json-lines"
    }

    /// Lines are decoded one at a time, so a line with invalid UTF-8 falls
    /// back to Latin-1 without affecting its neighbours.
    fn records(&self, shard: &Path) -> Result<ShardRecords> {
        let bytes = std::fs::read(shard).map_err(|e| FsExportError::io(shard, e))?;

        let mut records = ShardRecords::new();
        for (i, raw) in bytes.split(|&b| b == b'\n').enumerate() {
            let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
            if raw.iter().all(u8::is_ascii_whitespace) {
                continue;
            }

            let line_no = i + 1;
            let (line, encoding) = decode_text(raw.to_vec());
            if encoding == TextEncoding::Latin1 {
                warn!(
                    shard = %shard.display(),
                    line = line_no,
                    "line is not valid UTF-8, decoded as Latin-1"
                );
            }

            records.push(parse_record_line(&line).map_err(|e| {
                FsExportError::record_parse(format!("{}:{line_no}: {e}", shard.display()))
            }));
        }

        debug!(shard = %shard.display(), records = records.len(), "decoded shard");
        Ok(records)
    }
}

/// Parse one JSON entity line into a [`RawRecord`].
pub fn parse_record_line(line: &str) -> Result<RawRecord> {
    let value: serde_json::Value = serde_json::from_str(line)
        .map_err(|e| FsExportError::record_parse(format!("invalid JSON: {e}")))?;

    let serde_json::Value::Object(mut object) = value else {
        return Err(FsExportError::record_parse("entity is not a JSON object"));
    };

    let key = match object.shift_remove(KEY_FIELD) {
        Some(serde_json::Value::Object(key)) => key,
        Some(_) => return Err(FsExportError::record_parse("'_key' is not an object")),
        None => return Err(FsExportError::record_parse("entity has no '_key'")),
    };

    let path = match key.get("path") {
        Some(serde_json::Value::String(s)) => split_path(s),
        Some(serde_json::Value::Array(items)) => array_path(items)?,
        Some(_) => return Err(FsExportError::record_parse("'_key.path' has an invalid type")),
        None => return Err(FsExportError::record_parse("'_key' has no 'path'")),
    };

    let fields: Fields = object
        .into_iter()
        .map(|(name, v)| (name, Value::from(v)))
        .collect();

    Ok(RawRecord {
        path,
        app: optional_string(&key, "app"),
        namespace: optional_string(&key, "namespace"),
        fields,
    })
}

fn split_path(path: &str) -> Vec<PathElement> {
    if path.is_empty() {
        return Vec::new();
    }
    path.split('/')
        .enumerate()
        .map(|(i, part)| {
            if i % 2 == 0 {
                PathElement::Kind(part.to_string())
            } else {
                PathElement::Name(part.to_string())
            }
        })
        .collect()
}

fn array_path(items: &[serde_json::Value]) -> Result<Vec<PathElement>> {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| match item {
            serde_json::Value::String(s) if i % 2 == 0 => Ok(PathElement::Kind(s.clone())),
            serde_json::Value::String(s) => Ok(PathElement::Name(s.clone())),
            serde_json::Value::Number(n) => n.as_i64().map(PathElement::Id).ok_or_else(|| {
                FsExportError::record_parse(format!("path element {n} is not an integer id"))
            }),
            other => Err(FsExportError::record_parse(format!(
                "path element {other} has an invalid type"
            ))),
        })
        .collect()
}

fn optional_string(key: &serde_json::Map<String, serde_json::Value>, name: &str) -> Option<String> {
    match key.get(name) {
        Some(serde_json::Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(serde_json::Value::Null) | None => None,
        Some(other) => {
            warn!(field = name, value = %other, "ignoring non-string key attribute");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_string_path() {
        let record = parse_record_line(
            r#"{"artist":"The Beatles","title":"Help!","_key":{"path":"songs/s1","app":"demo"}}"#,
        )
        .unwrap();

        assert_eq!(
            record.path,
            vec![PathElement::Kind("songs".into()), PathElement::Name("s1".into())]
        );
        assert_eq!(record.app.as_deref(), Some("demo"));
        assert_eq!(record.namespace, None);
        let names: Vec<_> = record.fields.keys().cloned().collect();
        assert_eq!(names, vec!["artist", "title"]);
    }

    #[test]
    fn parse_array_path_with_numeric_id() {
        let record =
            parse_record_line(r#"{"n":1,"_key":{"path":["users","u1","orders",7]}}"#).unwrap();
        assert_eq!(record.path.len(), 4);
        assert_eq!(record.path[3], PathElement::Id(7));
    }

    #[test]
    fn key_is_required() {
        let err = parse_record_line(r#"{"name":"Ann"}"#).unwrap_err();
        assert!(err.to_string().contains("no '_key'"));

        let err = parse_record_line(r#"{"_key":{"app":"x"}}"#).unwrap_err();
        assert!(err.to_string().contains("no 'path'"));
    }

    #[test]
    fn non_object_rejected() {
        assert!(parse_record_line("[1,2]").is_err());
        assert!(parse_record_line("not json").is_err());
    }

    #[test]
    fn shard_records_fail_independently() {
        let dir = tempfile::tempdir().unwrap();
        let shard = dir.path().join("output-0");
        std::fs::write(
            &shard,
            concat!(
                r#"{"name":"Ann","_key":{"path":"users/u1"}}"#,
                "\n\n",
                "{broken\n",
                r#"{"name":"Bea","_key":{"path":"users/u2"}}"#,
                "\n",
            ),
        )
        .unwrap();

        let records = JsonLinesSource.records(&shard).unwrap();
        assert_eq!(records.len(), 3);
        assert!(records[0].is_ok());
        let err = records[1].as_ref().unwrap_err();
        assert!(err.to_string().contains("output-0:3"));
        assert!(records[2].is_ok());
    }

    #[test]
    fn invalid_utf8_line_does_not_affect_other_lines() {
        let dir = tempfile::tempdir().unwrap();
        let shard = dir.path().join("output-0");

        let line = |artist: &str, id: &str| {
            format!(r#"{{"artist":"{artist}","_key":{{"path":"songs/{id}"}}}}"#).into_bytes()
        };
        let mut content = line("Beyoncé", "s1");
        content.extend_from_slice(b"\r\n");
        content.extend_from_slice(b"{\"artist\":\"Zo\xe9\",\"_key\":{\"path\":\"songs/s2\"}}\n");
        content.extend(line("Motörhead", "s3"));
        std::fs::write(&shard, content).unwrap();

        let records = JsonLinesSource.records(&shard).unwrap();
        let artists: Vec<Value> = records
            .iter()
            .map(|r| r.as_ref().unwrap().fields["artist"].clone())
            .collect();
        assert_eq!(
            artists,
            vec![
                Value::from("Beyoncé"),
                Value::from("Zo\u{e9}"),
                Value::from("Motörhead"),
            ]
        );
    }

    #[test]
    fn missing_shard_is_io_error() {
        let err = JsonLinesSource
            .records(Path::new("/no/such/output-0"))
            .unwrap_err();
        assert!(matches!(err, FsExportError::Io { .. }));
    }
}
