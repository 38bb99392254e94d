//! Full library flow: shards on disk → JSON file → session queries → CSV.

use std::path::Path;

use fsexport_core::pipeline::{ConvertOptions, SilentProgress, convert_export};
use fsexport_core::projection::{ProjectionOptions, project, write_csv};
use fsexport_core::query::Session;
use fsexport_reader::JsonLinesSource;
use fsexport_shared::{CollectionGrouping, DOCUMENT_ID_FIELD, KEY_FIELD, Value};

fn write_shards(dir: &Path) {
    std::fs::write(
        dir.join("output-0"),
        concat!(
            r#"{"name":"Ann","age":31,"_key":{"path":"users/u1"}}"#,
            "\n",
            r#"{"name":"Ben","joined":"2021-04-01T00:00:00Z","#,
            r#""_key":{"path":"users/u2","namespace":"prod"}}"#,
            "\n",
        ),
    )
    .unwrap();
    std::fs::write(
        dir.join("output-1"),
        concat!(
            "\n",
            r#"{"_key":{"path":"users"}}"#,
            "\n",
            r#"{"sku":"A-1","qty":2,"_key":{"path":["users","u1","orders",7]}}"#,
            "\n",
        ),
    )
    .unwrap();
}

#[test]
fn two_shards_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    write_shards(dir.path());

    let options = ConvertOptions {
        export_dir: dir.path().to_path_buf(),
        output_file: dir.path().join("firestore_export.json"),
        grouping: CollectionGrouping::Leaf,
    };
    let result = convert_export(&options, &JsonLinesSource, &SilentProgress).unwrap();

    assert_eq!(result.metadata.total_documents, 3);
    assert_eq!(result.metadata.skipped_records, 1);
    assert_eq!(
        result.collections,
        vec![("users".to_string(), 2), ("orders".to_string(), 1)]
    );

    let session = Session::open(&result.output_file).unwrap();
    let summary = session.summary();
    let sum: usize = summary.collections.iter().map(|(_, n)| n).sum();
    assert_eq!(summary.total_documents, sum);

    let ben = session.get_document("users", 1).unwrap();
    assert_eq!(ben[DOCUMENT_ID_FIELD], Value::from("u2"));
    let key = ben[KEY_FIELD].as_map().unwrap();
    assert_eq!(key["path"], Value::from("users/u2"));
    assert_eq!(key["namespace"], Value::from("prod"));

    let order = session.get_document("orders", 0).unwrap();
    assert_eq!(order[DOCUMENT_ID_FIELD], Value::from("7"));
    let key = order[KEY_FIELD].as_map().unwrap();
    assert_eq!(key["id"], Value::from(7));
    assert_eq!(key["name"], Value::Null);
    assert_eq!(key["path"], Value::from("users/u1/orders/7"));

    let hits: Vec<usize> = session.search("users", "name", "AN").map(|h| h.index).collect();
    assert_eq!(hits, vec![0]);

    let projection = project(
        &session.export().collections,
        "users",
        &ProjectionOptions::default(),
    )
    .unwrap();
    assert_eq!(projection.columns, vec!["age", "joined", "name"]);

    let mut buf = Vec::new();
    write_csv(&projection, &mut buf).unwrap();
    assert_eq!(
        String::from_utf8(buf).unwrap(),
        "age,joined,name\n31,,Ann\n,2021-04-01T00:00:00Z,Ben\n"
    );
}
