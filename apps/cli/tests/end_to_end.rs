//! Convert → view → CSV through the CLI layer, on temporary directories.

use std::path::Path;

use clap::Parser;

use fsexport_cli::{convert, csv_export, viewer};
use fsexport_core::query::Session;
use fsexport_shared::{AppConfig, ViewerConfig, load_config_from};

fn write_export(dir: &Path) {
    let shard0 = [
        r#"{"title":"Help!","artist":"The Beatles","year":1965,"_key":{"path":"songs/s1"}}"#,
        r#"{"name":"Ann","_key":{"path":["users","u1"],"app":"demo"}}"#,
        r#"{"broken":true}"#,
    ];
    let shard1 = [
        concat!(
            r#"{"title":"Bohemian Rhapsody","artist":"Queen","#,
            r#""album":{"name":"A Night at the Opera"},"_key":{"path":"songs/s2"}}"#,
        ),
        r#"{"total":12.5,"_key":{"path":"users/u1/orders/o1"}}"#,
    ];
    std::fs::write(dir.join("output-0"), shard0.join("\n")).unwrap();
    std::fs::write(dir.join("output-1"), shard1.join("\n")).unwrap();
    std::fs::write(dir.join("ignored.txt"), "not a shard").unwrap();
}

fn write_config(dir: &Path, body: &str) -> std::path::PathBuf {
    let path = dir.join("fsexport.toml");
    std::fs::write(&path, body).unwrap();
    path
}

#[test]
fn convert_then_view_then_export_csv() {
    let work = tempfile::tempdir().unwrap();
    let export_dir = work.path().join("export");
    std::fs::create_dir(&export_dir).unwrap();
    write_export(&export_dir);

    let config_path = write_config(work.path(), "[viewer]\nshow_limit = 1\n");
    let json_path = work.path().join("converted.json");

    // --- Convert ---
    let cli = convert::Cli::try_parse_from([
        "firestore-to-json",
        export_dir.to_str().unwrap(),
        json_path.to_str().unwrap(),
        "--config",
        config_path.to_str().unwrap(),
    ])
    .unwrap();
    convert::run(cli).unwrap();
    assert!(json_path.exists());

    // --- View ---
    let session = Session::open(&json_path).unwrap();
    let summary = session.summary();
    assert_eq!(summary.total_documents, 4);
    assert_eq!(summary.skipped_records, 1);
    assert_eq!(summary.orphaned_documents, 1);
    assert_eq!(summary.export_files_processed, 2);
    assert_eq!(session.list_collections(), vec!["songs", "users", "orders"]);

    let viewer_config: ViewerConfig = load_config_from(&config_path).unwrap().viewer;
    assert_eq!(viewer_config.show_limit, 1);

    let mut out = Vec::new();
    viewer::dispatch(&session, "show songs", &viewer_config, &mut out).unwrap();
    viewer::dispatch(&session, "search songs artist QUEEN", &viewer_config, &mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("First 1 documents:"));
    assert!(text.contains("Found 1 matches:"));
    assert!(text.contains("[1] Document 1:"));

    // --- CSV ---
    let csv_path = work.path().join("songs.csv");
    let cli = csv_export::Cli::try_parse_from([
        "collection-to-csv",
        json_path.to_str().unwrap(),
        "songs",
        "-o",
        csv_path.to_str().unwrap(),
        "--include-fields",
        "artist",
        "title",
        "genre",
    ])
    .unwrap();

    let mut out = Vec::new();
    let written = csv_export::export(&cli, &AppConfig::default(), &mut out).unwrap();
    assert_eq!(written, csv_path);

    let report = String::from_utf8(out).unwrap();
    assert!(report.contains("Exporting 2 documents from 'songs' collection..."));
    assert!(report.contains("Warning: these fields were not found: genre"));

    let csv = std::fs::read_to_string(&csv_path).unwrap();
    assert_eq!(
        csv,
        "artist,title\nThe Beatles,Help!\nQueen,Bohemian Rhapsody\n"
    );
}

#[test]
fn root_grouping_from_config() {
    let work = tempfile::tempdir().unwrap();
    write_export(work.path());
    let config_path = write_config(work.path(), "[convert]\ncollection_grouping = \"root\"\n");
    let json_path = work.path().join("out.json");

    let cli = convert::Cli::try_parse_from([
        "firestore-to-json",
        work.path().to_str().unwrap(),
        json_path.to_str().unwrap(),
        "--config",
        config_path.to_str().unwrap(),
    ])
    .unwrap();
    convert::run(cli).unwrap();

    let session = Session::open(&json_path).unwrap();
    assert_eq!(session.list_collections(), vec!["songs", "users"]);
    assert_eq!(session.collection("users").unwrap().len(), 2);
}

#[test]
fn convert_missing_directory_fails() {
    let work = tempfile::tempdir().unwrap();
    let config_path = write_config(work.path(), "");

    let cli = convert::Cli::try_parse_from([
        "firestore-to-json",
        work.path().join("nope").to_str().unwrap(),
        "--config",
        config_path.to_str().unwrap(),
    ])
    .unwrap();
    let err = convert::run(cli).unwrap_err();
    assert!(err.to_string().contains("not found"));
}

#[test]
fn csv_unknown_collection_fails() {
    let work = tempfile::tempdir().unwrap();
    write_export(work.path());
    let json_path = work.path().join("out.json");
    let config_path = write_config(work.path(), "");

    let cli = convert::Cli::try_parse_from([
        "firestore-to-json",
        work.path().to_str().unwrap(),
        json_path.to_str().unwrap(),
        "--config",
        config_path.to_str().unwrap(),
    ])
    .unwrap();
    convert::run(cli).unwrap();

    let cli = csv_export::Cli::try_parse_from([
        "collection-to-csv",
        json_path.to_str().unwrap(),
        "albums",
        "-o",
        work.path().join("albums.csv").to_str().unwrap(),
    ])
    .unwrap();
    let err = csv_export::export(&cli, &AppConfig::default(), &mut Vec::new()).unwrap_err();
    assert!(err.to_string().contains("albums"));
    assert!(!work.path().join("albums.csv").exists());
}
