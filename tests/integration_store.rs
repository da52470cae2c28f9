//! Integration tests for the record store and selection manifests.

use phash_catalog::core::hasher::{HashAlgorithmKind, HashRecord};
use phash_catalog::core::similarity::{nearest, DEFAULT_K};
use phash_catalog::core::store::{
    read_manifest, write_manifest, PersistMode, RecordSchema, RecordStore,
};
use phash_catalog::error::StoreError;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

const ALGORITHMS: [HashAlgorithmKind; 3] = [
    HashAlgorithmKind::Average,
    HashAlgorithmKind::Perceptual,
    HashAlgorithmKind::Difference,
];

fn sample_records() -> Vec<HashRecord> {
    vec![
        HashRecord::new("/photos/plain.jpg")
            .with_hash(HashAlgorithmKind::Average, "ff00ff00ff00ff00")
            .with_hash(HashAlgorithmKind::Perceptual, "0123456789abcdef")
            .with_hash(HashAlgorithmKind::Difference, "0000000000000000"),
        HashRecord::new("/photos/beach, sunset.jpg")
            .with_hash(HashAlgorithmKind::Average, "00ff00ff00ff00ff")
            .with_hash(HashAlgorithmKind::Perceptual, "fedcba9876543210")
            .with_hash(HashAlgorithmKind::Difference, "0000000000000001"),
        HashRecord::new("/photos/the \"best\" one.png")
            .with_hash(HashAlgorithmKind::Average, "ffffffffffffffff")
            .with_hash(HashAlgorithmKind::Perceptual, "aaaaaaaaaaaaaaaa")
            .with_hash(HashAlgorithmKind::Difference, "ffffffffffffffff"),
    ]
}

fn write_streaming(store: &RecordStore, records: &[HashRecord]) -> usize {
    let mut writer = store
        .open_writer(PersistMode::StreamingAppend, RecordSchema::new(&ALGORITHMS))
        .unwrap();
    for (index, record) in records.iter().enumerate() {
        writer.accept(index, record).unwrap();
    }
    writer.finish().unwrap()
}

#[test]
fn streaming_round_trip_preserves_awkward_paths() {
    let dir = TempDir::new().unwrap();
    let store = RecordStore::new(dir.path().join("hashes.csv"));
    let records = sample_records();

    assert_eq!(write_streaming(&store, &records), 3);

    let report = store.load().unwrap();
    assert_eq!(report.algorithms(), &ALGORITHMS);
    assert!(report.malformed.is_empty());
    assert_eq!(report.records, records);
}

#[test]
fn batch_round_trip_matches_streaming() {
    let dir = TempDir::new().unwrap();
    let streaming = RecordStore::new(dir.path().join("stream.csv"));
    let batch = RecordStore::new(dir.path().join("batch.csv"));
    let records = sample_records();

    write_streaming(&streaming, &records);
    batch
        .write_all(RecordSchema::new(&ALGORITHMS), &records)
        .unwrap();

    assert_eq!(
        fs::read_to_string(streaming.path()).unwrap(),
        fs::read_to_string(batch.path()).unwrap()
    );
}

#[test]
fn header_names_every_column() {
    let dir = TempDir::new().unwrap();
    let store = RecordStore::new(dir.path().join("hashes.csv"));
    write_streaming(&store, &sample_records());

    let text = fs::read_to_string(store.path()).unwrap();
    let header = text.lines().next().unwrap();
    assert_eq!(
        header,
        "Image,Average Hash,Perceptual Hash,Difference Hash"
    );
    assert!(text.contains("\"/photos/beach, sunset.jpg\""));
    assert!(text.contains("\"/photos/the \"\"best\"\" one.png\""));
}

#[test]
fn malformed_rows_are_skipped_and_reported() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("hashes.csv");
    fs::write(
        &path,
        "Image,Difference Hash\n\
         /a.jpg,0000\n\
         /b.jpg\n\
         /c.jpg,0001,extra\n\
         /d.jpg,ffff\n",
    )
    .unwrap();

    let report = RecordStore::new(&path).load().unwrap();

    let names: Vec<PathBuf> = report.records.iter().map(|r| r.asset_path.clone()).collect();
    assert_eq!(names, vec![PathBuf::from("/a.jpg"), PathBuf::from("/d.jpg")]);
    let lines: Vec<usize> = report.malformed.iter().map(|m| m.line).collect();
    assert_eq!(lines, vec![3, 4]);
    assert!(report.malformed.iter().all(|m| m.expected == 2));
}

#[test]
fn header_without_image_column_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("hashes.csv");
    fs::write(&path, "Path,Difference Hash\n/a.jpg,0000\n").unwrap();

    let result = RecordStore::new(&path).load();
    assert!(matches!(result, Err(StoreError::InvalidHeader { .. })));
}

#[test]
fn missing_store_is_an_io_error() {
    let dir = TempDir::new().unwrap();
    let result = RecordStore::new(dir.path().join("absent.csv")).load();
    assert!(matches!(result, Err(StoreError::Io { .. })));
}

#[test]
fn appending_different_columns_is_refused() {
    let dir = TempDir::new().unwrap();
    let store = RecordStore::new(dir.path().join("hashes.csv"));
    write_streaming(&store, &sample_records());

    let result = store.open_writer(
        PersistMode::StreamingAppend,
        RecordSchema::new(&[HashAlgorithmKind::Difference]),
    );
    assert!(matches!(result, Err(StoreError::SchemaMismatch { .. })));
}

#[test]
fn appending_after_a_crash_inside_a_quoted_path_keeps_new_rows() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("hashes.csv");
    fs::write(
        &path,
        "Image,Average Hash,Perceptual Hash,Difference Hash\n\
         /photos/a.jpg,00,11,22\n\
         \"/photos/cut, off",
    )
    .unwrap();
    let store = RecordStore::new(&path);

    let records = sample_records();
    write_streaming(&store, &records[..2]);

    let report = store.load().unwrap();
    assert!(report.malformed.is_empty());
    let names: Vec<PathBuf> = report.records.iter().map(|r| r.asset_path.clone()).collect();
    assert_eq!(
        names,
        vec![
            PathBuf::from("/photos/a.jpg"),
            PathBuf::from("/photos/plain.jpg"),
            PathBuf::from("/photos/beach, sunset.jpg"),
        ]
    );
}

#[test]
fn loaded_store_feeds_similarity_search() {
    let dir = TempDir::new().unwrap();
    let store = RecordStore::new(dir.path().join("hashes.csv"));
    write_streaming(&store, &sample_records());

    let report = store.load().unwrap();
    let query = report.records[0]
        .hash(HashAlgorithmKind::Difference)
        .unwrap()
        .clone();
    let outcome = nearest(&report.records, &query, HashAlgorithmKind::Difference, DEFAULT_K);

    let order: Vec<(u32, usize)> = outcome
        .neighbors
        .iter()
        .map(|n| (n.distance, n.index))
        .collect();
    assert_eq!(order, vec![(0, 0), (1, 1), (16, 2)]);
}

#[test]
fn manifest_lists_paths_in_order() {
    let dir = TempDir::new().unwrap();
    let paths = vec![
        PathBuf::from("/photos/z.jpg"),
        PathBuf::from("/photos/a, b.jpg"),
        PathBuf::from("/photos/m.png"),
    ];

    let manifest = write_manifest(dir.path(), &paths).unwrap();

    let name = manifest.file_name().unwrap().to_string_lossy().into_owned();
    assert_eq!(name.len(), "YYYYMMDDHHMMSS.csv".len());
    assert!(name.ends_with(".csv"));
    assert!(name[..14].chars().all(|c| c.is_ascii_digit()));
    assert_eq!(read_manifest(&manifest).unwrap(), paths);
}
