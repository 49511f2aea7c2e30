mod common;

use common::*;
use imvec::index::{materialize, query_file_name};
use imvec::{EmbeddingIndex, EmbeddingRecord, Error, IndexKind, PictureArchive};
use rstest::*;
use std::path::Path;
use tempfile::TempDir;

fn record(id: i64, name: &str, embedding: &[f32]) -> EmbeddingRecord {
    EmbeddingRecord { id, display_name: name.to_string(), embedding: embedding.to_vec() }
}

#[fixture]
fn records() -> Vec<EmbeddingRecord> {
    vec![
        record(1, "a.jpg", &[1.0, 0.0]),
        record(2, "b.jpg", &[0.0, 1.0]),
        record(3, "c.png", &[0.9, 0.1]),
    ]
}

#[rstest]
#[case::flat(IndexKind::Flat)]
#[case::hnsw(IndexKind::Hnsw)]
fn test_query_order(#[case] kind: IndexKind, records: Vec<EmbeddingRecord>) {
    let index = EmbeddingIndex::from_records(records, kind).unwrap();
    assert_eq!(index.len(), 3);
    assert_eq!(index.dimension(), 2);

    let hits = index.query(&[1.0, 0.0], 2).unwrap();
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].record.id, 1);
    assert!((hits[0].score - 1.0).abs() < 1e-5);
    assert_eq!(hits[1].record.id, 3);
    assert!((hits[1].score - 0.9).abs() < 1e-5);
}

#[rstest]
#[case::flat(IndexKind::Flat)]
#[case::hnsw(IndexKind::Hnsw)]
fn test_k_larger_than_records(#[case] kind: IndexKind, records: Vec<EmbeddingRecord>) {
    let index = EmbeddingIndex::from_records(records, kind).unwrap();
    let hits = index.query(&[0.0, 1.0], 10).unwrap();
    assert_eq!(hits.len(), 3);
    assert_eq!(hits[0].record.id, 2);
    assert!(hits.windows(2).all(|w| w[0].score >= w[1].score));
}

#[rstest]
fn test_exact_scores(records: Vec<EmbeddingRecord>) {
    let index = EmbeddingIndex::from_records(records, IndexKind::Flat).unwrap();
    let hits = index.query(&[2.0, 1.0], 3).unwrap();
    let ids = hits.iter().map(|hit| hit.record.id).collect::<Vec<_>>();
    assert_eq!(ids, vec![1, 3, 2]);
    for (hit, expected) in hits.iter().zip([2.0, 1.9, 1.0]) {
        assert!((hit.score - expected).abs() < 1e-5);
    }
}

#[rstest]
fn test_ties_prefer_earlier_records() {
    let records = vec![
        record(1, "a.jpg", &[0.5, 0.5]),
        record(2, "b.jpg", &[1.0, 0.0]),
        record(3, "c.jpg", &[0.5, 0.5]),
    ];
    let index = EmbeddingIndex::from_records(records, IndexKind::Flat).unwrap();
    let hits = index.query(&[1.0, 1.0], 3).unwrap();
    let ids = hits.iter().map(|hit| hit.record.id).collect::<Vec<_>>();
    assert_eq!(ids, vec![1, 2, 3]);
}

#[rstest]
#[case::flat(IndexKind::Flat)]
#[case::hnsw(IndexKind::Hnsw)]
fn test_ties_beyond_search_width(#[case] kind: IndexKind) {
    // 同一张图片重复添加 40 次，超过 HNSW 的默认搜索宽度
    let mut records = (1..=40).map(|id| record(id, "same.jpg", &[0.5, 0.5])).collect::<Vec<_>>();
    records.push(record(41, "other.jpg", &[0.1, 0.1]));
    let index = EmbeddingIndex::from_records(records, kind).unwrap();

    let hits = index.query(&[1.0, 1.0], 3).unwrap();
    let ids = hits.iter().map(|hit| hit.record.id).collect::<Vec<_>>();
    assert_eq!(ids, vec![1, 2, 3]);
    assert!(hits.iter().all(|hit| hit.score == 1.0));
}

#[rstest]
#[case::flat(IndexKind::Flat)]
#[case::hnsw(IndexKind::Hnsw)]
fn test_query_dimension_mismatch(#[case] kind: IndexKind, records: Vec<EmbeddingRecord>) {
    let index = EmbeddingIndex::from_records(records, kind).unwrap();
    let err = index.query(&[1.0, 0.0, 0.0], 1).unwrap_err();
    assert!(matches!(err, Error::Consistency(_)));
}

#[rstest]
fn test_inconsistent_records() {
    let records = vec![record(1, "a.jpg", &[1.0, 0.0]), record(2, "b.jpg", &[1.0])];
    let result = EmbeddingIndex::from_records(records, IndexKind::Flat);
    assert!(matches!(result, Err(Error::Consistency(_))));
}

#[rstest]
#[case::flat(IndexKind::Flat)]
#[case::hnsw(IndexKind::Hnsw)]
fn test_empty_index(#[case] kind: IndexKind) {
    let index = EmbeddingIndex::from_records(vec![], kind).unwrap();
    assert!(index.is_empty());
    assert!(index.query(&[1.0, 2.0, 3.0], 5).unwrap().is_empty());
}

#[rstest]
fn test_zero_k(records: Vec<EmbeddingRecord>) {
    let index = EmbeddingIndex::from_records(records, IndexKind::Flat).unwrap();
    assert!(index.query(&[1.0, 0.0], 0).unwrap().is_empty());
}

#[rstest]
fn test_record_lookup(records: Vec<EmbeddingRecord>) {
    let index = EmbeddingIndex::from_records(records, IndexKind::Flat).unwrap();
    assert_eq!(index.record(3).unwrap().display_name, "c.png");
    assert!(index.record(4).is_none());
}

#[rstest]
#[tokio::test]
async fn test_build_from_store() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;
    store.append("a.jpg", &[1.0, 0.0]).await.unwrap();
    store.append("b.jpg", &[0.0, 1.0]).await.unwrap();
    store.append("c.png", &[0.9, 0.1]).await.unwrap();

    let index = EmbeddingIndex::build(&store, IndexKind::Flat).await.unwrap();
    assert_eq!(index.records(), store.read_all().await.unwrap().as_slice());

    let hits = index.query(&[1.0, 0.0], 2).unwrap();
    let names = hits.iter().map(|hit| hit.record.display_name.as_str()).collect::<Vec<_>>();
    assert_eq!(names, vec!["a.jpg", "c.png"]);

    // 索引构建后新增的记录需要重新构建才能被搜索到
    store.append("d.jpg", &[2.0, 0.0]).await.unwrap();
    assert_eq!(index.query(&[1.0, 0.0], 5).unwrap().len(), 3);
    let index = EmbeddingIndex::build(&store, IndexKind::Flat).await.unwrap();
    assert_eq!(index.query(&[1.0, 0.0], 1).unwrap()[0].record.display_name, "d.jpg");
}

#[rstest]
#[tokio::test]
async fn test_materialize(records: Vec<EmbeddingRecord>) {
    let dir = TempDir::new().unwrap();
    let archive = PictureArchive::open(dir.path().join("pictures")).unwrap();
    for record in &records {
        write_file(archive.path_of(&record.display_name), record.display_name.as_bytes());
    }

    let index = EmbeddingIndex::from_records(records, IndexKind::Flat).unwrap();
    let hits = index.query(&[0.9, 0.1], 2).unwrap();
    let output = dir.path().join("results");
    let written = materialize(&hits, &archive, &output, Some(3)).await.unwrap();

    assert_eq!(written, vec![output.join("query.png"), output.join("a.jpg")]);
    assert_eq!(std::fs::read(output.join("query.png")).unwrap(), b"c.png");
    assert_eq!(std::fs::read(output.join("a.jpg")).unwrap(), b"a.jpg");
    assert_eq!(count_files(&output), 2);
}

#[rstest]
#[tokio::test]
async fn test_materialize_duplicate_names() {
    let dir = TempDir::new().unwrap();
    let archive = PictureArchive::open(dir.path().join("pictures")).unwrap();
    write_file(archive.path_of("same.jpg"), b"same");
    write_file(archive.path_of("other.jpg"), b"other");

    let records = vec![
        record(1, "same.jpg", &[1.0, 0.0]),
        record(2, "same.jpg", &[1.0, 0.0]),
        record(3, "other.jpg", &[0.8, 0.2]),
        record(4, "same.jpg", &[1.0, 0.0]),
    ];
    let index = EmbeddingIndex::from_records(records, IndexKind::Flat).unwrap();
    let hits = index.query(&[1.0, 0.0], 4).unwrap();
    let output = dir.path().join("results");
    let written = materialize(&hits, &archive, &output, Some(4)).await.unwrap();

    // 记录 1、2 只复制一次，记录 4 作为查询图片单独复制
    assert_eq!(written, vec![output.join("same.jpg"), output.join("query.jpg"), output.join("other.jpg")]);
    assert_eq!(count_files(&output), 3);
}

#[rstest]
#[tokio::test]
async fn test_materialize_missing_picture(records: Vec<EmbeddingRecord>) {
    let dir = TempDir::new().unwrap();
    let archive = PictureArchive::open(dir.path().join("pictures")).unwrap();

    let index = EmbeddingIndex::from_records(records, IndexKind::Flat).unwrap();
    let hits = index.query(&[1.0, 0.0], 1).unwrap();
    let err = materialize(&hits, &archive, dir.path().join("results"), None).await.unwrap_err();
    assert!(matches!(err, Error::Io { .. }));
}

#[rstest]
#[case("photo.JPG", "query.JPG")]
#[case("dir/abc.webp", "query.webp")]
#[case("noext", "query")]
fn test_query_file_name(#[case] name: &str, #[case] expected: &str) {
    assert_eq!(query_file_name(Path::new(name)), expected);
}
