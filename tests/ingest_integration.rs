//! Incremental ingestion against a real on-disk index.

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use chrono::{DateTime, Utc};
use tempfile::TempDir;

use portfolio_rag::checkpoint::CheckpointStore;
use portfolio_rag::config::{parse_config, ChunkingConfig, Config};
use portfolio_rag::embedding::{Embedder, HashEmbedder};
use portfolio_rag::error::IndexError;
use portfolio_rag::index::{SqliteVectorIndex, VectorIndex};
use portfolio_rag::ingest::{ingest, rebuild};
use portfolio_rag::scanner::ScanOptions;

fn write_with_mtime(path: &Path, body: &str, mtime: SystemTime) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, body).unwrap();
    fs::File::options()
        .write(true)
        .open(path)
        .unwrap()
        .set_modified(mtime)
        .unwrap();
}

fn embedder() -> Arc<dyn Embedder> {
    Arc::new(HashEmbedder::default())
}

struct Site {
    _tmp: TempDir,
    content: std::path::PathBuf,
    index_path: std::path::PathBuf,
    checkpoint: CheckpointStore,
}

fn site() -> Site {
    let tmp = TempDir::new().unwrap();
    let content = tmp.path().join("src/content");
    let past = SystemTime::now() - Duration::from_secs(3600);

    write_with_mtime(
        &content.join("experiences/manaburn.md"),
        "---\ntitle: ManaBurn\n---\nFounding engineer at ManaBurn. Built the AWS backend in Python.",
        past,
    );
    write_with_mtime(
        &content.join("posts/post-2025-06-23.mdx"),
        &"Notes on building a portfolio chatbot with retrieval. ".repeat(40),
        past,
    );
    write_with_mtime(&content.join("notes.txt"), "not content", past);

    Site {
        index_path: tmp.path().join("data/index.sqlite"),
        checkpoint: CheckpointStore::new(tmp.path().join("data/last_rebuild.json")),
        content,
        _tmp: tmp,
    }
}

#[tokio::test]
async fn ingest_is_incremental_across_restarts() {
    let site = site();
    let chunking = ChunkingConfig::default();
    let options = ScanOptions::default();

    // First run: everything is new.
    let index = SqliteVectorIndex::open(&site.index_path, embedder(), 16)
        .await
        .unwrap();
    let first = ingest(&index, &site.checkpoint, &site.content, &options, &chunking, false)
        .await
        .unwrap();
    assert_eq!(first.files_ingested, 2);
    let post_chunks = first.chunks_embedded - 1;
    assert!(post_chunks > 1, "long post should span several chunks");
    let total = index.len().await;
    drop(index);

    // Second run after a restart: nothing changed.
    let index = SqliteVectorIndex::open(&site.index_path, embedder(), 16)
        .await
        .unwrap();
    assert_eq!(index.len().await, total);
    let second = ingest(&index, &site.checkpoint, &site.content, &options, &chunking, false)
        .await
        .unwrap();
    assert_eq!(second.files_ingested, 0);
    assert_eq!(second.files_unchanged, 2);
    assert_eq!(second.chunks_embedded, 0);

    // Touch one file after the checkpoint: only it is re-ingested, and its
    // old chunks are replaced rather than duplicated.
    let checkpoint = site.checkpoint.get().unwrap();
    let later = SystemTime::from(checkpoint) + Duration::from_secs(60);
    write_with_mtime(
        &site.content.join("experiences/manaburn.md"),
        "Founding engineer at ManaBurn. Led the move to AWS Lambda.",
        later,
    );
    let third = ingest(&index, &site.checkpoint, &site.content, &options, &chunking, false)
        .await
        .unwrap();
    assert_eq!(third.files_ingested, 1);
    assert_eq!(third.chunks_embedded, 1);
    assert_eq!(index.len().await, total);
    drop(index);

    // The persisted index reflects the edit.
    let loaded = SqliteVectorIndex::load(&site.index_path, embedder(), 16)
        .await
        .unwrap();
    let hits = loaded.search("AWS Lambda ManaBurn", 1, None).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert!(hits[0].chunk.text.contains("Lambda"));
    assert!(hits[0].chunk.source_path.ends_with("experiences/manaburn.md"));
}

#[tokio::test]
async fn front_matter_is_kept_unless_stripping_is_enabled() {
    let site = site();
    let chunking = ChunkingConfig::default();

    let index = SqliteVectorIndex::open(&site.index_path, embedder(), 16)
        .await
        .unwrap();
    ingest(&index, &site.checkpoint, &site.content, &ScanOptions::default(), &chunking, false)
        .await
        .unwrap();
    let hits = index.search("ManaBurn founding", 1, None).await.unwrap();
    assert!(hits[0].chunk.text.starts_with("---\ntitle: ManaBurn"));

    let stripped = ScanOptions {
        strip_front_matter: true,
        ..ScanOptions::default()
    };
    ingest(&index, &site.checkpoint, &site.content, &stripped, &chunking, true)
        .await
        .unwrap();
    let hits = index.search("ManaBurn founding", 1, None).await.unwrap();
    assert!(hits[0].chunk.text.starts_with("Founding engineer"));
}

#[tokio::test]
async fn query_side_load_fails_until_first_ingest() {
    let site = site();

    let err = SqliteVectorIndex::load(&site.index_path, embedder(), 16)
        .await
        .err()
        .unwrap();
    assert!(matches!(
        err.downcast_ref::<IndexError>(),
        Some(IndexError::NotFound(_))
    ));
    assert_eq!(site.checkpoint.get().unwrap(), DateTime::<Utc>::UNIX_EPOCH);

    let index = SqliteVectorIndex::open(&site.index_path, embedder(), 16)
        .await
        .unwrap();
    ingest(
        &index,
        &site.checkpoint,
        &site.content,
        &ScanOptions::default(),
        &ChunkingConfig::default(),
        false,
    )
    .await
    .unwrap();

    let loaded = SqliteVectorIndex::load(&site.index_path, embedder(), 16)
        .await
        .unwrap();
    assert_eq!(loaded.len().await, index.len().await);
    assert!(site.checkpoint.get().unwrap() > DateTime::<Utc>::UNIX_EPOCH);
}

#[tokio::test]
async fn emptied_file_loses_its_chunks() {
    let site = site();
    let chunking = ChunkingConfig::default();
    let options = ScanOptions::default();

    let index = SqliteVectorIndex::open(&site.index_path, embedder(), 16)
        .await
        .unwrap();
    ingest(&index, &site.checkpoint, &site.content, &options, &chunking, false)
        .await
        .unwrap();
    let before = index.len().await;

    let later = SystemTime::from(site.checkpoint.get().unwrap()) + Duration::from_secs(60);
    let manaburn = site.content.join("experiences/manaburn.md");
    write_with_mtime(&manaburn, "", later);
    let report = ingest(&index, &site.checkpoint, &site.content, &options, &chunking, false)
        .await
        .unwrap();
    assert_eq!(report.files_ingested, 1);
    assert_eq!(report.chunks_embedded, 0);
    assert_eq!(index.len().await, before - 1);
    drop(index);

    let loaded = SqliteVectorIndex::load(&site.index_path, embedder(), 16)
        .await
        .unwrap();
    assert_eq!(loaded.len().await, before - 1);
    let hits = loaded.search("ManaBurn AWS", 10, None).await.unwrap();
    assert!(hits
        .iter()
        .all(|h| !h.chunk.source_path.ends_with("experiences/manaburn.md")));
}

fn hash_config(tmp: &Path, fail_fast: bool) -> Config {
    parse_config(&format!(
        r#"
[content]
root = "{root}"

[index]
path = "{data}/index.sqlite"

[embedding]
provider = "hash"

[ingest]
fail_fast = {fail_fast}
"#,
        root = tmp.join("content").display(),
        data = tmp.join("data").display(),
        fail_fast = fail_fast,
    ))
    .unwrap()
}

#[tokio::test]
async fn failed_full_rebuild_is_retried_from_scratch() {
    let tmp = TempDir::new().unwrap();
    let past = SystemTime::now() - Duration::from_secs(3600);
    let content = tmp.path().join("content");
    write_with_mtime(&content.join("posts/a.md"), "About rust.", past);
    write_with_mtime(&content.join("posts/b.md"), "About python.", past);
    let config = hash_config(tmp.path(), true);

    let (first, size) = rebuild(&config, false).await.unwrap();
    assert_eq!(first.files_ingested, 2);
    assert_eq!(size, 2);

    // The full rebuild discards the old index, then aborts on the bad file.
    let bad = content.join("posts/bad.pdf");
    write_with_mtime(&bad, "not a pdf", past);
    assert!(rebuild(&config, true).await.is_err());

    fs::remove_file(&bad).unwrap();
    let (retry, size) = rebuild(&config, false).await.unwrap();
    assert_eq!(retry.files_ingested, 2);
    assert_eq!(size, 2);

    let loaded = SqliteVectorIndex::load(&config.index.path, embedder(), 16)
        .await
        .unwrap();
    assert_eq!(loaded.len().await, 2);
}
