//! Ingestion pipeline orchestration.
//!
//! Coordinates one rebuild: checkpoint → scan → chunk → embed/upsert →
//! persist → checkpoint. The checkpoint only moves after the index has been
//! persisted, so a failed run re-ingests the same files next time.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::path::Path;

use crate::checkpoint::CheckpointStore;
use crate::chunk;
use crate::config::{ChunkingConfig, Config};
use crate::embedding::create_embedder;
use crate::index::{SqliteVectorIndex, VectorIndex};
use crate::scanner::{self, ScanOptions, SkippedFile};

/// What a rebuild did.
#[derive(Debug)]
pub struct IngestReport {
    /// Files modified after the checkpoint and extracted successfully.
    pub files_ingested: usize,
    pub files_unchanged: usize,
    pub skipped: Vec<SkippedFile>,
    pub chunks_embedded: usize,
    /// The new checkpoint. For a dry run, the checkpoint that would have been read.
    pub checkpoint: DateTime<Utc>,
}

/// Run one incremental (or, with `full`, complete) rebuild into `index`.
///
/// The new checkpoint is the time the scan started; files changed while the
/// run is in progress are picked up again next time.
pub async fn ingest(
    index: &dyn VectorIndex,
    checkpoint: &CheckpointStore,
    root: &Path,
    scan_options: &ScanOptions,
    chunking: &ChunkingConfig,
    full: bool,
) -> Result<IngestReport> {
    let started_at = Utc::now();
    let since = if full {
        DateTime::<Utc>::UNIX_EPOCH
    } else {
        checkpoint.get()?
    };
    tracing::info!(root = %root.display(), %since, full, "scanning content");

    let scan = scanner::scan(root, since, scan_options)?;

    let mut chunks_embedded = 0usize;
    for record in &scan.records {
        let chunks = chunk::split(record, chunking.window_size, chunking.overlap);
        if chunks.is_empty() {
            // No text left: drop whatever the file contributed before.
            let source_path = record.path.to_string_lossy();
            let removed = index
                .remove_source(&source_path)
                .await
                .with_context(|| format!("Failed to clear {}", record.path.display()))?;
            tracing::debug!(path = %record.path.display(), removed, "file has no text");
            continue;
        }
        let added = index
            .upsert(&chunks)
            .await
            .with_context(|| format!("Failed to index {}", record.path.display()))?;
        tracing::debug!(path = %record.path.display(), chunks = added, "indexed file");
        chunks_embedded += added;
    }

    index.persist().await?;
    checkpoint.set(started_at)?;

    Ok(IngestReport {
        files_ingested: scan.records.len(),
        files_unchanged: scan.unchanged,
        skipped: scan.skipped,
        chunks_embedded,
        checkpoint: started_at,
    })
}

/// Scan and chunk without embedding or writing anything.
pub fn plan(
    checkpoint: &CheckpointStore,
    root: &Path,
    scan_options: &ScanOptions,
    chunking: &ChunkingConfig,
    full: bool,
) -> Result<IngestReport> {
    let since = if full {
        DateTime::<Utc>::UNIX_EPOCH
    } else {
        checkpoint.get()?
    };
    let scan = scanner::scan(root, since, scan_options)?;
    let chunks = scan
        .records
        .iter()
        .map(|r| chunk::split(r, chunking.window_size, chunking.overlap).len())
        .sum();

    Ok(IngestReport {
        files_ingested: scan.records.len(),
        files_unchanged: scan.unchanged,
        skipped: scan.skipped,
        chunks_embedded: chunks,
        checkpoint: since,
    })
}

/// `prag ingest`: rebuild the on-disk index from the configured content root.
pub async fn run_ingest(config: &Config, full: bool, dry_run: bool) -> Result<()> {
    let checkpoint = CheckpointStore::new(config.index.checkpoint_path());
    let scan_options = ScanOptions::from_config(config);

    if dry_run {
        let report = plan(
            &checkpoint,
            &config.content.root,
            &scan_options,
            &config.chunking,
            full,
        )?;
        println!("ingest (dry-run)");
        println!("  since: {}", report.checkpoint.to_rfc3339());
        println!("  files to ingest: {}", report.files_ingested);
        println!("  files unchanged: {}", report.files_unchanged);
        print_skipped(&report.skipped);
        println!("  estimated chunks: {}", report.chunks_embedded);
        return Ok(());
    }

    let (report, index_size) = rebuild(config, full).await?;

    println!("ingest");
    println!("  files ingested: {}", report.files_ingested);
    println!("  files unchanged: {}", report.files_unchanged);
    print_skipped(&report.skipped);
    println!("  chunks embedded: {}", report.chunks_embedded);
    println!("  index size: {} chunks", index_size);
    println!("  checkpoint: {}", report.checkpoint.to_rfc3339());
    println!("ok");
    Ok(())
}

/// Ingest into the configured on-disk index. Returns the report and the
/// resulting index size.
///
/// A full rebuild clears the checkpoint before discarding the old index, so a
/// failed rebuild is retried from scratch by the next run of either kind.
pub async fn rebuild(config: &Config, full: bool) -> Result<(IngestReport, usize)> {
    let checkpoint = CheckpointStore::new(config.index.checkpoint_path());
    let scan_options = ScanOptions::from_config(config);
    let embedder = create_embedder(&config.embedding, config.api_key.as_deref())?;
    let batch_size = config.embedding.batch_size;

    let index = if full {
        checkpoint.reset()?;
        SqliteVectorIndex::recreate(&config.index.path, embedder, batch_size).await?
    } else {
        SqliteVectorIndex::open(&config.index.path, embedder, batch_size).await?
    };

    let report = ingest(
        &index,
        &checkpoint,
        &config.content.root,
        &scan_options,
        &config.chunking,
        full,
    )
    .await?;
    let index_size = index.len().await;

    Ok((report, index_size))
}

fn print_skipped(skipped: &[SkippedFile]) {
    println!("  files skipped: {}", skipped.len());
    for s in skipped {
        println!("    {}: {}", s.path.display(), s.reason);
    }
}
