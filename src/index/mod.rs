//! Vector index abstraction.
//!
//! The [`VectorIndex`] trait hides how chunk vectors are produced, stored and
//! searched. Implementations own an [`Embedder`]: callers hand in chunks and
//! query text, never vectors.
//!
//! | Implementation | Durability |
//! |----------------|------------|
//! | [`SqliteVectorIndex`] | rows in a SQLite file, loaded into memory for search |
//! | [`MemoryVectorIndex`] | none; dry runs and tests |
//!
//! Search is brute-force cosine similarity over every stored vector. The corpus
//! is a single person's portfolio, a few thousand chunks at most.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryVectorIndex;
pub use sqlite::SqliteVectorIndex;

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::collections::BTreeSet;

use crate::embedding::{cosine_similarity, Embedder};
use crate::models::{Chunk, ScoredChunk};

/// Similarity index over embedded chunks.
///
/// Upserts are incremental: adding chunks never rebuilds what is already
/// stored. Chunks are keyed by source path, so upserting a file's chunks
/// replaces whatever that file contributed before.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Embed `chunks` and add them, replacing earlier chunks from the same
    /// source paths. Returns the number of chunks added.
    async fn upsert(&self, chunks: &[Chunk]) -> Result<usize>;

    /// Drop every chunk of `source_path`. Returns the number removed.
    async fn remove_source(&self, source_path: &str) -> Result<usize>;

    /// Top `k` chunks by cosine similarity to `query`, descending, dropping any
    /// below `min_similarity`.
    async fn search(
        &self,
        query: &str,
        k: usize,
        min_similarity: Option<f32>,
    ) -> Result<Vec<ScoredChunk>>;

    /// Make every upsert so far durable. A no-op for non-persistent indexes.
    async fn persist(&self) -> Result<()>;

    /// Number of stored chunks.
    async fn len(&self) -> usize;

    async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// A chunk with its embedding, as held in memory by the index implementations.
#[derive(Debug, Clone)]
pub(crate) struct Entry {
    pub chunk: Chunk,
    pub vector: Vec<f32>,
}

/// Embed chunks `batch_size` at a time.
pub(crate) async fn embed_chunks(
    embedder: &dyn Embedder,
    chunks: &[Chunk],
    batch_size: usize,
) -> Result<Vec<Entry>> {
    let mut entries = Vec::with_capacity(chunks.len());

    for batch in chunks.chunks(batch_size.max(1)) {
        let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
        let vectors = embedder.embed(&texts).await?;
        if vectors.len() != batch.len() {
            bail!(
                "Embedder returned {} vectors for {} chunks",
                vectors.len(),
                batch.len()
            );
        }
        tracing::debug!(count = batch.len(), model = embedder.model_name(), "embedded batch");

        entries.extend(
            batch
                .iter()
                .cloned()
                .zip(vectors)
                .map(|(chunk, vector)| Entry { chunk, vector }),
        );
    }

    Ok(entries)
}

/// Drop stored entries for every source path in `incoming`, then append it.
/// Returns the set of affected source paths.
pub(crate) fn replace_sources(entries: &mut Vec<Entry>, incoming: Vec<Entry>) -> BTreeSet<String> {
    let paths: BTreeSet<String> = incoming
        .iter()
        .map(|e| e.chunk.source_path.clone())
        .collect();
    entries.retain(|e| !paths.contains(&e.chunk.source_path));
    entries.extend(incoming);
    paths
}

/// Drop stored entries for `source_path`, returning how many went.
pub(crate) fn drop_source(entries: &mut Vec<Entry>, source_path: &str) -> usize {
    let before = entries.len();
    entries.retain(|e| e.chunk.source_path != source_path);
    before - entries.len()
}

/// Score every entry against `query_vec` and keep the best `k`.
///
/// Ties keep insertion order.
pub(crate) fn rank(
    entries: &[Entry],
    query_vec: &[f32],
    k: usize,
    min_similarity: Option<f32>,
) -> Vec<ScoredChunk> {
    let mut scored: Vec<ScoredChunk> = entries
        .iter()
        .map(|e| ScoredChunk {
            chunk: e.chunk.clone(),
            similarity: cosine_similarity(query_vec, &e.vector),
        })
        .filter(|sc| min_similarity.map_or(true, |min| sc.similarity >= min))
        .collect();

    scored.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
    scored.truncate(k);
    scored
}
