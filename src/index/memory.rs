//! In-memory [`VectorIndex`] for dry runs and tests.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::embedding::Embedder;
use crate::models::{Chunk, ScoredChunk};

use super::{drop_source, embed_chunks, rank, replace_sources, Entry, VectorIndex};

/// Non-persistent index. `persist()` does nothing.
pub struct MemoryVectorIndex {
    embedder: Arc<dyn Embedder>,
    batch_size: usize,
    entries: RwLock<Vec<Entry>>,
}

impl MemoryVectorIndex {
    pub fn new(embedder: Arc<dyn Embedder>, batch_size: usize) -> Self {
        Self {
            embedder,
            batch_size,
            entries: RwLock::new(Vec::new()),
        }
    }
}

#[async_trait]
impl VectorIndex for MemoryVectorIndex {
    async fn upsert(&self, chunks: &[Chunk]) -> Result<usize> {
        if chunks.is_empty() {
            return Ok(0);
        }
        let incoming = embed_chunks(self.embedder.as_ref(), chunks, self.batch_size).await?;
        let added = incoming.len();
        replace_sources(&mut *self.entries.write().await, incoming);
        Ok(added)
    }

    async fn remove_source(&self, source_path: &str) -> Result<usize> {
        Ok(drop_source(&mut *self.entries.write().await, source_path))
    }

    async fn search(
        &self,
        query: &str,
        k: usize,
        min_similarity: Option<f32>,
    ) -> Result<Vec<ScoredChunk>> {
        let query_vec = self.embedder.embed_one(query).await?;
        let entries = self.entries.read().await;
        Ok(rank(&entries, &query_vec, k, min_similarity))
    }

    async fn persist(&self) -> Result<()> {
        Ok(())
    }

    async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}
