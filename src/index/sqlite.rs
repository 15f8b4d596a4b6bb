//! SQLite-backed [`VectorIndex`].
//!
//! All chunks and their vectors are loaded into memory on open and searched
//! there. Upserts go to memory first; [`persist`](VectorIndex::persist) writes
//! every touched source path back in a single transaction.
//!
//! # Schema
//!
//! ```sql
//! index_meta(key TEXT PRIMARY KEY, value TEXT)      -- model, dimensions
//! chunks(id, source_path, ordinal, text, hash, embedding BLOB)
//! ```
//!
//! Vectors are little-endian `f32` BLOBs (see [`vec_to_blob`]).

use anyhow::Result;
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::embedding::{blob_to_vec, vec_to_blob, Embedder};
use crate::error::IndexError;
use crate::models::{Chunk, ScoredChunk};

use super::{drop_source, embed_chunks, rank, replace_sources, Entry, VectorIndex};

#[derive(Default)]
struct State {
    entries: Vec<Entry>,
    /// Source paths changed since the last persist.
    dirty: BTreeSet<String>,
}

/// Persistent vector index stored in one SQLite file.
pub struct SqliteVectorIndex {
    path: PathBuf,
    pool: SqlitePool,
    embedder: Arc<dyn Embedder>,
    batch_size: usize,
    state: RwLock<State>,
}

impl SqliteVectorIndex {
    /// Open the index at `path`, creating an empty one if none exists.
    pub async fn open(path: &Path, embedder: Arc<dyn Embedder>, batch_size: usize) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let pool = connect(path, true).await?;
        migrate(&pool).await?;
        Self::from_pool(path, pool, embedder, batch_size).await
    }

    /// Load a previously persisted index.
    ///
    /// Fails with [`IndexError::NotFound`] if nothing has ever been persisted at
    /// `path`, and [`IndexError::ModelMismatch`] if it was built with another
    /// embedding model.
    pub async fn load(path: &Path, embedder: Arc<dyn Embedder>, batch_size: usize) -> Result<Self> {
        if !path.exists() {
            return Err(IndexError::NotFound(path.to_path_buf()).into());
        }
        let pool = connect(path, false).await?;

        let meta_exists: bool = sqlx::query_scalar(
            "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name='index_meta'",
        )
        .fetch_one(&pool)
        .await
        .map_err(IndexError::from)?;
        if !meta_exists || read_meta(&pool, "model").await?.is_none() {
            pool.close().await;
            return Err(IndexError::NotFound(path.to_path_buf()).into());
        }

        Self::from_pool(path, pool, embedder, batch_size).await
    }

    /// Discard any index at `path` and start an empty one.
    pub async fn recreate(
        path: &Path,
        embedder: Arc<dyn Embedder>,
        batch_size: usize,
    ) -> Result<Self> {
        for suffix in ["", "-wal", "-shm"] {
            let file = PathBuf::from(format!("{}{}", path.display(), suffix));
            if file.exists() {
                std::fs::remove_file(&file)?;
            }
        }
        Self::open(path, embedder, batch_size).await
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn from_pool(
        path: &Path,
        pool: SqlitePool,
        embedder: Arc<dyn Embedder>,
        batch_size: usize,
    ) -> Result<Self> {
        if let Some(found) = read_meta(&pool, "model").await? {
            if found != embedder.model_name() {
                return Err(IndexError::ModelMismatch {
                    expected: embedder.model_name().to_string(),
                    found,
                }
                .into());
            }
        }

        let rows: Vec<(String, i64, String, String, Vec<u8>)> = sqlx::query_as(
            "SELECT source_path, ordinal, text, hash, embedding FROM chunks ORDER BY id",
        )
        .fetch_all(&pool)
        .await
        .map_err(IndexError::from)?;

        let entries: Vec<Entry> = rows
            .into_iter()
            .map(|(source_path, ordinal, text, hash, blob)| Entry {
                chunk: Chunk {
                    source_path,
                    text,
                    ordinal,
                    hash,
                },
                vector: blob_to_vec(&blob),
            })
            .collect();

        tracing::debug!(path = %path.display(), chunks = entries.len(), "vector index opened");

        Ok(Self {
            path: path.to_path_buf(),
            pool,
            embedder,
            batch_size,
            state: RwLock::new(State {
                entries,
                dirty: BTreeSet::new(),
            }),
        })
    }
}

#[async_trait]
impl VectorIndex for SqliteVectorIndex {
    async fn upsert(&self, chunks: &[Chunk]) -> Result<usize> {
        if chunks.is_empty() {
            return Ok(0);
        }
        let incoming = embed_chunks(self.embedder.as_ref(), chunks, self.batch_size).await?;
        let added = incoming.len();

        let mut state = self.state.write().await;
        let touched = replace_sources(&mut state.entries, incoming);
        state.dirty.extend(touched);
        Ok(added)
    }

    async fn remove_source(&self, source_path: &str) -> Result<usize> {
        let mut state = self.state.write().await;
        let removed = drop_source(&mut state.entries, source_path);
        state.dirty.insert(source_path.to_string());
        Ok(removed)
    }

    async fn search(
        &self,
        query: &str,
        k: usize,
        min_similarity: Option<f32>,
    ) -> Result<Vec<ScoredChunk>> {
        let query_vec = self.embedder.embed_one(query).await?;
        let state = self.state.read().await;
        Ok(rank(&state.entries, &query_vec, k, min_similarity))
    }

    async fn persist(&self) -> Result<()> {
        let mut state = self.state.write().await;
        let mut tx = self.pool.begin().await.map_err(IndexError::from)?;

        for source_path in &state.dirty {
            sqlx::query("DELETE FROM chunks WHERE source_path = ?")
                .bind(source_path)
                .execute(&mut *tx)
                .await
                .map_err(IndexError::from)?;
        }

        let mut written = 0usize;
        for entry in state
            .entries
            .iter()
            .filter(|e| state.dirty.contains(&e.chunk.source_path))
        {
            sqlx::query(
                "INSERT INTO chunks (source_path, ordinal, text, hash, embedding) VALUES (?, ?, ?, ?, ?)",
            )
            .bind(&entry.chunk.source_path)
            .bind(entry.chunk.ordinal)
            .bind(&entry.chunk.text)
            .bind(&entry.chunk.hash)
            .bind(vec_to_blob(&entry.vector))
            .execute(&mut *tx)
            .await
            .map_err(IndexError::from)?;
            written += 1;
        }

        sqlx::query(
            "INSERT INTO index_meta (key, value) VALUES ('model', ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        )
        .bind(self.embedder.model_name())
        .execute(&mut *tx)
        .await
        .map_err(IndexError::from)?;

        if let Some(first) = state.entries.first() {
            sqlx::query(
                "INSERT INTO index_meta (key, value) VALUES ('dimensions', ?)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            )
            .bind(first.vector.len().to_string())
            .execute(&mut *tx)
            .await
            .map_err(IndexError::from)?;
        }

        tx.commit().await.map_err(IndexError::from)?;

        tracing::info!(
            path = %self.path.display(),
            sources = state.dirty.len(),
            chunks = written,
            "vector index persisted"
        );
        state.dirty.clear();
        Ok(())
    }

    async fn len(&self) -> usize {
        self.state.read().await.entries.len()
    }
}

async fn connect(path: &Path, create: bool) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))
        .map_err(IndexError::from)?
        .create_if_missing(create)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .map_err(IndexError::from)?;

    Ok(pool)
}

async fn migrate(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS index_meta (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(IndexError::from)?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS chunks (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            source_path TEXT NOT NULL,
            ordinal INTEGER NOT NULL,
            text TEXT NOT NULL,
            hash TEXT NOT NULL,
            embedding BLOB NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(IndexError::from)?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_chunks_source ON chunks(source_path)")
        .execute(pool)
        .await
        .map_err(IndexError::from)?;

    Ok(())
}

async fn read_meta(pool: &SqlitePool, key: &str) -> Result<Option<String>> {
    let value: Option<String> = sqlx::query_scalar("SELECT value FROM index_meta WHERE key = ?")
        .bind(key)
        .fetch_optional(pool)
        .await
        .map_err(IndexError::from)?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::chunk_text;
    use crate::embedding::HashEmbedder;
    use tempfile::TempDir;

    fn embedder() -> Arc<dyn Embedder> {
        Arc::new(HashEmbedder::default())
    }

    #[tokio::test]
    async fn load_before_persist_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("index.sqlite");

        let err = SqliteVectorIndex::load(&path, embedder(), 8)
            .await
            .err()
            .unwrap();
        assert!(matches!(
            err.downcast_ref::<IndexError>(),
            Some(IndexError::NotFound(_))
        ));

        // Opened but never persisted still counts as missing.
        let _index = SqliteVectorIndex::open(&path, embedder(), 8).await.unwrap();
        let err = SqliteVectorIndex::load(&path, embedder(), 8)
            .await
            .err()
            .unwrap();
        assert!(matches!(
            err.downcast_ref::<IndexError>(),
            Some(IndexError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn persist_then_load_round_trips_chunks() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("index.sqlite");

        let index = SqliteVectorIndex::open(&path, embedder(), 8).await.unwrap();
        let chunks = chunk_text("projects/chatbot.md", "Portfolio chatbot built with Rust and axum", 1000, 200);
        index.upsert(&chunks).await.unwrap();
        index.persist().await.unwrap();
        drop(index);

        let loaded = SqliteVectorIndex::load(&path, embedder(), 8).await.unwrap();
        assert_eq!(loaded.len().await, 1);
        let results = loaded.search("chatbot rust", 5, None).await.unwrap();
        assert_eq!(results[0].chunk, chunks[0]);
    }

    #[tokio::test]
    async fn incremental_upsert_keeps_earlier_chunks() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("index.sqlite");

        let index = SqliteVectorIndex::open(&path, embedder(), 8).await.unwrap();
        index
            .upsert(&chunk_text("posts/a.md", "first post about rust", 1000, 200))
            .await
            .unwrap();
        index.persist().await.unwrap();
        drop(index);

        let index = SqliteVectorIndex::open(&path, embedder(), 8).await.unwrap();
        index
            .upsert(&chunk_text("posts/b.md", "second post about python", 1000, 200))
            .await
            .unwrap();
        index.persist().await.unwrap();
        drop(index);

        let loaded = SqliteVectorIndex::load(&path, embedder(), 8).await.unwrap();
        assert_eq!(loaded.len().await, 2);
    }

    #[tokio::test]
    async fn removed_source_stays_removed_after_reload() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("index.sqlite");

        let index = SqliteVectorIndex::open(&path, embedder(), 8).await.unwrap();
        index
            .upsert(&chunk_text("posts/a.md", "first post about rust", 1000, 200))
            .await
            .unwrap();
        index
            .upsert(&chunk_text("posts/b.md", "second post about python", 1000, 200))
            .await
            .unwrap();
        index.persist().await.unwrap();

        assert_eq!(index.remove_source("posts/a.md").await.unwrap(), 1);
        index.persist().await.unwrap();
        drop(index);

        let loaded = SqliteVectorIndex::load(&path, embedder(), 8).await.unwrap();
        assert_eq!(loaded.len().await, 1);
        let results = loaded.search("post", 5, None).await.unwrap();
        assert_eq!(results[0].chunk.source_path, "posts/b.md");
    }

    #[tokio::test]
    async fn different_model_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("index.sqlite");

        let index = SqliteVectorIndex::open(&path, embedder(), 8).await.unwrap();
        index.persist().await.unwrap();
        drop(index);

        let other: Arc<dyn Embedder> = Arc::new(crate::embedding::DisabledEmbedder);
        let err = SqliteVectorIndex::load(&path, other, 8).await.err().unwrap();
        assert!(matches!(
            err.downcast_ref::<IndexError>(),
            Some(IndexError::ModelMismatch { .. })
        ));
    }

    #[tokio::test]
    async fn recreate_discards_existing_rows() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("index.sqlite");

        let index = SqliteVectorIndex::open(&path, embedder(), 8).await.unwrap();
        index
            .upsert(&chunk_text("posts/a.md", "hello world", 1000, 200))
            .await
            .unwrap();
        index.persist().await.unwrap();
        index.pool.close().await;
        drop(index);

        let fresh = SqliteVectorIndex::recreate(&path, embedder(), 8).await.unwrap();
        assert!(fresh.is_empty().await);
    }
}
