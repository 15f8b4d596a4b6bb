//! Persisted "last successful rebuild" timestamp.
//!
//! Stored as a single JSON object, `{"last_rebuild": "<ISO-8601>"}`. A missing
//! file reads as the Unix epoch, so the first ingestion picks up every file.
//! There is no locking: concurrent ingestion runs are unsupported.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize, Deserialize)]
struct CheckpointFile {
    last_rebuild: String,
}

/// Reads and writes the ingestion checkpoint file.
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    path: PathBuf,
}

impl CheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current checkpoint, or the epoch when none has been written.
    pub fn get(&self) -> Result<DateTime<Utc>> {
        if !self.path.exists() {
            return Ok(DateTime::<Utc>::UNIX_EPOCH);
        }
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read checkpoint: {}", self.path.display()))?;
        let file: CheckpointFile = serde_json::from_str(&content)
            .with_context(|| format!("Invalid checkpoint file: {}", self.path.display()))?;
        parse_timestamp(&file.last_rebuild)
    }

    /// Overwrite the checkpoint.
    pub fn set(&self, at: DateTime<Utc>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = CheckpointFile {
            last_rebuild: at.to_rfc3339(),
        };
        let json = serde_json::to_string(&file)?;
        std::fs::write(&self.path, json)
            .with_context(|| format!("Failed to write checkpoint: {}", self.path.display()))?;
        tracing::debug!(path = %self.path.display(), checkpoint = %file.last_rebuild, "checkpoint written");
        Ok(())
    }

    /// Forget the checkpoint so the next run re-ingests everything.
    pub fn reset(&self) -> Result<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)
                .with_context(|| format!("Failed to remove checkpoint: {}", self.path.display()))?;
        }
        Ok(())
    }
}

/// Accepts RFC 3339 and offset-less ISO-8601 (interpreted as UTC).
fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    let naive = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .with_context(|| format!("Invalid checkpoint timestamp: {}", s))?;
    Ok(naive.and_utc())
}
