//! Typed errors for the seams callers branch on.
//!
//! Orchestration code (ingestion, CLI, configuration) uses `anyhow`; these
//! enums exist where a caller needs to tell failures apart: a file that must
//! be skipped, an index that was never built, or an upstream model failure
//! that has to be reported without leaking its details.

use std::path::PathBuf;
use thiserror::Error;

/// A content file could not be turned into text.
///
/// Fatal to that file's inclusion in a scan, never to the scan itself
/// (unless `ingest.fail_fast` is set).
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// The file kind needs a capability this build does not have.
    #[error("unsupported content: {0}")]
    Unsupported(String),

    #[error("PDF extraction failed: {0}")]
    Pdf(String),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Vector index failures.
#[derive(Debug, Error)]
pub enum IndexError {
    /// No index has been persisted at this location yet.
    #[error("vector index not found at {0} (run `prag ingest` first)")]
    NotFound(PathBuf),

    #[error("index was built with embedding model '{found}', but '{expected}' is configured")]
    ModelMismatch { expected: String, found: String },

    #[error("vector index error: {0}")]
    Store(String),
}

impl From<sqlx::Error> for IndexError {
    fn from(err: sqlx::Error) -> Self {
        IndexError::Store(err.to_string())
    }
}

/// A text-generation call failed.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("no API key available for the generation service")]
    MissingApiKey,

    #[error("generation service returned {status}: {message}")]
    Upstream { status: u16, message: String },

    #[error("generation request failed: {0}")]
    Transport(String),

    #[error("invalid generation response: {0}")]
    InvalidResponse(String),
}

impl GenerationError {
    /// Whether this failure is attributable to the API key the caller used.
    ///
    /// Matches on the upstream message text as well as the status, since some
    /// providers report a bad key with a generic 4xx.
    pub fn is_auth_failure(&self) -> bool {
        match self {
            GenerationError::MissingApiKey => true,
            GenerationError::Upstream { status, .. } if *status == 401 => true,
            other => {
                let msg = other.to_string().to_lowercase();
                msg.contains("api") && msg.contains("key")
            }
        }
    }
}
