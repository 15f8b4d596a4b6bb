//! Core data types that flow through ingestion and question answering.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Kind of a recognized content file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    /// Markdown and MDX; text is the raw file content.
    Markdown,
    Pdf,
}

impl ContentKind {
    /// Map a file extension (without the dot, any case) to a kind.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "md" | "mdx" => Some(ContentKind::Markdown),
            "pdf" => Some(ContentKind::Pdf),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Markdown => "markdown",
            ContentKind::Pdf => "pdf",
        }
    }
}

/// A content file turned into text, ready to chunk.
#[derive(Debug, Clone)]
pub struct ContentRecord {
    pub path: PathBuf,
    pub kind: ContentKind,
    pub modified_at: DateTime<Utc>,
    pub raw_text: String,
}

/// A window of a record's text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub source_path: String,
    pub text: String,
    pub ordinal: i64,
    /// SHA-256 of `text`, hex encoded.
    pub hash: String,
}

/// A chunk returned from the index with its cosine similarity to the query.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub similarity: f32,
}

/// Where an answer's supporting text came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievedSource {
    pub source_path: String,
    pub similarity: Option<f32>,
}

impl From<&ScoredChunk> for RetrievedSource {
    fn from(sc: &ScoredChunk) -> Self {
        RetrievedSource {
            source_path: sc.chunk.source_path.clone(),
            similarity: Some(sc.similarity),
        }
    }
}

/// Heuristic confidence in an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum ConfidenceLabel {
    Low,
    #[serde(rename = "Low-Medium")]
    LowMedium,
    Medium,
    High,
}

impl std::fmt::Display for ConfidenceLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ConfidenceLabel::Low => "Low",
            ConfidenceLabel::LowMedium => "Low-Medium",
            ConfidenceLabel::Medium => "Medium",
            ConfidenceLabel::High => "High",
        };
        f.write_str(s)
    }
}

/// A question from a caller, optionally paying with their own key.
#[derive(Debug, Clone, Deserialize)]
pub struct QueryRequest {
    pub question: String,
    #[serde(default, rename = "userApiKey")]
    pub caller_api_key: Option<String>,
}

/// The assembled result of the question pipeline.
#[derive(Debug, Clone)]
pub struct AnswerResult {
    pub text: String,
    pub sources: Vec<RetrievedSource>,
    pub confidence_label: Option<ConfidenceLabel>,
}
