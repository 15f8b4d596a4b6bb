//! # Portfolio RAG
//!
//! Retrieval-augmented question answering over a personal portfolio site.
//!
//! Markdown, MDX and PDF files from the site's content tree are chunked,
//! embedded and kept in a small vector index. Questions about the site's
//! owner are filtered for topic, answered by a hosted chat model from the
//! most similar chunks, and returned with source links and a confidence note.
//!
//! ## Architecture
//!
//! ```text
//! ingest (offline)                          query (per request)
//! ┌─────────┐  ┌───────┐  ┌────────────┐    ┌────────┐  ┌──────────┐  ┌──────────┐
//! │ scanner │─▶│ chunk │─▶│   index    │◀───│ filter │─▶│ retrieve │─▶│ generate │
//! │ extract │  └───────┘  │ (SQLite)   │    └────────┘  └──────────┘  └────┬─────┘
//! └────┬────┘             └────────────┘                                   ▼
//!      │ checkpoint                                   summarize · links · confidence
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration and environment overrides |
//! | [`error`] | Typed errors for extraction, index and generation |
//! | [`logging`] | Tracing subscriber setup |
//! | [`models`] | Core data types |
//! | [`extract`] | Markdown/PDF text extraction |
//! | [`scanner`] | Content tree walk filtered by checkpoint |
//! | [`checkpoint`] | Last-rebuild timestamp |
//! | [`chunk`] | Fixed-window character chunking |
//! | [`embedding`] | Embedding providers and vector helpers |
//! | [`index`] | Vector index trait, SQLite and in-memory stores |
//! | [`ingest`] | Rebuild orchestration |
//! | [`retrieve`] | Similarity retrieval and `prag search` |
//! | [`prompt`] | Persona prompt template |
//! | [`generate`] | Chat-completions adapter |
//! | [`filter`] | Topic filter |
//! | [`confidence`] | Confidence heuristic |
//! | [`links`] | Source path → public URL formatting |
//! | [`summarize`] | Best-effort answer compression |
//! | [`pipeline`] | End-to-end question answering |
//! | [`context`] | Shared per-process handles |
//! | [`server`] | HTTP API |

pub mod checkpoint;
pub mod chunk;
pub mod confidence;
pub mod config;
pub mod context;
pub mod embedding;
pub mod error;
pub mod extract;
pub mod filter;
pub mod generate;
pub mod index;
pub mod ingest;
pub mod links;
pub mod logging;
pub mod models;
pub mod pipeline;
pub mod prompt;
pub mod retrieve;
pub mod scanner;
pub mod server;
pub mod summarize;
