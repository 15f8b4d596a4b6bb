//! End-to-end HTTP tests with a stub index and a stub chat model.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::net::TcpListener;

use portfolio_rag::config::{parse_config, Config};
use portfolio_rag::context::AppContext;
use portfolio_rag::embedding::{Embedder, HashEmbedder};
use portfolio_rag::error::GenerationError;
use portfolio_rag::generate::{ChatModel, CompletionRequest};
use portfolio_rag::index::VectorIndex;
use portfolio_rag::models::{Chunk, ScoredChunk};
use portfolio_rag::server;

/// Returns the same three chunks for every query.
struct FixedIndex;

#[async_trait]
impl VectorIndex for FixedIndex {
    async fn upsert(&self, _chunks: &[Chunk]) -> anyhow::Result<usize> {
        Ok(0)
    }

    async fn remove_source(&self, _source_path: &str) -> anyhow::Result<usize> {
        Ok(0)
    }

    async fn search(
        &self,
        _query: &str,
        k: usize,
        _min_similarity: Option<f32>,
    ) -> anyhow::Result<Vec<ScoredChunk>> {
        let chunks = [
            ("/site/src/content/experiences/manaburn.md", 0.91),
            ("/site/src/content/posts/post-2025-06-23.mdx", 0.84),
            ("/site/src/content/experiences/manaburn.md", 0.80),
        ];
        Ok(chunks
            .iter()
            .enumerate()
            .take(k)
            .map(|(i, (path, similarity))| ScoredChunk {
                chunk: Chunk {
                    source_path: path.to_string(),
                    text: format!("fixed chunk {}", i),
                    ordinal: i as i64,
                    hash: String::new(),
                },
                similarity: *similarity,
            })
            .collect())
    }

    async fn persist(&self) -> anyhow::Result<()> {
        Ok(())
    }

    async fn len(&self) -> usize {
        3
    }
}

/// Answers with the length of the prompt it was given.
struct EchoLength;

#[async_trait]
impl ChatModel for EchoLength {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, GenerationError> {
        Ok(format!("prompt length {}", request.prompt.len()))
    }
}

fn config() -> Config {
    let mut cfg = parse_config(
        r#"
[content]
root = "/site/src/content"

[index]
path = "/nonexistent/index.sqlite"
"#,
    )
    .unwrap();
    cfg.api_key = Some("sk-server".to_string());
    cfg
}

async fn start(ctx: AppContext) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(server::serve(listener, Arc::new(ctx)));
    format!("http://{}", addr)
}

async fn start_with_stubs() -> String {
    let embedder: Arc<dyn Embedder> = Arc::new(HashEmbedder::default());
    let index: Arc<dyn VectorIndex> = Arc::new(FixedIndex);
    let ctx = AppContext::new(config(), embedder, Arc::new(EchoLength), Some(index)).unwrap();
    start(ctx).await
}

#[tokio::test]
async fn ask_returns_answer_sources_and_confidence() {
    let base = start_with_stubs().await;
    let resp = reqwest::Client::new()
        .post(format!("{}/ask", base))
        .json(&json!({ "question": "Tell me about your experience at ManaBurn" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let body: Value = resp.json().await.unwrap();
    let sources = body["sources"].as_array().unwrap();
    assert_eq!(sources.len(), 3);
    assert_eq!(sources[0], "/site/src/content/experiences/manaburn.md");

    let confidence = body["confidence"].as_str().unwrap();
    assert!(confidence == "High" || confidence == "Medium", "{}", confidence);

    let answer = body["answer"].as_str().unwrap();
    assert!(answer.starts_with("prompt length "));
    // Links are de-duplicated even though two chunks share a file.
    assert_eq!(answer.matches("/experiences/manaburn\"").count(), 1);
    assert!(answer.contains("/posts/post-2025-06-23\""));
    assert!(answer.contains("*Free response powered by GPT-4o-mini*"));
    assert!(answer.contains(&format!("**Confidence: {}**", confidence)));
}

#[tokio::test]
async fn off_topic_question_is_refused() {
    let base = start_with_stubs().await;
    let body: Value = reqwest::Client::new()
        .post(format!("{}/ask", base))
        .json(&json!({ "question": "What's the weather today?" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert!(body["answer"]
        .as_str()
        .unwrap()
        .starts_with("I can only answer questions about TC Heiner's experience"));
    assert_eq!(body["sources"], json!([]));
    assert!(body["confidence"].is_null());
}

#[tokio::test]
async fn empty_question_is_bad_request() {
    let base = start_with_stubs().await;
    let resp = reqwest::Client::new()
        .post(format!("{}/ask", base))
        .json(&json!({ "question": "   " }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "bad_request");
}

#[tokio::test]
async fn malformed_body_is_bad_request() {
    let base = start_with_stubs().await;
    let resp = reqwest::Client::new()
        .post(format!("{}/ask", base))
        .header("content-type", "application/json")
        .body("{\"q\": 1}")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn missing_index_is_a_server_error_without_details() {
    let embedder: Arc<dyn Embedder> = Arc::new(HashEmbedder::default());
    let ctx = AppContext::new(config(), embedder, Arc::new(EchoLength), None).unwrap();
    let base = start(ctx).await;

    let resp = reqwest::Client::new()
        .post(format!("{}/ask", base))
        .json(&json!({ "question": "What is your background?" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 500);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "index_not_found");
    assert!(!body.to_string().contains("/nonexistent"));
}

#[tokio::test]
async fn health_reports_healthy() {
    let base = start_with_stubs().await;
    let body: Value = reqwest::get(format!("{}/health", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn cors_allows_only_configured_origins() {
    let base = start_with_stubs().await;
    let client = reqwest::Client::new();

    let allowed = client
        .request(reqwest::Method::OPTIONS, format!("{}/ask", base))
        .header("Origin", "https://tcheiner.com")
        .header("Access-Control-Request-Method", "POST")
        .header("Access-Control-Request-Headers", "content-type")
        .send()
        .await
        .unwrap();
    assert_eq!(
        allowed
            .headers()
            .get("access-control-allow-origin")
            .and_then(|v| v.to_str().ok()),
        Some("https://tcheiner.com")
    );

    let denied = client
        .request(reqwest::Method::OPTIONS, format!("{}/ask", base))
        .header("Origin", "https://evil.example")
        .header("Access-Control-Request-Method", "POST")
        .send()
        .await
        .unwrap();
    assert!(denied.headers().get("access-control-allow-origin").is_none());
}
