//! Question → relevant chunks, plus the `prag search` command.

use anyhow::Result;

use crate::config::Config;
use crate::context::AppContext;
use crate::index::VectorIndex;
use crate::models::ScoredChunk;

/// Top `k` chunks for `question` at or above `min_similarity`, best first.
pub async fn retrieve(
    index: &dyn VectorIndex,
    question: &str,
    k: usize,
    min_similarity: Option<f32>,
) -> Result<Vec<ScoredChunk>> {
    let results = index.search(question, k, min_similarity).await?;
    tracing::debug!(
        k,
        min_similarity = ?min_similarity,
        hits = results.len(),
        "retrieved chunks"
    );
    Ok(results)
}

/// `prag search`: print what retrieval returns for a query.
pub async fn run_search(
    config: &Config,
    query: &str,
    k: Option<usize>,
    min_similarity: Option<f32>,
) -> Result<()> {
    let ctx = AppContext::from_config(config.clone())?;
    let index = ctx.index().await?;

    let k = k.unwrap_or(config.retrieval.k);
    let min_similarity = min_similarity.or(config.retrieval.min_similarity);
    let results = retrieve(index.as_ref(), query, k, min_similarity).await?;

    if results.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for (i, r) in results.iter().enumerate() {
        println!(
            "{}. [{:.3}] {} #{}",
            i + 1,
            r.similarity,
            r.chunk.source_path,
            r.chunk.ordinal
        );
        let snippet: String = r.chunk.text.chars().take(200).collect();
        println!("    {}", snippet.replace('\n', " "));
        println!();
    }

    Ok(())
}
