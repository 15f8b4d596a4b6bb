//! Composition root for the query path.
//!
//! An [`AppContext`] is built once per process (by `prag serve` or `prag ask`)
//! and shared by reference. It owns the configured embedder, chat model, topic
//! filter and prompt template. The vector index is loaded on first use and then
//! reused by every request.

use anyhow::Result;
use std::sync::Arc;
use tokio::sync::OnceCell;

use crate::config::Config;
use crate::embedding::{create_embedder, Embedder};
use crate::filter::TopicFilter;
use crate::generate::{ChatModel, OpenAIChatModel};
use crate::index::{SqliteVectorIndex, VectorIndex};
use crate::prompt::PromptTemplate;

pub struct AppContext {
    pub config: Config,
    pub embedder: Arc<dyn Embedder>,
    pub chat: Arc<dyn ChatModel>,
    pub filter: TopicFilter,
    pub template: PromptTemplate,
    index: OnceCell<Arc<dyn VectorIndex>>,
}

impl AppContext {
    /// Build the production context: configured embedder, OpenAI chat model,
    /// and the on-disk index (loaded lazily).
    pub fn from_config(config: Config) -> Result<Self> {
        let embedder = create_embedder(&config.embedding, config.api_key.as_deref())?;
        let chat: Arc<dyn ChatModel> = Arc::new(OpenAIChatModel::new(&config.generation)?);
        Self::new(config, embedder, chat, None)
    }

    /// Build a context from explicit parts. A `Some` index is used as-is
    /// instead of loading one from `config.index.path`.
    pub fn new(
        config: Config,
        embedder: Arc<dyn Embedder>,
        chat: Arc<dyn ChatModel>,
        index: Option<Arc<dyn VectorIndex>>,
    ) -> Result<Self> {
        let filter = TopicFilter::from_persona(&config.persona)?;
        let template = PromptTemplate::from_persona(&config.persona);
        let cell = match index {
            Some(index) => OnceCell::new_with(Some(index)),
            None => OnceCell::new(),
        };

        Ok(Self {
            config,
            embedder,
            chat,
            filter,
            template,
            index: cell,
        })
    }

    /// The shared vector index, loading it on first call.
    ///
    /// A failed load is not cached; the next call tries again, so an index
    /// built after the server started is picked up.
    pub async fn index(&self) -> Result<Arc<dyn VectorIndex>> {
        let index = self
            .index
            .get_or_try_init(|| async {
                let loaded = SqliteVectorIndex::load(
                    &self.config.index.path,
                    self.embedder.clone(),
                    self.config.embedding.batch_size,
                )
                .await?;
                let chunks = loaded.len().await;
                tracing::info!(
                    path = %self.config.index.path.display(),
                    chunks,
                    "vector index loaded"
                );
                Ok::<Arc<dyn VectorIndex>, anyhow::Error>(Arc::new(loaded))
            })
            .await?;
        Ok(index.clone())
    }
}
