//! TOML configuration with environment overrides.
//!
//! The file supplies everything except secrets. After parsing, a handful of
//! environment variables are applied on top (see [`apply_env_overrides`]);
//! a `.env` file in the working directory is honored by the binary.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub content: ContentConfig,
    pub index: IndexConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub summary: SummaryConfig,
    #[serde(default)]
    pub persona: PersonaConfig,
    #[serde(default)]
    pub confidence: ConfidenceConfig,
    #[serde(default)]
    pub links: LinksConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    /// Service API key, resolved from the environment. Never read from the file.
    #[serde(skip)]
    pub api_key: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ContentConfig {
    pub root: PathBuf,
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
    #[serde(default)]
    pub follow_symlinks: bool,
    #[serde(default)]
    pub strip_front_matter: bool,
}

fn default_extensions() -> Vec<String> {
    vec!["md".to_string(), "mdx".to_string(), "pdf".to_string()]
}

#[derive(Debug, Deserialize, Clone)]
pub struct IndexConfig {
    pub path: PathBuf,
    #[serde(default)]
    pub checkpoint_path: Option<PathBuf>,
}

impl IndexConfig {
    /// Checkpoint file location; defaults to `last_rebuild.json` beside the index.
    pub fn checkpoint_path(&self) -> PathBuf {
        match &self.checkpoint_path {
            Some(p) => p.clone(),
            None => self
                .path
                .parent()
                .map(|dir| dir.join("last_rebuild.json"))
                .unwrap_or_else(|| PathBuf::from("last_rebuild.json")),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_window_size")]
    pub window_size: usize,
    #[serde(default = "default_overlap")]
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            window_size: default_window_size(),
            overlap: default_overlap(),
        }
    }
}

fn default_window_size() -> usize {
    1000
}
fn default_overlap() -> usize {
    200
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_embedding_model")]
    pub model: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_embedding_model(),
            url: None,
            batch_size: default_batch_size(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_provider() -> String {
    "openai".to_string()
}
fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}
fn default_batch_size() -> usize {
    64
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_k")]
    pub k: usize,
    #[serde(default = "default_min_similarity")]
    pub min_similarity: Option<f32>,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            k: default_k(),
            min_similarity: default_min_similarity(),
        }
    }
}

fn default_k() -> usize {
    5
}
fn default_min_similarity() -> Option<f32> {
    Some(0.5)
}

#[derive(Debug, Deserialize, Clone)]
pub struct GenerationConfig {
    #[serde(default = "default_generation_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_generation_timeout")]
    pub timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: default_generation_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            base_url: default_base_url(),
            timeout_secs: default_generation_timeout(),
        }
    }
}

fn default_generation_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_temperature() -> f32 {
    0.3
}
fn default_max_tokens() -> u32 {
    400
}
fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_generation_timeout() -> u64 {
    60
}

#[derive(Debug, Deserialize, Clone)]
pub struct SummaryConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_threshold_chars")]
    pub threshold_chars: usize,
    #[serde(default = "default_summary_temperature")]
    pub temperature: f32,
    #[serde(default = "default_summary_max_tokens")]
    pub max_tokens: u32,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            threshold_chars: default_threshold_chars(),
            temperature: default_summary_temperature(),
            max_tokens: default_summary_max_tokens(),
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_threshold_chars() -> usize {
    600
}
fn default_summary_temperature() -> f32 {
    0.1
}
fn default_summary_max_tokens() -> u32 {
    200
}

#[derive(Debug, Deserialize, Clone)]
pub struct PersonaConfig {
    #[serde(default = "default_persona_name")]
    pub name: String,
    /// Lowercase terms that address the subject directly (name, initials).
    #[serde(default = "default_aliases")]
    pub aliases: Vec<String>,
    /// Replaces the built-in instruction header. `{name}` is substituted.
    #[serde(default)]
    pub instructions: Option<String>,
}

impl Default for PersonaConfig {
    fn default() -> Self {
        Self {
            name: default_persona_name(),
            aliases: default_aliases(),
            instructions: None,
        }
    }
}

fn default_persona_name() -> String {
    "TC Heiner".to_string()
}
fn default_aliases() -> Vec<String> {
    vec!["tc".to_string(), "heiner".to_string()]
}

#[derive(Debug, Deserialize, Clone)]
pub struct ConfidenceConfig {
    #[serde(default = "default_keywords")]
    pub keywords: Vec<String>,
}

impl Default for ConfidenceConfig {
    fn default() -> Self {
        Self {
            keywords: default_keywords(),
        }
    }
}

fn default_keywords() -> Vec<String> {
    [
        "manaburn",
        "myndsens",
        "wells fargo",
        "stealth",
        "chatbot",
        "ai",
        "python",
        "fastapi",
        "aws",
        "lambda",
        "react",
        "astro",
        "project",
        "experience",
        "skill",
        "technology",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Which public site the source links point at.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SiteEnvironment {
    #[default]
    Development,
    Production,
}

impl std::str::FromStr for SiteEnvironment {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "development" | "dev" | "local" => Ok(SiteEnvironment::Development),
            "production" | "prod" => Ok(SiteEnvironment::Production),
            other => bail!(
                "Unknown environment: '{}'. Must be development or production.",
                other
            ),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LinksConfig {
    #[serde(default)]
    pub environment: SiteEnvironment,
    #[serde(default = "default_development_base_url")]
    pub development_base_url: String,
    #[serde(default = "default_production_base_url")]
    pub production_base_url: String,
}

impl Default for LinksConfig {
    fn default() -> Self {
        Self {
            environment: SiteEnvironment::default(),
            development_base_url: default_development_base_url(),
            production_base_url: default_production_base_url(),
        }
    }
}

impl LinksConfig {
    /// Base URL for the selected environment, without a trailing slash.
    pub fn base_url(&self) -> &str {
        let base = match self.environment {
            SiteEnvironment::Development => &self.development_base_url,
            SiteEnvironment::Production => &self.production_base_url,
        };
        base.trim_end_matches('/')
    }
}

fn default_development_base_url() -> String {
    "http://localhost:4321".to_string()
}
fn default_production_base_url() -> String {
    "https://tcheiner.com".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            allowed_origins: default_allowed_origins(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8000".to_string()
}
fn default_allowed_origins() -> Vec<String> {
    vec![
        "http://localhost:4321".to_string(),
        "https://localhost:4321".to_string(),
        "https://tcheiner.com".to_string(),
        "https://www.tcheiner.com".to_string(),
    ]
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct IngestConfig {
    /// Abort the whole run on the first unreadable file instead of skipping it.
    #[serde(default)]
    pub fail_fast: bool,
}

/// Read, override from the environment, and validate a config file.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let mut config = parse_config(&content)?;
    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
    validate(&config)?;
    Ok(config)
}

/// Parse config text without touching the environment.
pub fn parse_config(content: &str) -> Result<Config> {
    toml::from_str(content).with_context(|| "Failed to parse config file")
}

/// Apply `OPENAI_API_KEY`, `OPENAI_API_KEY_FILE`, `ALLOWED_ORIGINS` and `APP_ENV`.
///
/// Takes a lookup function so tests don't have to mutate the process environment.
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(key) = lookup("OPENAI_API_KEY").filter(|k| !k.trim().is_empty()) {
        config.api_key = Some(key.trim().to_string());
    } else if let Some(file) = lookup("OPENAI_API_KEY_FILE") {
        let key = std::fs::read_to_string(&file)
            .with_context(|| format!("Failed to read API key file: {}", file))?;
        let key = key.trim();
        if !key.is_empty() {
            config.api_key = Some(key.to_string());
        }
    }

    if let Some(origins) = lookup("ALLOWED_ORIGINS") {
        let parsed: Vec<String> = origins
            .split(',')
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .collect();
        if !parsed.is_empty() {
            config.server.allowed_origins = parsed;
        }
    }

    if let Some(env) = lookup("APP_ENV") {
        config.links.environment = env.parse()?;
    }

    Ok(())
}

fn validate(config: &Config) -> Result<()> {
    if config.chunking.window_size == 0 {
        bail!("chunking.window_size must be > 0");
    }
    if config.chunking.overlap >= config.chunking.window_size {
        bail!("chunking.overlap must be smaller than chunking.window_size");
    }

    if config.content.extensions.is_empty() {
        bail!("content.extensions must not be empty");
    }

    if config.retrieval.k == 0 {
        bail!("retrieval.k must be >= 1");
    }
    if let Some(min) = config.retrieval.min_similarity {
        if !(-1.0..=1.0).contains(&min) {
            bail!("retrieval.min_similarity must be in [-1.0, 1.0]");
        }
    }

    if config.embedding.batch_size == 0 {
        bail!("embedding.batch_size must be > 0");
    }

    match config.embedding.provider.as_str() {
        "disabled" | "openai" | "ollama" | "hash" => {}
        other => bail!(
            "Unknown embedding provider: '{}'. Must be disabled, openai, ollama, or hash.",
            other
        ),
    }

    if config.persona.name.trim().is_empty() {
        bail!("persona.name must not be empty");
    }

    Ok(())
}
