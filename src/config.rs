use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::errors::{AssistantError, Result};

pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-sonnet-4-20250514";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4-turbo-preview";
pub const DEFAULT_OPENAI_EMBEDDING_MODEL: &str = "text-embedding-ada-002";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiProvider {
    Anthropic,
    OpenAi,
}

impl ApiProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Anthropic => "anthropic",
            Self::OpenAi => "openai",
        }
    }
}

impl FromStr for ApiProvider {
    type Err = AssistantError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "anthropic" => Ok(Self::Anthropic),
            "openai" => Ok(Self::OpenAi),
            other => Err(AssistantError::InvalidConfig(format!(
                "Invalid API_PROVIDER: {}. Must be 'anthropic' or 'openai'",
                other
            ))),
        }
    }
}

impl fmt::Display for ApiProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingBackend {
    Local,
    OpenAi,
}

impl EmbeddingBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::OpenAi => "openai",
        }
    }
}

impl FromStr for EmbeddingBackend {
    type Err = AssistantError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "openai" => Ok(Self::OpenAi),
            other => Err(AssistantError::InvalidConfig(format!(
                "Invalid EMBEDDING_PROVIDER: {}. Must be 'local' or 'openai'",
                other
            ))),
        }
    }
}

impl fmt::Display for EmbeddingBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// API key that never shows up in `Debug` output or logs.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub provider: ApiProvider,
    pub anthropic_key: Option<ApiKey>,
    pub openai_key: Option<ApiKey>,
    pub anthropic_base_url: String,
    pub openai_base_url: String,
    pub request_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    pub provider: EmbeddingBackend,
    /// Directory holding a pre-downloaded ONNX model; when unset the default
    /// model is fetched by fastembed on first use.
    pub model_dir: Option<PathBuf>,
    pub openai_model: String,
}

#[derive(Debug, Clone)]
pub struct PathConfig {
    pub project_path: Option<PathBuf>,
    pub docs_path: PathBuf,
    pub lore_path: PathBuf,
}

impl PathConfig {
    /// Creates the lore directory if it is missing. The docs directory is
    /// never created.
    pub fn ensure_directories(&self) -> Result<()> {
        if !self.lore_path.exists() {
            std::fs::create_dir_all(&self.lore_path)?;
            tracing::info!("Created lore directory {}", self.lore_path.display());
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct RagConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub retrieval_k: usize,
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub anthropic_model: String,
    pub openai_model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Debug, Clone)]
pub struct VectorDbConfig {
    pub url: String,
    pub collection: String,
}

#[derive(Debug, Clone)]
pub struct WebConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub embedding: EmbeddingConfig,
    pub paths: PathConfig,
    pub rag: RagConfig,
    pub llm: LlmConfig,
    pub vector_db: VectorDbConfig,
    pub web: WebConfig,
}

// Flat view of the sources. Environment variable names are lowercased by
// the `config` crate, so `RAG_CHUNK_SIZE` lands in `rag_chunk_size`.
#[derive(Debug, Deserialize)]
struct RawSettings {
    #[serde(default = "default_api_provider")]
    api_provider: String,
    anthropic_api_key: Option<String>,
    openai_api_key: Option<String>,
    #[serde(default = "default_anthropic_base_url")]
    anthropic_base_url: String,
    #[serde(default = "default_openai_base_url")]
    openai_base_url: String,
    #[serde(default = "default_http_timeout_secs")]
    http_timeout_secs: u64,

    #[serde(default = "default_embedding_provider")]
    embedding_provider: String,
    embedding_model_dir: Option<PathBuf>,
    #[serde(default = "default_openai_embedding_model")]
    openai_embedding_model: String,

    #[serde(default = "default_project_path")]
    godot_project_path: String,
    #[serde(default = "default_docs_path")]
    godot_docs_path: PathBuf,
    #[serde(default = "default_lore_path")]
    lore_path: PathBuf,

    #[serde(default = "default_chunk_size")]
    rag_chunk_size: usize,
    #[serde(default = "default_chunk_overlap")]
    rag_chunk_overlap: usize,
    #[serde(default = "default_retrieval_k")]
    rag_retrieval_k: usize,

    #[serde(default = "default_anthropic_model")]
    anthropic_model: String,
    #[serde(default = "default_openai_model")]
    openai_model: String,
    #[serde(default)]
    llm_temperature: f32,
    #[serde(default = "default_max_tokens")]
    llm_max_tokens: u32,

    #[serde(default = "default_qdrant_url")]
    qdrant_url: String,
    #[serde(default = "default_qdrant_collection")]
    qdrant_collection: String,

    #[serde(default = "default_web_host")]
    web_host: String,
    #[serde(default = "default_web_port")]
    web_port: u16,
}

fn default_api_provider() -> String {
    "anthropic".to_string()
}
fn default_anthropic_base_url() -> String {
    "https://api.anthropic.com/v1".to_string()
}
fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_http_timeout_secs() -> u64 {
    120
}
fn default_embedding_provider() -> String {
    "local".to_string()
}
fn default_openai_embedding_model() -> String {
    DEFAULT_OPENAI_EMBEDDING_MODEL.to_string()
}
fn default_project_path() -> String {
    "/app/project".to_string()
}
fn default_docs_path() -> PathBuf {
    PathBuf::from("/app/godot_docs")
}
fn default_lore_path() -> PathBuf {
    PathBuf::from("/app/data/lore")
}
fn default_chunk_size() -> usize {
    1000
}
fn default_chunk_overlap() -> usize {
    200
}
fn default_retrieval_k() -> usize {
    6
}
fn default_anthropic_model() -> String {
    DEFAULT_ANTHROPIC_MODEL.to_string()
}
fn default_openai_model() -> String {
    DEFAULT_OPENAI_MODEL.to_string()
}
fn default_max_tokens() -> u32 {
    4096
}
fn default_qdrant_url() -> String {
    "http://localhost:6334".to_string()
}
fn default_qdrant_collection() -> String {
    "godot_docs".to_string()
}
fn default_web_host() -> String {
    "0.0.0.0".to_string()
}
fn default_web_port() -> u16 {
    5000
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl AppConfig {
    /// Load `.env`, then layer `config/assistant.*` (optional) and the
    /// process environment.
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();

        let settings = Config::builder()
            .add_source(File::with_name("config/assistant").required(false))
            .add_source(Environment::default())
            .build()?;

        let config = Self::from_settings(settings)?;
        config.paths.ensure_directories()?;
        tracing::info!(
            "Loaded configuration: provider={}, embeddings={}",
            config.api.provider,
            config.embedding.provider
        );
        Ok(config)
    }

    /// Build from an explicit variable map instead of the process
    /// environment.
    pub fn from_vars<I, K, V>(vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let map: config::Map<String, String> = vars
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        let settings = Config::builder()
            .add_source(Environment::default().source(Some(map)))
            .build()?;
        Self::from_settings(settings)
    }

    fn from_settings(settings: Config) -> Result<Self> {
        let raw: RawSettings = settings.try_deserialize()?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawSettings) -> Result<Self> {
        let provider: ApiProvider = raw.api_provider.parse()?;
        let embedding_provider: EmbeddingBackend = raw.embedding_provider.parse()?;

        let anthropic_key = non_empty(raw.anthropic_api_key).map(ApiKey::new);
        let openai_key = non_empty(raw.openai_api_key).map(ApiKey::new);

        match provider {
            ApiProvider::Anthropic if anthropic_key.is_none() => {
                return Err(AssistantError::MissingConfig("ANTHROPIC_API_KEY".to_string()));
            }
            ApiProvider::OpenAi if openai_key.is_none() => {
                return Err(AssistantError::MissingConfig("OPENAI_API_KEY".to_string()));
            }
            _ => {}
        }
        if embedding_provider == EmbeddingBackend::OpenAi && openai_key.is_none() {
            return Err(AssistantError::MissingConfig("OPENAI_API_KEY".to_string()));
        }

        if raw.rag_chunk_size == 0 {
            return Err(AssistantError::InvalidConfig(
                "RAG_CHUNK_SIZE must be greater than zero".to_string(),
            ));
        }
        if raw.rag_chunk_overlap >= raw.rag_chunk_size {
            return Err(AssistantError::InvalidConfig(format!(
                "RAG_CHUNK_OVERLAP ({}) must be smaller than RAG_CHUNK_SIZE ({})",
                raw.rag_chunk_overlap, raw.rag_chunk_size
            )));
        }
        if raw.rag_retrieval_k == 0 {
            return Err(AssistantError::InvalidConfig(
                "RAG_RETRIEVAL_K must be greater than zero".to_string(),
            ));
        }

        let project_path = non_empty(Some(raw.godot_project_path)).map(PathBuf::from);

        Ok(Self {
            api: ApiConfig {
                provider,
                anthropic_key,
                openai_key,
                anthropic_base_url: raw.anthropic_base_url.trim_end_matches('/').to_string(),
                openai_base_url: raw.openai_base_url.trim_end_matches('/').to_string(),
                request_timeout: Duration::from_secs(raw.http_timeout_secs),
            },
            embedding: EmbeddingConfig {
                provider: embedding_provider,
                model_dir: raw.embedding_model_dir,
                openai_model: raw.openai_embedding_model,
            },
            paths: PathConfig {
                project_path,
                docs_path: raw.godot_docs_path,
                lore_path: raw.lore_path,
            },
            rag: RagConfig {
                chunk_size: raw.rag_chunk_size,
                chunk_overlap: raw.rag_chunk_overlap,
                retrieval_k: raw.rag_retrieval_k,
            },
            llm: LlmConfig {
                anthropic_model: raw.anthropic_model,
                openai_model: raw.openai_model,
                temperature: raw.llm_temperature,
                max_tokens: raw.llm_max_tokens,
            },
            vector_db: VectorDbConfig {
                url: raw.qdrant_url,
                collection: raw.qdrant_collection,
            },
            web: WebConfig {
                host: raw.web_host,
                port: raw.web_port,
            },
        })
    }

    /// Key for the selected chat provider. Presence is checked at load time.
    pub fn api_key(&self) -> Option<&ApiKey> {
        match self.api.provider {
            ApiProvider::Anthropic => self.api.anthropic_key.as_ref(),
            ApiProvider::OpenAi => self.api.openai_key.as_ref(),
        }
    }

    pub fn model_name(&self) -> &str {
        match self.api.provider {
            ApiProvider::Anthropic => &self.llm.anthropic_model,
            ApiProvider::OpenAi => &self.llm.openai_model,
        }
    }

    pub fn summary(&self) -> String {
        let project = self
            .paths
            .project_path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none)".to_string());

        [
            format!("API Provider: {}", self.api.provider.as_str().to_uppercase()),
            format!("Embedding Provider: {}", self.embedding.provider.as_str().to_uppercase()),
            format!("LLM Model: {}", self.model_name()),
            format!("Project Path: {}", project),
            format!("Docs Path: {}", self.paths.docs_path.display()),
            format!("Lore Path: {}", self.paths.lore_path.display()),
            format!("Vector DB: {} ({})", self.vector_db.url, self.vector_db.collection),
            format!(
                "RAG Settings: chunk_size={}, k={}",
                self.rag.chunk_size, self.rag.retrieval_k
            ),
        ]
        .join("\n")
    }
}
