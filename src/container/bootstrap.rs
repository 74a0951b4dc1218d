//! Wires the application's services into a [`Container`].

use std::sync::Arc;

use super::Container;
use crate::assistant::GodotAssistant;
use crate::commands::{CommandContext, CommandParser};
use crate::config::AppConfig;
use crate::console::ConsoleOutput;
use crate::errors::Result;
use crate::llm::{create_chat_model, ChatModel};
use crate::project::ProjectAnalyzer;
use crate::rag::embeddings::{create_embeddings, EmbeddingProvider};
use crate::rag::vector_store::QdrantStore;
use crate::rag::RagIndex;

pub const CONFIG: &str = "config";
pub const OUTPUT_MANAGER: &str = "output_manager";
pub const PROJECT_ANALYZER: &str = "project_analyzer";
pub const COMMAND_PARSER: &str = "command_parser";
pub const EMBEDDINGS: &str = "embeddings";
pub const LLM: &str = "llm";
pub const VECTORSTORE: &str = "vectorstore";
pub const ASSISTANT: &str = "assistant";

/// Registers every service. Nothing network-backed is constructed here;
/// `embeddings`, `vectorstore` and `assistant` are built on first lookup and
/// `llm` on every lookup.
pub fn bootstrap(config: AppConfig) -> Container {
    let config = Arc::new(config);
    let project_root = config.paths.project_path.clone().unwrap_or_default();

    let mut container = Container::new();
    container.register_singleton(CONFIG, config);
    container.register_singleton(OUTPUT_MANAGER, Arc::new(ConsoleOutput::new()));
    container.register_singleton(PROJECT_ANALYZER, Arc::new(ProjectAnalyzer::new(project_root)));
    container.register_singleton(COMMAND_PARSER, Arc::new(CommandParser::new()));

    container.register_lazy_singleton(EMBEDDINGS, |r| {
        let config: Arc<AppConfig> = r.get(CONFIG)?;
        create_embeddings(&config)
    });

    container.register_factory(LLM, |r| {
        let config: Arc<AppConfig> = r.get(CONFIG)?;
        create_chat_model(&config)
    });

    container.register_lazy_singleton(VECTORSTORE, |r| {
        let config: Arc<AppConfig> = r.get(CONFIG)?;
        let embeddings: Arc<dyn EmbeddingProvider> = r.get(EMBEDDINGS)?;
        let store = QdrantStore::new(&config.vector_db.url, &config.vector_db.collection)?;
        Ok(Arc::new(RagIndex::new(embeddings, Arc::new(store))))
    });

    container.register_lazy_singleton(ASSISTANT, |r| {
        let config: Arc<AppConfig> = r.get(CONFIG)?;
        let llm: Arc<dyn ChatModel> = r.get(LLM)?;
        let index: Arc<RagIndex> = r.get(VECTORSTORE)?;
        Ok(Arc::new(GodotAssistant::new(config, llm, index)))
    });

    tracing::debug!("Bootstrapped container: {:?}", container);
    container
}

/// Typed handles pulled out of the container once at start-up.
#[derive(Clone)]
pub struct Services {
    pub config: Arc<AppConfig>,
    pub output: Arc<ConsoleOutput>,
    pub project: Arc<ProjectAnalyzer>,
    pub parser: Arc<CommandParser>,
    pub assistant: Arc<GodotAssistant>,
}

impl Services {
    pub fn resolve(container: &Container) -> Result<Self> {
        Ok(Self {
            config: container.get(CONFIG)?,
            output: container.get(OUTPUT_MANAGER)?,
            project: container.get(PROJECT_ANALYZER)?,
            parser: container.get(COMMAND_PARSER)?,
            assistant: container.get(ASSISTANT)?,
        })
    }

    pub fn command_context(&self) -> CommandContext {
        CommandContext {
            project: self.project.clone(),
            config: self.config.clone(),
        }
    }
}
