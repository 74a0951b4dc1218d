use std::sync::Arc;

use crate::config::AppConfig;
use crate::errors::Result;
use crate::llm::ChatModel;
use crate::models::{DocumentChunk, FileContext, SourceType};
use crate::rag::ingest::{load_or_create, IndexState};
use crate::rag::RagIndex;

const MAX_FILE_CONTENT_CONTEXT: usize = 4000;

pub const QA_PROMPT_TEMPLATE: &str = "You are an expert Godot game engine assistant with access to:
1. Official Godot documentation
2. Game/project lore and world-building documents
3. The user's actual project files

IMPORTANT CAPABILITIES:
- You can read files from the user's project by asking them to share specific file paths
- You can see the project structure when provided
- You have access to lore documents that describe the game's world, characters, story, and setting
- You should provide advice tailored to their specific project when relevant

When answering questions about lore, story, characters, or world-building:
- Use the lore documents provided in the context
- Be specific and reference details from the lore
- Help maintain consistency with established lore

When answering technical Godot questions:
- Use the Godot documentation in the context
- Provide specific code examples using GDScript syntax
- Reference best practices

If you don't know the answer based on the context provided, just say that you don't know - don't make up information.

Context (may include documentation and/or lore):
{context}

Question: {question}

Helpful Answer:";

pub const FILE_CONTEXT_TEMPLATE: &str = "I previously read the file: {file_path}

Here is the content of that file:
```
{file_content}
```

Now, my question is: {question}";

/// An answer together with the chunks it was grounded on.
#[derive(Debug, Clone)]
pub struct Answer {
    pub text: String,
    pub sources: Vec<DocumentChunk>,
}

impl Answer {
    pub fn count_of(&self, source_type: SourceType) -> usize {
        self.sources
            .iter()
            .filter(|c| c.source_type == source_type)
            .count()
    }
}

// Single pass so placeholder-looking text inside values is left alone.
fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start + 1..];
        let var = vars.iter().find(|(name, _)| {
            tail.starts_with(name) && tail[name.len()..].starts_with('}')
        });
        match var {
            Some((name, value)) => {
                out.push_str(value);
                rest = &tail[name.len() + 1..];
            }
            None => {
                out.push('{');
                rest = tail;
            }
        }
    }

    out.push_str(rest);
    out
}

/// Wraps the question with the loaded file when there is one.
pub fn enhance_question(question: &str, file_context: Option<&FileContext>) -> String {
    match file_context {
        None => question.to_string(),
        Some(file) => {
            let content: String = file.content.chars().take(MAX_FILE_CONTENT_CONTEXT).collect();
            render(
                FILE_CONTEXT_TEMPLATE,
                &[
                    ("file_path", file.path.as_str()),
                    ("file_content", content.as_str()),
                    ("question", question),
                ],
            )
        }
    }
}

pub fn build_prompt(
    chunks: &[DocumentChunk],
    question: &str,
    file_context: Option<&FileContext>,
) -> String {
    let context = chunks
        .iter()
        .map(|c| c.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");
    let question = enhance_question(question, file_context);
    render(
        QA_PROMPT_TEMPLATE,
        &[("context", context.as_str()), ("question", question.as_str())],
    )
}

/// Retrieval-augmented question answering over the Godot docs and lore.
pub struct GodotAssistant {
    config: Arc<AppConfig>,
    llm: Arc<dyn ChatModel>,
    index: Arc<RagIndex>,
}

impl GodotAssistant {
    pub fn new(config: Arc<AppConfig>, llm: Arc<dyn ChatModel>, index: Arc<RagIndex>) -> Self {
        Self { config, llm, index }
    }

    pub fn model_name(&self) -> &str {
        self.llm.model_name()
    }

    pub fn index(&self) -> &RagIndex {
        &self.index
    }

    /// Loads the persisted index, building it on first run.
    pub async fn prepare(&self) -> Result<IndexState> {
        load_or_create(&self.index, &self.config).await
    }

    pub async fn ask(&self, question: &str, file_context: Option<&FileContext>) -> Result<String> {
        Ok(self.ask_with_sources(question, file_context).await?.text)
    }

    pub async fn ask_with_sources(
        &self,
        question: &str,
        file_context: Option<&FileContext>,
    ) -> Result<Answer> {
        let sources = self
            .index
            .similarity_search(question, self.config.rag.retrieval_k)
            .await?;
        tracing::debug!("Retrieved {} chunks for question", sources.len());

        let prompt = build_prompt(&sources, question, file_context);
        let text = self.llm.invoke(&prompt).await?;

        Ok(Answer { text, sources })
    }
}
