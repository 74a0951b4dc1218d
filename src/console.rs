use std::fmt::Display;

use colored::Colorize;

use crate::assistant::Answer;
use crate::commands::CommandOutput;
use crate::config::AppConfig;
use crate::models::{FileContext, ResponseKind, SourceType};
use crate::project::ProjectAnalyzer;

pub const APP_TITLE: &str = "Godot AI Development Assistant";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

fn separator() -> String {
    "=".repeat(80)
}

/// Everything the interactive console prints to stdout.
#[derive(Debug, Clone, Default)]
pub struct ConsoleOutput;

impl ConsoleOutput {
    pub fn new() -> Self {
        Self
    }

    pub fn print_title(&self) {
        println!("{}", separator());
        println!("{}", APP_TITLE.green().bold());
        println!("Version: {}", APP_VERSION);
        println!("RAG assistant for Godot documentation, game lore and your project files");
        println!("{}", separator());
    }

    pub fn print_config_summary(&self, config: &AppConfig) {
        println!("{}", "Configuration loaded successfully!".green());
        println!("{}", config.summary());
    }

    pub fn print_project_status(&self, analyzer: &ProjectAnalyzer) {
        println!("\n{}", separator());
        println!("{}", "Project Status:".green());
        println!("{}", separator());
        match analyzer.info() {
            Ok(info) => println!("{}", info),
            Err(e) => self.print_error(&e),
        }
        println!("{}", separator());
    }

    pub fn print_welcome(&self) {
        println!("\n{}", separator());
        println!(
            "{}",
            "Assistant ready! Ask me anything about Godot development or your game lore.".green()
        );
        println!();
        println!("Special Commands:");
        println!("  /project info      - Show your project details");
        println!("  /project structure - Show project file tree");
        println!("  /read <file>       - Read a file from your project (loads into context)");
        println!("  /list [pattern]    - List files (e.g., /list *.gd)");
        println!("  /lore              - Show lore files status");
        println!("  /clear             - Clear loaded file context");
        println!("  quit or exit       - Exit the assistant");
        println!("{}\n", separator());
    }

    pub fn print_goodbye(&self) {
        println!("{}", "\n\nGoodbye!".green());
    }

    pub fn print_error(&self, error: &dyn Display) {
        println!("{}", format!("\nError: {}", error).cyan());
    }

    pub fn print_docs_missing(&self, docs_path: &std::path::Path) {
        println!(
            "\nDocumentation path {} not found!\n\
             Please add Godot documentation to the godot_docs directory.\n\
             You can:\n\
             1. Clone Godot docs: git clone https://github.com/godotengine/godot-docs.git godot_docs\n\
             2. Or manually add .rst files to godot_docs/\n",
            docs_path.display()
        );
    }

    pub fn print_command_output(&self, output: &CommandOutput) {
        match output.kind {
            ResponseKind::Error => println!("\n{}", output.text.red()),
            _ => println!("\n{}", output.text),
        }
    }

    pub fn print_thinking(&self, question: &str) {
        println!("\nQuestion: {}", question);
        println!("{}\n", "Thinking...".dimmed());
    }

    pub fn print_answer(&self, answer: &Answer, file_context: Option<&FileContext>) {
        println!("{}", "Answer:".bold());
        println!("{}", answer.text);
        println!("\n{}", separator());
        println!("{}", sources_summary(answer, file_context));
        println!("{}", separator());
    }
}

/// "Sources: N relevant chunks retrieved" plus the per-type breakdown.
pub fn sources_summary(answer: &Answer, file_context: Option<&FileContext>) -> String {
    let mut lines = vec![format!(
        "Sources: {} relevant chunks retrieved",
        answer.sources.len()
    )];

    let docs = answer.count_of(SourceType::Documentation);
    if docs > 0 {
        lines.push(format!("  - {} from documentation", docs));
    }
    let lore = answer.count_of(SourceType::Lore);
    if lore > 0 {
        lines.push(format!("  - {} from lore", lore));
    }
    if let Some(file) = file_context {
        lines.push(format!("  - Context: {}", file.path));
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DocumentChunk;

    fn answer(types: &[SourceType]) -> Answer {
        Answer {
            text: "Test answer".to_string(),
            sources: types
                .iter()
                .enumerate()
                .map(|(i, t)| DocumentChunk {
                    text: String::new(),
                    source: String::new(),
                    source_type: *t,
                    chunk_index: i,
                })
                .collect(),
        }
    }

    #[test]
    fn test_sources_summary_breakdown() {
        let a = answer(&[
            SourceType::Documentation,
            SourceType::Lore,
            SourceType::Documentation,
        ]);
        assert_eq!(
            sources_summary(&a, None),
            "Sources: 3 relevant chunks retrieved\n  - 2 from documentation\n  - 1 from lore"
        );
    }

    #[test]
    fn test_sources_summary_with_file_context() {
        let file = FileContext {
            path: "scripts/player.gd".to_string(),
            content: String::new(),
        };
        assert_eq!(
            sources_summary(&answer(&[]), Some(&file)),
            "Sources: 0 relevant chunks retrieved\n  - Context: scripts/player.gd"
        );
    }
}
