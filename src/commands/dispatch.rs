use std::sync::Arc;

use super::Command;
use crate::config::AppConfig;
use crate::errors::{AssistantError, Result};
use crate::models::{FileContext, ResponseKind};
use crate::project::{ProjectAnalyzer, MAX_STRUCTURE_DEPTH};
use crate::rag::ingest::lore_status;

const MAX_FILES_IN_LIST: usize = 50;
const MAX_FILE_CONTENT_DISPLAY: usize = 3000;

pub const HELP_TEXT: &str = "Available Commands:
- /project info      - Show project information
- /project structure - Show project file structure
- /read <file>       - Read a specific file (loads into context)
- /list [pattern]    - List files (default: *.gd)
- /lore              - Show lore files status
- /clear             - Clear loaded file context
- /help              - Show this help";

/// Dependencies a command may touch.
#[derive(Clone)]
pub struct CommandContext {
    pub project: Arc<ProjectAnalyzer>,
    pub config: Arc<AppConfig>,
}

/// Per-conversation state: the file most recently loaded with `/read`.
#[derive(Debug, Default)]
pub struct Session {
    file_context: Option<FileContext>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file_context(&self) -> Option<&FileContext> {
        self.file_context.as_ref()
    }

    pub fn set_file_context(&mut self, context: FileContext) {
        self.file_context = Some(context);
    }

    pub fn clear_file_context(&mut self) -> Option<FileContext> {
        self.file_context.take()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub kind: ResponseKind,
    pub text: String,
}

impl CommandOutput {
    pub fn new(kind: ResponseKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }

    pub fn error(err: &AssistantError) -> Self {
        Self::new(ResponseKind::Error, format!("❌ Command error: {}", err))
    }
}

/// Runs a slash command. Questions, blank lines and exit requests are not
/// commands and yield `None`.
pub fn execute(
    command: &Command,
    ctx: &CommandContext,
    session: &mut Session,
) -> Result<Option<CommandOutput>> {
    let output = match command {
        Command::Exit | Command::Empty | Command::Question(_) => return Ok(None),
        Command::ProjectInfo => {
            CommandOutput::new(ResponseKind::ProjectInfo, ctx.project.info()?.to_string())
        }
        Command::ProjectStructure => CommandOutput::new(
            ResponseKind::ProjectInfo,
            ctx.project.structure(MAX_STRUCTURE_DEPTH),
        ),
        Command::ListFiles(pattern) => list_files(ctx, pattern)?,
        Command::ReadFile(path) => read_file(ctx, session, path)?,
        Command::ClearContext => match session.clear_file_context() {
            Some(previous) => CommandOutput::new(
                ResponseKind::Success,
                format!("✓ Cleared file context for: {}", previous.path),
            ),
            None => CommandOutput::new(ResponseKind::Info, "No file context to clear."),
        },
        Command::LoreStatus => CommandOutput::new(
            ResponseKind::LoreStatus,
            lore_status(&ctx.config.paths.lore_path).to_string(),
        ),
        Command::Help => CommandOutput::new(ResponseKind::Info, HELP_TEXT),
    };
    Ok(Some(output))
}

fn list_files(ctx: &CommandContext, pattern: &str) -> Result<CommandOutput> {
    let mut matches = ctx.project.find_files(pattern)?;
    let shown: Vec<String> = matches.by_ref().take(MAX_FILES_IN_LIST).collect();
    if shown.is_empty() {
        return Err(AssistantError::NoFilesMatching(pattern.to_string()));
    }
    let remaining = matches.count();

    let rule = "=".repeat(80);
    let mut text = format!("📁 Files matching '{}':\n{}\n", pattern, rule);
    for file in &shown {
        text.push_str("  ");
        text.push_str(file);
        text.push('\n');
    }
    if remaining > 0 {
        text.push_str(&format!("\n... and {} more\n", remaining));
    }
    text.push_str(&rule);

    Ok(CommandOutput::new(ResponseKind::FileList, text))
}

fn read_file(ctx: &CommandContext, session: &mut Session, path: &str) -> Result<CommandOutput> {
    let content = ctx.project.read_file(path)?;

    let total = content.chars().count();
    let mut display: String = content.chars().take(MAX_FILE_CONTENT_DISPLAY).collect();
    if total > MAX_FILE_CONTENT_DISPLAY {
        display.push_str(&format!(
            "\n\n... (showing first {} chars of {} total)",
            MAX_FILE_CONTENT_DISPLAY, total
        ));
    }

    tracing::debug!("Loaded {} ({} chars) into file context", path, total);
    session.set_file_context(FileContext {
        path: path.to_string(),
        content,
    });

    let rule = "=".repeat(80);
    Ok(CommandOutput::new(
        ResponseKind::FileContent,
        format!(
            "📄 Contents of {}:\n{}\n{}\n{}\n✓ File loaded into context! You can now ask questions about this file.\nUse /clear to remove file context.",
            path, rule, display, rule
        ),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn context(root: &std::path::Path, lore: &std::path::Path) -> CommandContext {
        let config = AppConfig::from_vars([
            ("ANTHROPIC_API_KEY", "test_key".to_string()),
            ("GODOT_PROJECT_PATH", root.display().to_string()),
            ("LORE_PATH", lore.display().to_string()),
        ])
        .unwrap();
        CommandContext {
            project: Arc::new(ProjectAnalyzer::new(root)),
            config: Arc::new(config),
        }
    }

    fn fixture() -> (tempfile::TempDir, CommandContext) {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("game");
        fs::create_dir_all(root.join("scripts")).unwrap();
        fs::write(root.join("project.godot"), "").unwrap();
        fs::write(root.join("scripts/player.gd"), "extends CharacterBody2D\n").unwrap();
        let ctx = context(&root, &dir.path().join("lore"));
        (dir, ctx)
    }

    fn run(command: Command, ctx: &CommandContext, session: &mut Session) -> Result<CommandOutput> {
        execute(&command, ctx, session).map(|o| o.expect("command output"))
    }

    #[test]
    fn test_non_commands_produce_nothing() {
        let (_dir, ctx) = fixture();
        let mut session = Session::new();
        for command in [Command::Exit, Command::Empty, Command::Question("hi".into())] {
            assert!(execute(&command, &ctx, &mut session).unwrap().is_none());
        }
    }

    #[test]
    fn test_read_file_sets_context() {
        let (_dir, ctx) = fixture();
        let mut session = Session::new();

        let out = run(Command::ReadFile("scripts/player.gd".into()), &ctx, &mut session).unwrap();
        assert_eq!(out.kind, ResponseKind::FileContent);
        assert!(out.text.starts_with("📄 Contents of scripts/player.gd:"));
        assert!(out.text.contains("extends CharacterBody2D"));
        assert!(out.text.contains("✓ File loaded into context!"));

        let stored = session.file_context().unwrap();
        assert_eq!(stored.path, "scripts/player.gd");
        assert_eq!(stored.content, "extends CharacterBody2D\n");
    }

    #[test]
    fn test_read_file_truncates_display_only() {
        let (dir, ctx) = fixture();
        let long = "a".repeat(3500);
        fs::write(dir.path().join("game/big.gd"), &long).unwrap();
        let mut session = Session::new();

        let out = run(Command::ReadFile("big.gd".into()), &ctx, &mut session).unwrap();
        assert!(out.text.contains("... (showing first 3000 chars of 3500 total)"));
        assert!(!out.text.contains(&"a".repeat(3001)));
        assert_eq!(session.file_context().unwrap().content.len(), 3500);
    }

    #[test]
    fn test_read_missing_file() {
        let (_dir, ctx) = fixture();
        let mut session = Session::new();
        let err = run(Command::ReadFile("nope.gd".into()), &ctx, &mut session).unwrap_err();
        assert_eq!(err.to_string(), "File not found: nope.gd");
        assert!(session.file_context().is_none());
        assert_eq!(
            CommandOutput::error(&err).text,
            "❌ Command error: File not found: nope.gd"
        );
    }

    #[test]
    fn test_clear_context() {
        let (_dir, ctx) = fixture();
        let mut session = Session::new();

        let out = run(Command::ClearContext, &ctx, &mut session).unwrap();
        assert_eq!(out, CommandOutput::new(ResponseKind::Info, "No file context to clear."));

        run(Command::ReadFile("scripts/player.gd".into()), &ctx, &mut session).unwrap();
        let out = run(Command::ClearContext, &ctx, &mut session).unwrap();
        assert_eq!(out.text, "✓ Cleared file context for: scripts/player.gd");
        assert!(session.file_context().is_none());
    }

    #[test]
    fn test_list_files() {
        let (_dir, ctx) = fixture();
        let mut session = Session::new();
        let out = run(Command::ListFiles("*.gd".into()), &ctx, &mut session).unwrap();
        assert_eq!(out.kind, ResponseKind::FileList);
        assert!(out.text.starts_with("📁 Files matching '*.gd':"));
        assert!(out.text.contains("\n  scripts/player.gd\n"));
        assert!(!out.text.contains("more"));
    }

    #[test]
    fn test_list_files_caps_at_fifty() {
        let (dir, ctx) = fixture();
        for i in 0..60 {
            fs::write(dir.path().join(format!("game/scripts/npc_{:02}.gd", i)), "").unwrap();
        }
        let mut session = Session::new();
        let out = run(Command::ListFiles("*.gd".into()), &ctx, &mut session).unwrap();
        assert_eq!(out.text.lines().filter(|l| l.starts_with("  ")).count(), 50);
        assert!(out.text.contains("... and 11 more"));
    }

    #[test]
    fn test_list_files_no_match() {
        let (_dir, ctx) = fixture();
        let mut session = Session::new();
        let err = run(Command::ListFiles("*.tres".into()), &ctx, &mut session).unwrap_err();
        assert_eq!(err.to_string(), "No files found matching: *.tres");
    }

    #[test]
    fn test_project_info_and_structure() {
        let (_dir, ctx) = fixture();
        let mut session = Session::new();

        let info = run(Command::ProjectInfo, &ctx, &mut session).unwrap();
        assert_eq!(info.kind, ResponseKind::ProjectInfo);
        assert!(info.text.contains("GDScript files: 1"));

        let tree = run(Command::ProjectStructure, &ctx, &mut session).unwrap();
        assert!(tree.text.contains("    player.gd"));
    }

    #[test]
    fn test_lore_status_and_help() {
        let (_dir, ctx) = fixture();
        let mut session = Session::new();

        let lore = run(Command::LoreStatus, &ctx, &mut session).unwrap();
        assert_eq!(lore.kind, ResponseKind::LoreStatus);
        assert!(lore.text.contains("Lore directory not found"));

        let help = run(Command::Help, &ctx, &mut session).unwrap();
        assert_eq!(help.text, HELP_TEXT);
    }
}
