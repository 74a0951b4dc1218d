use super::{Command, DEFAULT_LIST_PATTERN};
use crate::errors::{AssistantError, Result};

const COMMAND_PREFIX: char = '/';
const EXIT_COMMANDS: &[&str] = &["quit", "exit", "q"];

/// Turns raw input lines into [`Command`]s. Purely syntactic: paths and
/// patterns are passed through unchecked.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandParser;

impl CommandParser {
    pub fn new() -> Self {
        Self
    }

    pub fn is_command(&self, input: &str) -> bool {
        input.trim().starts_with(COMMAND_PREFIX)
    }

    pub fn parse(&self, input: &str) -> Result<Command> {
        let text = input.trim();

        if text.is_empty() {
            return Ok(Command::Empty);
        }
        if EXIT_COMMANDS.iter().any(|c| text.eq_ignore_ascii_case(c)) {
            return Ok(Command::Exit);
        }
        if !text.starts_with(COMMAND_PREFIX) {
            return Ok(Command::Question(text.to_string()));
        }

        let (name, rest) = match text.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest.trim()),
            None => (text, ""),
        };

        match name.to_lowercase().as_str() {
            "/project" => Ok(Self::parse_project(rest)),
            "/read" => {
                if rest.is_empty() {
                    Err(AssistantError::InvalidCommand(
                        "/read requires a file path. Usage: /read <file>".to_string(),
                    ))
                } else {
                    Ok(Command::ReadFile(rest.to_string()))
                }
            }
            "/list" => {
                let pattern = if rest.is_empty() { DEFAULT_LIST_PATTERN } else { rest };
                Ok(Command::ListFiles(pattern.to_string()))
            }
            "/lore" => Ok(Command::LoreStatus),
            "/clear" => Ok(Command::ClearContext),
            "/help" => Ok(Command::Help),
            _ => Err(AssistantError::InvalidCommand(format!(
                "Unknown command: {}",
                name
            ))),
        }
    }

    fn parse_project(rest: &str) -> Command {
        let rest = rest.to_lowercase();
        if rest.contains("info") {
            Command::ProjectInfo
        } else if rest.contains("structure") {
            Command::ProjectStructure
        } else {
            Command::Help
        }
    }
}
