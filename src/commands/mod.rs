pub mod dispatch;
pub mod parser;

pub use self::dispatch::{execute, CommandContext, CommandOutput, Session};
pub use self::parser::CommandParser;

pub const DEFAULT_LIST_PATTERN: &str = "*.gd";

/// One classified line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Exit,
    Empty,
    /// Free text for the assistant.
    Question(String),
    ProjectInfo,
    ProjectStructure,
    ReadFile(String),
    ListFiles(String),
    LoreStatus,
    ClearContext,
    Help,
}

