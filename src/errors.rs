use thiserror::Error;

#[derive(Error, Debug)]
pub enum AssistantError {
    #[error("{0} not found in environment")]
    MissingConfig(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Dependency '{0}' not registered in container")]
    NotRegistered(String),

    #[error("Circular dependency detected: {}", .0.join(" -> "))]
    CircularDependency(Vec<String>),

    #[error("Dependency '{key}' is not a {expected}")]
    TypeMismatch { key: String, expected: &'static str },

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("No files found matching: {0}")]
    NoFilesMatching(String),

    #[error("{0}")]
    InvalidCommand(String),

    #[error("{provider} request failed: {message}")]
    Provider { provider: String, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AssistantError {
    pub fn provider(provider: impl Into<String>, message: impl ToString) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.to_string(),
        }
    }

    /// Command-level failures are shown to the user as a normal reply
    /// rather than aborting the session.
    pub fn is_command_error(&self) -> bool {
        matches!(
            self,
            Self::FileNotFound(_) | Self::NoFilesMatching(_) | Self::InvalidCommand(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, AssistantError>;
