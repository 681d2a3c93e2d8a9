use thiserror::Error;

/// Errors produced anywhere along a chat cycle
#[derive(Error, Debug)]
pub enum ChatError {
    /// Empty or whitespace-only submission. Never reaches the network.
    #[error("Message is empty")]
    Validation,

    /// Non-success status from the relay endpoint. `message` is the
    /// upstream `error.message` when present, else the status line.
    #[error("{message}")]
    Relay { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    /// The cycle was cancelled by the user.
    #[error("Request aborted")]
    Aborted,

    /// The cycle was replaced by a newer submission.
    #[error("Request superseded by a newer message")]
    Superseded,

    #[error("History storage error: {0}")]
    Storage(String),

    #[error("Attachment error: {0}")]
    Attachment(String),

    #[error("Configuration Error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Serde(#[from] serde_json::Error),
}

impl ChatError {
    /// Errors that end a cycle without being shown to the user.
    pub fn is_silent(&self) -> bool {
        matches!(self, ChatError::Superseded)
    }
}

impl From<reqwest::Error> for ChatError {
    fn from(e: reqwest::Error) -> Self {
        ChatError::Network(e.to_string())
    }
}

/// Result type for chat operations
pub type ChatResult<T> = Result<T, ChatError>;
