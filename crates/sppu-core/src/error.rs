use thiserror::Error;

pub const FORMAT_ERROR_MESSAGE: &str =
    "The AI model returned an invalid format. Please try rephrasing your question.";
pub const TRANSPORT_ERROR_MESSAGE: &str =
    "An error occurred while fetching answers. Please try again.";
pub const UNKNOWN_ERROR_MESSAGE: &str = "An unknown error occurred.";

/// Failures of the answer service.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnswerError {
    /// The API credential is missing. Not recoverable within a session.
    #[error("{0}")]
    Configuration(String),

    /// The remote response could not be parsed as the expected shape.
    #[error("Invalid response format: {0}")]
    Format(String),

    /// Network failure, non-success status, or any other remote error.
    #[error("Request failed: {0}")]
    Transport(String),
}

impl AnswerError {
    /// The text shown to the user for this failure.
    pub fn user_message(&self) -> String {
        let message = match self {
            AnswerError::Configuration(message) => message.as_str(),
            AnswerError::Format(_) => FORMAT_ERROR_MESSAGE,
            AnswerError::Transport(_) => TRANSPORT_ERROR_MESSAGE,
        };
        if message.trim().is_empty() {
            UNKNOWN_ERROR_MESSAGE.to_string()
        } else {
            message.to_string()
        }
    }

    pub fn is_recoverable(&self) -> bool {
        !matches!(self, AnswerError::Configuration(_))
    }
}

impl From<reqwest::Error> for AnswerError {
    fn from(err: reqwest::Error) -> Self {
        AnswerError::Transport(err.to_string())
    }
}

/// Errors from the durable note blob store. Logged, never shown to the user.
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Caller-contract violations of `ChatSession::begin_send`.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendError {
    #[error("A request is already in flight")]
    Busy,

    #[error("Nothing to send: message is empty and no image is attached")]
    EmptyMessage,
}
