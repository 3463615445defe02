use thiserror::Error;

/// Errors returned by `RunController::start` before any side effect
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlaygroundError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("No agent found")]
    NoAgent,
}

/// Failures reported by an agent handle
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AgentError {
    #[error("{0}")]
    Message(String),

    #[error("Agent does not support {0}")]
    Unsupported(&'static str),
}

impl AgentError {
    pub fn message(msg: impl Into<String>) -> Self {
        AgentError::Message(msg.into())
    }
}

pub type AgentResult<T> = Result<T, AgentError>;

/// Sentinel code agents embed in errors that carry no user-meaningful text
pub const ERROR_CODE_NOT_IMPLEMENTED_AS_DESIGNED: &str = "NOT_IMPLEMENTED_AS_DESIGNED";

/// Signature of the error raised when another extension holds the debugger
const CONFLICTING_EXTENSION_SIGNATURE: &str = "of different extension";

pub const CONFLICTING_EXTENSION_MESSAGE: &str = "Conflicting extension detected. Please disable the suspicious plugins and refresh the page. Guide: https://midscenejs.com/quick-experience.html#faq";

pub const UNKNOWN_ERROR_MESSAGE: &str = "Unknown error";

/// Turn an agent failure into the text shown to the user
pub fn format_error_message(err: &AgentError) -> String {
    let message = err.to_string();
    if message.contains(CONFLICTING_EXTENSION_SIGNATURE) {
        return CONFLICTING_EXTENSION_MESSAGE.to_string();
    }
    if message.contains(ERROR_CODE_NOT_IMPLEMENTED_AS_DESIGNED) {
        return UNKNOWN_ERROR_MESSAGE.to_string();
    }
    message
}
