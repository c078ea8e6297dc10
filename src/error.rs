//! Error types for the financial-literacy engine

use thiserror::Error;

/// Result type alias for engine and service operations
pub type Result<T> = std::result::Result<T, FinlitError>;

#[derive(Error, Debug)]
pub enum FinlitError {

    // =============================
    // Quiz / Assessment Engine Errors
    // =============================

    #[error("Quiz has no questions")]
    EmptyQuiz,

    #[error("Invalid question {index}: {reason}")]
    Validation { index: usize, reason: String },

    #[error("Cannot finish: {} question(s) unanswered ({missing:?})", missing.len())]
    IncompleteAnswers { missing: Vec<usize> },

    #[error("Question index {index} out of range (len {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Answer does not fit question {index}: {reason}")]
    AnswerMismatch { index: usize, reason: String },

    #[error("Invalid answer: {0}")]
    InvalidAnswer(String),

    #[error("Session is already complete")]
    SessionComplete,

    #[error("Custom answer limit reached ({0})")]
    CustomAnswerLimit(usize),

    // =============================
    // Service Errors
    // =============================

    #[error("LLM error: {0}")]
    LlmError(String),

    #[error("Invalid AI response: {0}")]
    InvalidResponse(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Session not found: {0}")]
    SessionNotFound(uuid::Uuid),

    #[error("Invalid phase: {0}")]
    InvalidPhase(String),

    // =============================
    // External Library Conversions
    // =============================

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("UUID parse error: {0}")]
    UuidError(#[from] uuid::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl FinlitError {
    /// True for failures that originate outside the engine (AI service,
    /// network, malformed payloads). These are shown to users generically.
    pub fn is_external(&self) -> bool {
        matches!(
            self,
            FinlitError::LlmError(_)
                | FinlitError::InvalidResponse(_)
                | FinlitError::ConfigError(_)
                | FinlitError::SerializationError(_)
                | FinlitError::HttpError(_)
                | FinlitError::IoError(_)
        )
    }
}
