//! Error types for the geotutor engine
//!
//! Structured errors are defined with thiserror; anyhow is only used at the
//! binary boundary and converts into [`TutorError::Other`].

use crate::types::QuestionId;
use thiserror::Error;

/// Main error type for geotutor operations
#[derive(Error, Debug)]
pub enum TutorError {
    /// Unknown question, answer, theorem, triangle or session id
    #[error("Not found: {0}")]
    NotFound(String),

    /// No eligible question remains; the natural end of a session
    #[error("Session exhausted: no eligible question remains")]
    SessionExhausted,

    /// Answer submitted for a question other than the pending one
    #[error("Out-of-order answer: expected question {expected:?}, got {got}")]
    OutOfOrder {
        expected: Option<QuestionId>,
        got: QuestionId,
    },

    /// Operation not allowed in the session's current state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Malformed or unknown input value
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Database operation failed
    #[error("Database error: {0}")]
    Database(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

/// Coarse classification of errors, for callers that map them to responses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    InvalidState,
    InvalidInput,
    Internal,
}

impl TutorError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TutorError::NotFound(_) | TutorError::SessionExhausted => ErrorKind::NotFound,
            TutorError::OutOfOrder { .. } | TutorError::InvalidState(_) => ErrorKind::InvalidState,
            TutorError::InvalidInput(_) => ErrorKind::InvalidInput,
            TutorError::Database(_)
            | TutorError::Config(_)
            | TutorError::Io(_)
            | TutorError::Serialization(_)
            | TutorError::Other(_) => ErrorKind::Internal,
        }
    }

    /// True for the natural end-of-session signal from the question selector
    pub fn is_exhausted(&self) -> bool {
        matches!(self, TutorError::SessionExhausted)
    }
}

/// Result type alias for geotutor operations
pub type Result<T> = std::result::Result<T, TutorError>;

/// Convert anyhow::Error to TutorError
impl From<anyhow::Error> for TutorError {
    fn from(err: anyhow::Error) -> Self {
        TutorError::Other(err.to_string())
    }
}
