//! Shared error types for the services crate.

use thiserror::Error;

use quiz_core::CatalogError;
use quiz_core::model::Difficulty;

use crate::sessions::RoundState;

/// Errors emitted by `QuizSession`. A failed call leaves the session unchanged.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionError {
    #[error(
        "no questions in category `{category}` (difficulty: {})",
        .difficulty.map_or("any", Difficulty::as_str)
    )]
    EmptyCategory {
        category: String,
        difficulty: Option<Difficulty>,
    },
    #[error("`{operation}` is not valid while the session is {state}")]
    InvalidState {
        operation: &'static str,
        state: RoundState,
    },
    #[error("question {question_index} has already been answered")]
    AlreadyAnswered { question_index: usize },
    #[error("question {question_index} has not been answered yet")]
    NotAnswered { question_index: usize },
    #[error("a generation request is already outstanding for this session")]
    GenerationPending,
    #[error(transparent)]
    Generation(#[from] GenerationError),
}

/// Errors emitted by a question generator.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum GenerationError {
    #[error("question generation timed out")]
    Timeout,
    #[error("generator returned malformed data: {0}")]
    Malformed(String),
    #[error("requested {requested} questions, generator returned {returned}")]
    CountMismatch { requested: usize, returned: usize },
    #[error("question generator is not available")]
    Unavailable,
    #[error("invalid generation request: {0}")]
    InvalidRequest(String),
    #[error("generator request failed: {0}")]
    Transport(String),
}

impl GenerationError {
    /// Only timeouts and transport hiccups are worth another attempt.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout | Self::Transport(_))
    }
}

impl From<reqwest::Error> for GenerationError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_decode() {
            Self::Malformed(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

/// Errors emitted while reading or writing catalog files.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SourceError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
