//! Question sources: where catalogs and generated questions come from.

mod http;
pub mod retry;
mod static_source;

use async_trait::async_trait;

use quiz_core::QuestionCatalog;
use quiz_core::model::RawQuestion;

use crate::error::GenerationError;

pub use http::HttpQuestionSource;
pub use retry::RetryPolicy;
pub use static_source::StaticSource;

/// Largest batch a generator may be asked for.
pub const MAX_GENERATE_COUNT: usize = 20;

/// Supplies the baked-in catalog and, optionally, topic-specific questions.
#[async_trait]
pub trait QuestionSource: Send + Sync {
    /// The static catalog. Never fails; missing files fall back to built-in questions.
    fn load_default(&self) -> QuestionCatalog;

    /// Ask for `count` questions about `topic`.
    ///
    /// Returns raw records; callers validate them before use.
    ///
    /// # Errors
    ///
    /// Returns `GenerationError` on timeout, transport failure, unparseable
    /// replies, or when no generator is configured.
    async fn generate(&self, topic: &str, count: usize)
    -> Result<Vec<RawQuestion>, GenerationError>;
}

/// Reject requests no generator should ever see.
///
/// # Errors
///
/// Returns `GenerationError::InvalidRequest` for a blank topic or a count outside `1..=20`.
pub fn validate_request(topic: &str, count: usize) -> Result<(), GenerationError> {
    if topic.trim().is_empty() {
        return Err(GenerationError::InvalidRequest("topic is empty".into()));
    }
    if !(1..=MAX_GENERATE_COUNT).contains(&count) {
        return Err(GenerationError::InvalidRequest(format!(
            "count {count} is outside 1..={MAX_GENERATE_COUNT}"
        )));
    }
    Ok(())
}
