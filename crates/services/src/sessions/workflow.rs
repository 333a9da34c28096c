use std::sync::Arc;

use chrono::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use quiz_core::Clock;
use quiz_core::model::RawQuestion;

use super::service::{GenerationApplied, GenerationTicket, QuizSession};
use crate::config::DEFAULT_TIME_LIMIT_SECS;
use crate::error::{GenerationError, SessionError};
use crate::source::{QuestionSource, RetryPolicy, validate_request};

type GenerationResult = Result<Vec<RawQuestion>, GenerationError>;

/// A generation request running on the tokio runtime.
#[derive(Debug)]
pub struct PendingGeneration {
    ticket: GenerationTicket,
    handle: JoinHandle<GenerationResult>,
}

impl PendingGeneration {
    #[must_use]
    pub fn ticket(&self) -> &GenerationTicket {
        &self.ticket
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the request and apply its result to `session`.
    ///
    /// If `session` moved on since the request began, returns `GenerationApplied::Ignored`.
    ///
    /// # Errors
    ///
    /// Returns `GenerationError` if the request failed or its batch was rejected.
    pub async fn finish(
        self,
        session: &mut QuizSession,
    ) -> Result<GenerationApplied, GenerationError> {
        let result = self
            .handle
            .await
            .unwrap_or_else(|e| Err(GenerationError::Transport(e.to_string())));
        session.apply_generation(self.ticket, result)
    }

    /// Stop the background request. The session slot is not released; call
    /// `QuizSession::cancel_generation` for that.
    pub fn abort(self) {
        self.handle.abort();
    }
}

/// Connects sessions to a question source with bounded retry.
#[derive(Clone)]
pub struct QuizLoopService {
    clock: Clock,
    source: Arc<dyn QuestionSource>,
    retry: RetryPolicy,
    time_limit: Option<Duration>,
}

impl QuizLoopService {
    #[must_use]
    pub fn new(clock: Clock, source: Arc<dyn QuestionSource>) -> Self {
        Self {
            clock,
            source,
            retry: RetryPolicy::default(),
            time_limit: Some(Duration::seconds(DEFAULT_TIME_LIMIT_SECS)),
        }
    }

    /// Answer window handed to every session this service creates.
    #[must_use]
    pub fn with_time_limit(mut self, limit: Option<Duration>) -> Self {
        self.time_limit = limit;
        self
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// A fresh session over the source's default catalog.
    #[must_use]
    pub fn new_session(&self) -> QuizSession {
        let catalog = self.source.load_default();
        debug!(questions = catalog.len(), "session created");
        QuizSession::new(catalog)
            .with_clock(self.clock)
            .with_time_limit(self.time_limit)
    }

    /// Reload the default catalog into `session`, e.g. after generation failed.
    pub fn reload_defaults(&self, session: &mut QuizSession) {
        session.reload_catalog(self.source.load_default());
    }

    /// Call the source with timeout and retry. Does not touch any session.
    ///
    /// # Errors
    ///
    /// Returns `GenerationError` from validation of the request or from the final attempt.
    pub async fn generate(&self, topic: &str, count: usize) -> GenerationResult {
        validate_request(topic, count)?;
        let result = self
            .retry
            .run(|attempt| {
                debug!(topic, count, attempt, "generation attempt");
                let source = Arc::clone(&self.source);
                let topic = topic.to_owned();
                async move { source.generate(&topic, count).await }
            })
            .await;
        match &result {
            Ok(records) => info!(topic, returned = records.len(), "generation finished"),
            Err(err) => info!(topic, error = %err, "generation failed"),
        }
        result
    }

    /// Generate into `session`, waiting inline for the result.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::GenerationPending` if another request is outstanding,
    /// or `SessionError::Generation` when generation or validation fails.
    pub async fn generate_into(
        &self,
        session: &mut QuizSession,
        topic: &str,
        count: usize,
    ) -> Result<GenerationApplied, SessionError> {
        let ticket = session.begin_generation(topic, count)?;
        let result = self.generate(ticket.topic(), ticket.count()).await;
        Ok(session.apply_generation(ticket, result)?)
    }

    /// Start generation in the background; the session stays usable meanwhile.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::GenerationPending` or `SessionError::Generation`
    /// for an invalid request.
    pub fn spawn_generation(
        &self,
        session: &mut QuizSession,
        topic: &str,
        count: usize,
    ) -> Result<PendingGeneration, SessionError> {
        let ticket = session.begin_generation(topic, count)?;
        let service = self.clone();
        let topic = ticket.topic().to_owned();
        let count = ticket.count();
        let handle = tokio::spawn(async move { service.generate(&topic, count).await });
        Ok(PendingGeneration { ticket, handle })
    }
}
