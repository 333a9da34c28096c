#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod sessions;
pub mod source;

pub use quiz_core::Clock;

pub use config::GeneratorConfig;
pub use error::{GenerationError, SessionError, SourceError};
pub use sessions::{
    GenerationApplied, GenerationTicket, PendingGeneration, QuizLoopService, QuizSession,
    RoundProgress, RoundState,
};
pub use source::{HttpQuestionSource, QuestionSource, RetryPolicy, StaticSource};
