mod plan;
mod progress;
mod service;
mod workflow;

// Public API of the session subsystem.
pub use crate::error::SessionError;
pub use plan::{RoundBuilder, RoundPlan};
pub use progress::RoundProgress;
pub use service::{GenerationApplied, GenerationTicket, QuizSession, RoundState};
pub use workflow::{PendingGeneration, QuizLoopService};
