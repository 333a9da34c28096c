mod answer;
mod question;
mod raw;
mod results;

pub use answer::{AnswerOutcome, AnswerRecord};
pub use question::{Difficulty, OPTION_COUNT, Provenance, Question, RejectReason};
pub use raw::RawQuestion;
pub use results::{DifficultyBreakdown, RoundResults};
