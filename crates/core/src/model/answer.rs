use chrono::Duration;

/// One entry of a round's answer log.
///
/// `chosen_index` is `None` when the question timed out without an answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerRecord {
    pub question_index: usize,
    pub chosen_index: Option<usize>,
    pub correct: bool,
    pub elapsed: Option<Duration>,
}

/// What the caller learns after submitting an answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerOutcome {
    pub correct: bool,
    pub chosen_index: Option<usize>,
    pub correct_index: usize,
    pub score: u32,
    pub explanation: Option<String>,
}

impl AnswerOutcome {
    /// The question ran out of time, so no choice was recorded.
    #[must_use]
    pub fn timed_out(&self) -> bool {
        self.chosen_index.is_none()
    }
}
