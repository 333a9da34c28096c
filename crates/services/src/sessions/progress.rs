use chrono::Duration;

/// Aggregated view of round progress, useful for a score/position header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundProgress {
    pub total: usize,
    pub answered: usize,
    pub remaining: usize,
    pub score: u32,
    pub is_complete: bool,
    /// Countdown for the current question, when it is open and a limit is set.
    pub time_remaining: Option<Duration>,
}
