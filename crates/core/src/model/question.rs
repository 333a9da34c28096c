use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Every admitted question has exactly this many options.
pub const OPTION_COUNT: usize = 4;

//
// ─── DIFFICULTY ────────────────────────────────────────────────────────────────
//

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
    Expert,
}

impl Difficulty {
    pub const ALL: [Difficulty; 4] = [
        Difficulty::Easy,
        Difficulty::Medium,
        Difficulty::Hard,
        Difficulty::Expert,
    ];

    /// Parse a free-form label. Unknown labels fall back to `Medium`.
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "easy" => Self::Easy,
            "hard" => Self::Hard,
            "expert" => Self::Expert,
            _ => Self::Medium,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Easy => "Easy",
            Self::Medium => "Medium",
            Self::Hard => "Hard",
            Self::Expert => "Expert",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a question came from. Informational only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Provenance {
    Static,
    Generated,
}

//
// ─── VALIDATION ERRORS ─────────────────────────────────────────────────────────
//

/// Why a raw record was refused at ingestion.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum RejectReason {
    #[error("missing field `{field}`")]
    MissingField { field: &'static str },

    #[error("expected {OPTION_COUNT} options, found {found}")]
    WrongOptionCount { found: usize },

    #[error("answer index {index} is outside 0..{OPTION_COUNT}")]
    AnswerIndexOutOfRange { index: i64 },

    #[error("field `{field}` is empty")]
    EmptyText { field: &'static str },
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// A validated multiple-choice question.
///
/// Only obtainable through [`crate::model::RawQuestion::validate`], so holding one
/// means the four-option and answer-range invariants hold.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Question {
    text: String,
    options: [String; OPTION_COUNT],
    correct_index: usize,
    category: String,
    difficulty: Difficulty,
    explanation: Option<String>,
    source: Provenance,
}

impl Question {
    pub(crate) fn from_parts(
        text: String,
        options: [String; OPTION_COUNT],
        correct_index: usize,
        category: String,
        difficulty: Difficulty,
        explanation: Option<String>,
        source: Provenance,
    ) -> Self {
        debug_assert!(correct_index < OPTION_COUNT);
        Self {
            text,
            options,
            correct_index,
            category,
            difficulty,
            explanation,
            source,
        }
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn options(&self) -> &[String; OPTION_COUNT] {
        &self.options
    }

    #[must_use]
    pub fn correct_index(&self) -> usize {
        self.correct_index
    }

    #[must_use]
    pub fn correct_option(&self) -> &str {
        &self.options[self.correct_index]
    }

    #[must_use]
    pub fn category(&self) -> &str {
        &self.category
    }

    #[must_use]
    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    #[must_use]
    pub fn explanation(&self) -> Option<&str> {
        self.explanation.as_deref()
    }

    #[must_use]
    pub fn source(&self) -> Provenance {
        self.source
    }

    /// Any index other than the correct one, including out-of-range ones, is wrong.
    #[must_use]
    pub fn is_correct(&self, choice: usize) -> bool {
        choice == self.correct_index
    }

    #[must_use]
    pub fn matches(&self, category: &str, difficulty: Option<Difficulty>) -> bool {
        self.category == category && difficulty.is_none_or(|d| d == self.difficulty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_labels_normalize_to_medium() {
        assert_eq!(Difficulty::from_label("EXPERT"), Difficulty::Expert);
        assert_eq!(Difficulty::from_label(" easy "), Difficulty::Easy);
        assert_eq!(Difficulty::from_label("Legendary"), Difficulty::Medium);
        assert_eq!(Difficulty::from_label(""), Difficulty::Medium);
    }

    #[test]
    fn out_of_range_choice_is_incorrect() {
        let q = Question::from_parts(
            "2 + 2?".into(),
            ["1".into(), "2".into(), "3".into(), "4".into()],
            3,
            "Math".into(),
            Difficulty::Easy,
            None,
            Provenance::Static,
        );
        assert!(q.is_correct(3));
        assert!(!q.is_correct(0));
        assert!(!q.is_correct(99));
        assert_eq!(q.correct_option(), "4");
    }

    #[test]
    fn matches_ignores_difficulty_when_unset() {
        let q = Question::from_parts(
            "Q".into(),
            ["a".into(), "b".into(), "c".into(), "d".into()],
            0,
            "Science".into(),
            Difficulty::Hard,
            None,
            Provenance::Generated,
        );
        assert!(q.matches("Science", None));
        assert!(q.matches("Science", Some(Difficulty::Hard)));
        assert!(!q.matches("Science", Some(Difficulty::Easy)));
        assert!(!q.matches("science", None));
    }
}
