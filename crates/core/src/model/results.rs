use super::answer::AnswerRecord;
use super::question::{Difficulty, Question};

/// Per-difficulty tally inside a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DifficultyBreakdown {
    pub difficulty: Difficulty,
    pub total: u32,
    pub answered: u32,
    pub correct: u32,
}

/// Score report for a round, complete or in progress.
#[derive(Debug, Clone, PartialEq)]
pub struct RoundResults {
    pub score: u32,
    pub total: u32,
    pub percentage: f64,
    pub category: String,
    pub difficulty: Option<Difficulty>,
    pub per_difficulty: Vec<DifficultyBreakdown>,
}

impl RoundResults {
    /// Tally a round from its active set and answer log.
    ///
    /// Log entries pointing outside `active_set` are ignored.
    #[must_use]
    pub fn from_log(
        category: &str,
        difficulty: Option<Difficulty>,
        active_set: &[Question],
        log: &[AnswerRecord],
    ) -> Self {
        let mut per_difficulty: Vec<DifficultyBreakdown> = Difficulty::ALL
            .iter()
            .map(|&d| DifficultyBreakdown {
                difficulty: d,
                total: 0,
                answered: 0,
                correct: 0,
            })
            .collect();

        for q in active_set {
            per_difficulty[slot(q.difficulty())].total += 1;
        }

        let mut score = 0_u32;
        for entry in log {
            let Some(q) = active_set.get(entry.question_index) else {
                continue;
            };
            let row = &mut per_difficulty[slot(q.difficulty())];
            row.answered = row.answered.saturating_add(1);
            if entry.correct {
                row.correct = row.correct.saturating_add(1);
                score = score.saturating_add(1);
            }
        }
        per_difficulty.retain(|row| row.total > 0);

        let total = u32::try_from(active_set.len()).unwrap_or(u32::MAX);
        let percentage = if total == 0 {
            0.0
        } else {
            f64::from(score) / f64::from(total) * 100.0
        };

        Self {
            score,
            total,
            percentage,
            category: category.to_owned(),
            difficulty,
            per_difficulty,
        }
    }

    /// Percentage rounded to one decimal place, for display only.
    #[must_use]
    pub fn percentage_display(&self) -> String {
        format!("{:.1}", self.percentage)
    }
}

fn slot(d: Difficulty) -> usize {
    match d {
        Difficulty::Easy => 0,
        Difficulty::Medium => 1,
        Difficulty::Hard => 2,
        Difficulty::Expert => 3,
    }
}
