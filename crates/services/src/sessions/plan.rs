use rand::Rng;
use rand::seq::SliceRandom;

use quiz_core::filter_questions;
use quiz_core::model::{Difficulty, Question};

/// Questions selected and ordered for one round.
#[derive(Debug, Clone, PartialEq)]
pub struct RoundPlan {
    pub category: String,
    pub difficulty: Option<Difficulty>,
    pub questions: Vec<Question>,
}

impl RoundPlan {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}

/// Filters a question pool by category/difficulty and shuffles the result.
pub struct RoundBuilder<'a> {
    category: &'a str,
    difficulty: Option<Difficulty>,
}

impl<'a> RoundBuilder<'a> {
    #[must_use]
    pub fn new(category: &'a str) -> Self {
        Self {
            category,
            difficulty: None,
        }
    }

    #[must_use]
    pub fn with_difficulty(mut self, difficulty: Option<Difficulty>) -> Self {
        self.difficulty = difficulty;
        self
    }

    /// Every permutation of the filtered questions is equally likely.
    pub fn build<R: Rng + ?Sized>(self, pool: &[Question], rng: &mut R) -> RoundPlan {
        let mut questions = filter_questions(pool, self.category, self.difficulty);
        questions.as_mut_slice().shuffle(rng);
        RoundPlan {
            category: self.category.to_owned(),
            difficulty: self.difficulty,
            questions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::default_catalog;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn plan_contains_exactly_the_filtered_questions() {
        let catalog = default_catalog();
        let mut rng = StdRng::seed_from_u64(7);

        let plan = RoundBuilder::new("Pakistan").build(catalog.questions(), &mut rng);

        let mut expected: Vec<_> = catalog
            .filter("Pakistan", None)
            .iter()
            .map(|q| q.text().to_owned())
            .collect();
        let mut got: Vec<_> = plan.questions.iter().map(|q| q.text().to_owned()).collect();
        expected.sort();
        got.sort();
        assert_eq!(got, expected);
        assert_eq!(plan.category, "Pakistan");
    }

    #[test]
    fn difficulty_narrows_the_plan() {
        let catalog = default_catalog();
        let mut rng = StdRng::seed_from_u64(1);

        let plan = RoundBuilder::new("Pakistan")
            .with_difficulty(Some(Difficulty::Easy))
            .build(catalog.questions(), &mut rng);

        assert_eq!(plan.questions.len(), 2);
        assert!(plan.questions.iter().all(|q| q.difficulty() == Difficulty::Easy));
    }

    #[test]
    fn unknown_category_yields_empty_plan() {
        let catalog = default_catalog();
        let mut rng = StdRng::seed_from_u64(1);
        let plan = RoundBuilder::new("Geology").build(catalog.questions(), &mut rng);
        assert!(plan.is_empty());
    }

    #[test]
    fn shuffle_reaches_every_order_of_three() {
        let catalog = default_catalog();
        let pool = catalog.filter("Science", None);
        let pool = &pool[..3];
        let mut rng = StdRng::seed_from_u64(42);

        let mut seen = std::collections::HashSet::new();
        for _ in 0..200 {
            let plan = RoundBuilder::new("Science").build(pool, &mut rng);
            seen.insert(
                plan.questions
                    .iter()
                    .map(|q| q.text().to_owned())
                    .collect::<Vec<_>>(),
            );
        }
        assert_eq!(seen.len(), 6);
    }
}
