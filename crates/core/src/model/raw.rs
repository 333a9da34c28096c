use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::question::{Difficulty, OPTION_COUNT, Provenance, Question, RejectReason};

/// A loosely-typed question record as it appears in catalog files or generator replies.
///
/// Fields of the wrong JSON type deserialize as absent, so one bad record never
/// aborts parsing of its neighbours; it is rejected later by [`RawQuestion::validate`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawQuestion {
    #[serde(default, alias = "text", deserialize_with = "lenient_string")]
    pub question: Option<String>,

    #[serde(default, deserialize_with = "lenient_options")]
    pub options: Option<Vec<String>>,

    #[serde(default, alias = "correct_index", deserialize_with = "lenient_index")]
    pub answer: Option<i64>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_string"
    )]
    pub explanation: Option<String>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_string"
    )]
    pub difficulty: Option<String>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_string"
    )]
    pub category: Option<String>,
}

impl RawQuestion {
    #[must_use]
    pub fn new<S: Into<String>>(
        question: impl Into<String>,
        options: impl IntoIterator<Item = S>,
        answer: i64,
    ) -> Self {
        Self {
            question: Some(question.into()),
            options: Some(options.into_iter().map(Into::into).collect()),
            answer: Some(answer),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    #[must_use]
    pub fn with_difficulty(mut self, difficulty: impl Into<String>) -> Self {
        self.difficulty = Some(difficulty.into());
        self
    }

    #[must_use]
    pub fn with_explanation(mut self, explanation: impl Into<String>) -> Self {
        self.explanation = Some(explanation.into());
        self
    }

    /// Check the record against the question invariants.
    ///
    /// `category` and `difficulty` override the record's own tags when given,
    /// which is how nested catalogs assign their group keys.
    ///
    /// # Errors
    ///
    /// Returns the first `RejectReason` found, checking text, options, answer
    /// and category in that order.
    pub fn validate(
        &self,
        category: Option<&str>,
        difficulty: Option<Difficulty>,
        source: Provenance,
    ) -> Result<Question, RejectReason> {
        let text = self
            .question
            .as_deref()
            .ok_or(RejectReason::MissingField { field: "question" })?;
        if text.trim().is_empty() {
            return Err(RejectReason::EmptyText { field: "question" });
        }

        let options = self
            .options
            .as_ref()
            .ok_or(RejectReason::MissingField { field: "options" })?;
        let options: [String; OPTION_COUNT] = options
            .clone()
            .try_into()
            .map_err(|opts: Vec<String>| RejectReason::WrongOptionCount { found: opts.len() })?;
        if options.iter().any(|o| o.trim().is_empty()) {
            return Err(RejectReason::EmptyText { field: "options" });
        }

        let answer = self
            .answer
            .ok_or(RejectReason::MissingField { field: "answer" })?;
        let correct_index = usize::try_from(answer)
            .ok()
            .filter(|i| *i < OPTION_COUNT)
            .ok_or(RejectReason::AnswerIndexOutOfRange { index: answer })?;

        let category = category
            .or(self.category.as_deref())
            .ok_or(RejectReason::MissingField { field: "category" })?;
        if category.trim().is_empty() {
            return Err(RejectReason::EmptyText { field: "category" });
        }

        let difficulty = difficulty.unwrap_or_else(|| {
            self.difficulty
                .as_deref()
                .map(Difficulty::from_label)
                .unwrap_or_default()
        });

        Ok(Question::from_parts(
            text.to_owned(),
            options,
            correct_index,
            category.to_owned(),
            difficulty,
            self.explanation.clone().filter(|e| !e.trim().is_empty()),
            source,
        ))
    }
}

impl From<&Question> for RawQuestion {
    fn from(q: &Question) -> Self {
        Self {
            question: Some(q.text().to_owned()),
            options: Some(q.options().to_vec()),
            answer: i64::try_from(q.correct_index()).ok(),
            explanation: q.explanation().map(str::to_owned),
            difficulty: Some(q.difficulty().as_str().to_owned()),
            category: Some(q.category().to_owned()),
        }
    }
}

//
// ─── LENIENT FIELD PARSING ─────────────────────────────────────────────────────
//

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s),
        _ => None,
    })
}

fn lenient_options<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    let Some(Value::Array(items)) = value else {
        return Ok(None);
    };
    Ok(Some(
        items
            .into_iter()
            .map(|item| match item {
                Value::String(s) => s,
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                _ => String::new(),
            })
            .collect(),
    ))
}

fn lenient_index<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => Some(number_index(&n)),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

/// A numeric answer is present even when it cannot be an index; anything that is
/// not an exact integer in `i64` range saturates to `i64::MAX` so it reads as
/// out of range rather than missing.
fn number_index(n: &serde_json::Number) -> i64 {
    if let Some(i) = n.as_i64() {
        return i;
    }
    match n.as_f64() {
        Some(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 => f as i64,
        _ => i64::MAX,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> RawQuestion {
        RawQuestion::new("Red planet?", ["Venus", "Mars", "Jupiter", "Saturn"], 1)
    }

    #[test]
    fn group_keys_override_record_tags() {
        let raw = sample().with_category("Ignored").with_difficulty("Easy");
        let q = raw
            .validate(Some("Space"), Some(Difficulty::Expert), Provenance::Static)
            .unwrap();
        assert_eq!(q.category(), "Space");
        assert_eq!(q.difficulty(), Difficulty::Expert);
    }

    #[test]
    fn flat_record_uses_own_tags_and_defaults_to_medium() {
        let q = sample()
            .with_category("Space")
            .validate(None, None, Provenance::Generated)
            .unwrap();
        assert_eq!(q.difficulty(), Difficulty::Medium);
        assert_eq!(q.source(), Provenance::Generated);
    }

    #[test]
    fn rejects_each_broken_shape() {
        let cat = Some("C");
        let src = Provenance::Static;

        let mut raw = sample();
        raw.question = None;
        assert_eq!(
            raw.validate(cat, None, src).unwrap_err(),
            RejectReason::MissingField { field: "question" }
        );

        let raw = RawQuestion::new("  ", ["a", "b", "c", "d"], 0);
        assert_eq!(
            raw.validate(cat, None, src).unwrap_err(),
            RejectReason::EmptyText { field: "question" }
        );

        let raw = RawQuestion::new("Q", ["a", "b", "c"], 0);
        assert_eq!(
            raw.validate(cat, None, src).unwrap_err(),
            RejectReason::WrongOptionCount { found: 3 }
        );

        let raw = RawQuestion::new("Q", ["a", "", "c", "d"], 0);
        assert_eq!(
            raw.validate(cat, None, src).unwrap_err(),
            RejectReason::EmptyText { field: "options" }
        );

        let raw = RawQuestion::new("Q", ["a", "b", "c", "d"], 4);
        assert_eq!(
            raw.validate(cat, None, src).unwrap_err(),
            RejectReason::AnswerIndexOutOfRange { index: 4 }
        );

        let raw = RawQuestion::new("Q", ["a", "b", "c", "d"], -1);
        assert_eq!(
            raw.validate(cat, None, src).unwrap_err(),
            RejectReason::AnswerIndexOutOfRange { index: -1 }
        );

        let raw = RawQuestion::new("Q", ["a", "b", "c", "d"], 0);
        assert_eq!(
            raw.validate(None, None, src).unwrap_err(),
            RejectReason::MissingField { field: "category" }
        );
    }

    #[test]
    fn deserializes_loose_json() {
        let raw: RawQuestion = serde_json::from_value(json!({
            "question": "Year SUPARCO was founded?",
            "options": [1947, 1961, "1973", 1985],
            "answer": "1",
            "difficulty": 3
        }))
        .unwrap();

        assert_eq!(raw.answer, Some(1));
        assert_eq!(raw.difficulty, None);
        assert_eq!(
            raw.options.as_deref(),
            Some(&["1947".to_string(), "1961".into(), "1973".into(), "1985".into()][..])
        );
    }

    #[test]
    fn wrong_typed_answer_reads_as_missing() {
        let raw: RawQuestion = serde_json::from_value(json!({
            "question": "Q",
            "options": ["a", "b", "c", "d"],
            "answer": "two"
        }))
        .unwrap();
        assert_eq!(
            raw.validate(Some("C"), None, Provenance::Static).unwrap_err(),
            RejectReason::MissingField { field: "answer" }
        );
    }

    #[test]
    fn integral_float_answer_is_accepted() {
        let raw: RawQuestion = serde_json::from_value(json!({
            "question": "Q",
            "options": ["a", "b", "c", "d"],
            "answer": 2.0
        }))
        .unwrap();
        let q = raw.validate(Some("C"), None, Provenance::Static).unwrap();
        assert_eq!(q.correct_index(), 2);
    }

    #[test]
    fn unrepresentable_numeric_answer_is_out_of_range() {
        for answer in [json!(18_446_744_073_709_551_615_u64), json!(1.5), json!(1e300)] {
            let raw: RawQuestion = serde_json::from_value(json!({
                "question": "Q",
                "options": ["a", "b", "c", "d"],
                "answer": answer
            }))
            .unwrap();
            assert!(
                matches!(
                    raw.validate(Some("C"), None, Provenance::Static),
                    Err(RejectReason::AnswerIndexOutOfRange { .. })
                ),
                "answer {answer} should be out of range"
            );
        }
    }
}
