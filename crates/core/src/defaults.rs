//! Built-in question set used when no catalog file is available.

use crate::catalog::{Normalized, QuestionCatalog, RawCatalog, RawInput, normalize};
use crate::model::Provenance;

const DEFAULT_QUESTIONS_JSON: &str = include_str!("data/default_questions.json");

/// The embedded default document, parsed into its nested shape.
#[must_use]
pub fn default_raw_catalog() -> RawCatalog {
    // The document is compiled in and covered by tests below.
    RawCatalog::from_json_str(DEFAULT_QUESTIONS_JSON).unwrap_or_default()
}

/// The built-in catalog, already validated.
#[must_use]
pub fn default_catalog() -> QuestionCatalog {
    QuestionCatalog::from(default_normalized())
}

fn default_normalized() -> Normalized {
    normalize(&RawInput::Nested(default_raw_catalog()), Provenance::Static)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Difficulty;

    #[test]
    fn embedded_document_parses_cleanly() {
        assert!(RawCatalog::from_json_str(DEFAULT_QUESTIONS_JSON).is_ok());
        let normalized = default_normalized();
        assert!(normalized.is_clean(), "{:?}", normalized.rejected);
        assert_eq!(normalized.questions.len(), 17);
    }

    #[test]
    fn every_category_covers_every_difficulty() {
        let catalog = default_catalog();
        let names: Vec<_> = catalog
            .categories()
            .into_iter()
            .map(|c| c.category)
            .collect();
        assert_eq!(
            names,
            vec!["Pakistan", "Science", "Math", "General Knowledge"]
        );

        for name in &names {
            for difficulty in Difficulty::ALL {
                assert!(
                    !catalog.filter(name, Some(difficulty)).is_empty(),
                    "{name}/{difficulty} is empty"
                );
            }
        }
    }
}
