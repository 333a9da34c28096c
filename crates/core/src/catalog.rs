//! Question ingestion: turning raw catalog documents into validated questions.

use std::fmt;
use std::marker::PhantomData;

use serde::de::{IgnoredAny, MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::model::{Difficulty, Provenance, Question, RawQuestion, RejectReason};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// Structural problems with a catalog document as a whole.
///
/// Individual bad records are not errors; they end up in [`Normalized::rejected`].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CatalogError {
    #[error("catalog is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("expected {expected} at `{path}`")]
    Shape {
        path: String,
        expected: &'static str,
    },
}

//
// ─── RAW INPUT ─────────────────────────────────────────────────────────────────
//

/// Records grouped under one difficulty label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DifficultyGroup {
    pub label: String,
    pub records: Vec<RawQuestion>,
}

/// All difficulty groups of one category, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryGroup {
    pub name: String,
    pub difficulties: Vec<DifficultyGroup>,
}

/// Nested `category -> difficulty -> [record]` document, order preserved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawCatalog {
    pub categories: Vec<CategoryGroup>,
}

impl RawCatalog {
    /// Parse a nested catalog document.
    ///
    /// Repeated category keys, and repeated difficulty keys within a category,
    /// are merged in document order rather than overwriting each other.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Json` for unparseable text and `CatalogError::Shape`
    /// when the nesting is not object → object → array.
    pub fn from_json_str(text: &str) -> Result<Self, CatalogError> {
        let root: Node<Node<Value>> = serde_json::from_str(text)?;
        Self::from_node(root)
    }

    /// Build from an already-parsed JSON value.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Shape` when the nesting is wrong.
    pub fn from_value(value: Value) -> Result<Self, CatalogError> {
        let root: Node<Node<Value>> = serde_json::from_value(value)?;
        Self::from_node(root)
    }

    fn from_node(root: Node<Node<Value>>) -> Result<Self, CatalogError> {
        let Node::Object(Entries(root)) = root else {
            return Err(CatalogError::Shape {
                path: "$".into(),
                expected: "an object of categories",
            });
        };

        let mut catalog = Self::default();
        for (name, groups) in root {
            let Node::Object(Entries(groups)) = groups else {
                return Err(CatalogError::Shape {
                    path: name,
                    expected: "an object of difficulty groups",
                });
            };

            let category = catalog.category_mut(&name);
            for (label, records) in groups {
                let Value::Array(items) = records else {
                    return Err(CatalogError::Shape {
                        path: format!("{name}.{label}"),
                        expected: "an array of questions",
                    });
                };
                category
                    .group_mut(&label)
                    .records
                    .extend(items.into_iter().map(record_from_value));
            }
        }

        Ok(catalog)
    }

    /// Group validated questions back into the nested document shape.
    #[must_use]
    pub fn from_questions<'a>(questions: impl IntoIterator<Item = &'a Question>) -> Self {
        let mut catalog = Self::default();
        for q in questions {
            let mut record = RawQuestion::from(q);
            record.category = None;
            record.difficulty = None;
            catalog
                .category_mut(q.category())
                .group_mut(q.difficulty().as_str())
                .records
                .push(record);
        }
        catalog
    }

    fn category_mut(&mut self, name: &str) -> &mut CategoryGroup {
        let pos = match self.categories.iter().position(|c| c.name == name) {
            Some(pos) => pos,
            None => {
                self.categories.push(CategoryGroup {
                    name: name.to_owned(),
                    difficulties: Vec::new(),
                });
                self.categories.len() - 1
            }
        };
        &mut self.categories[pos]
    }

    /// Render as a nested JSON value, keeping group order.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut root = Map::new();
        for category in &self.categories {
            let mut groups = Map::new();
            for group in &category.difficulties {
                let records = group
                    .records
                    .iter()
                    .map(|r| serde_json::to_value(r).unwrap_or(Value::Null))
                    .collect();
                groups.insert(group.label.clone(), Value::Array(records));
            }
            root.insert(category.name.clone(), Value::Object(groups));
        }
        Value::Object(root)
    }
}

impl CategoryGroup {
    fn group_mut(&mut self, label: &str) -> &mut DifficultyGroup {
        let pos = match self.difficulties.iter().position(|g| g.label == label) {
            Some(pos) => pos,
            None => {
                self.difficulties.push(DifficultyGroup {
                    label: label.to_owned(),
                    records: Vec::new(),
                });
                self.difficulties.len() - 1
            }
        };
        &mut self.difficulties[pos]
    }
}

/// A JSON object read entry by entry, so repeated keys all survive.
struct Entries<T>(Vec<(String, T)>);

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Entries<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct EntriesVisitor<T>(PhantomData<T>);

        impl<'de, T: Deserialize<'de>> Visitor<'de> for EntriesVisitor<T> {
            type Value = Entries<T>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a JSON object")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some(entry) = map.next_entry::<String, T>()? {
                    entries.push(entry);
                }
                Ok(Entries(entries))
            }
        }

        deserializer.deserialize_map(EntriesVisitor(PhantomData))
    }
}

/// An object level of the catalog document, or whatever stood in its place.
#[derive(Deserialize)]
#[serde(untagged)]
enum Node<T> {
    Object(Entries<T>),
    Other(#[allow(dead_code)] IgnoredAny),
}

fn record_from_value(value: Value) -> RawQuestion {
    // RawQuestion fields are lenient, so only a non-object can fail here.
    serde_json::from_value(value).unwrap_or_default()
}

/// Either shape of input accepted by [`normalize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawInput {
    /// Grouped catalog; group keys supply category and difficulty.
    Nested(RawCatalog),
    /// Flat list; every record carries its own category.
    Flat(Vec<RawQuestion>),
}

//
// ─── NORMALIZATION ─────────────────────────────────────────────────────────────
//

/// A record refused at ingestion, with the reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejected {
    pub record: RawQuestion,
    pub reason: RejectReason,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Normalized {
    pub questions: Vec<Question>,
    pub rejected: Vec<Rejected>,
}

impl Normalized {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty()
    }
}

/// Validate every record of `raw`, keeping input order.
///
/// Pure: the same input always yields the same questions in the same order.
#[must_use]
pub fn normalize(raw: &RawInput, source: Provenance) -> Normalized {
    let mut out = Normalized::default();
    match raw {
        RawInput::Nested(catalog) => {
            for category in &catalog.categories {
                for group in &category.difficulties {
                    let difficulty = Difficulty::from_label(&group.label);
                    for record in &group.records {
                        out.admit(record, Some(&category.name), Some(difficulty), source);
                    }
                }
            }
        }
        RawInput::Flat(records) => {
            for record in records {
                out.admit(record, None, None, source);
            }
        }
    }
    out
}

impl Normalized {
    fn admit(
        &mut self,
        record: &RawQuestion,
        category: Option<&str>,
        difficulty: Option<Difficulty>,
        source: Provenance,
    ) {
        match record.validate(category, difficulty, source) {
            Ok(q) => self.questions.push(q),
            Err(reason) => self.rejected.push(Rejected {
                record: record.clone(),
                reason,
            }),
        }
    }
}

//
// ─── CATALOG ───────────────────────────────────────────────────────────────────
//

/// Number of questions available in one category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryCount {
    pub category: String,
    pub count: usize,
}

/// The full, ordered set of questions known to a session.
///
/// Never mutated in place; growing it produces a new value via [`QuestionCatalog::extended`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuestionCatalog {
    questions: Vec<Question>,
}

impl QuestionCatalog {
    #[must_use]
    pub fn new(questions: Vec<Question>) -> Self {
        Self { questions }
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn iter(&self) -> impl Iterator<Item = &Question> {
        self.questions.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Categories in first-seen order with their question counts.
    #[must_use]
    pub fn categories(&self) -> Vec<CategoryCount> {
        let mut counts: Vec<CategoryCount> = Vec::new();
        for q in &self.questions {
            match counts.iter_mut().find(|c| c.category == q.category()) {
                Some(entry) => entry.count += 1,
                None => counts.push(CategoryCount {
                    category: q.category().to_owned(),
                    count: 1,
                }),
            }
        }
        counts
    }

    #[must_use]
    pub fn filter(&self, category: &str, difficulty: Option<Difficulty>) -> Vec<Question> {
        filter_questions(&self.questions, category, difficulty)
    }

    /// A new catalog holding this one's questions followed by `batch`.
    #[must_use]
    pub fn extended(&self, batch: &[Question]) -> Self {
        let mut questions = Vec::with_capacity(self.questions.len() + batch.len());
        questions.extend_from_slice(&self.questions);
        questions.extend_from_slice(batch);
        Self { questions }
    }
}

impl From<Normalized> for QuestionCatalog {
    fn from(normalized: Normalized) -> Self {
        Self::new(normalized.questions)
    }
}

/// Questions of `pool` in `category` (and `difficulty`, when given), in pool order.
#[must_use]
pub fn filter_questions(
    pool: &[Question],
    category: &str,
    difficulty: Option<Difficulty>,
) -> Vec<Question> {
    pool.iter()
        .filter(|q| q.matches(category, difficulty))
        .cloned()
        .collect()
}
