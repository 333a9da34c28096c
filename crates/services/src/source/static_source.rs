use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, warn};

use quiz_core::model::{Provenance, RawQuestion};
use quiz_core::{QuestionCatalog, RawCatalog, RawInput, default_catalog, normalize};

use super::QuestionSource;
use crate::config::catalog_path_from_env;
use crate::error::{GenerationError, SourceError};

/// Catalog-only source backed by a JSON file, falling back to built-in questions.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    path: Option<PathBuf>,
}

impl StaticSource {
    /// Always serve the built-in questions.
    #[must_use]
    pub fn builtin() -> Self {
        Self { path: None }
    }

    #[must_use]
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    /// Use `QUIZ_CATALOG_PATH`, or `quiz_questions.json` in the working directory.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_path(catalog_path_from_env())
    }

    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Read and validate a nested catalog file. Invalid records are skipped and logged.
    ///
    /// # Errors
    ///
    /// Returns `SourceError` if the file cannot be read or is not a nested catalog.
    pub fn load_from_path(path: &Path) -> Result<QuestionCatalog, SourceError> {
        let text = fs::read_to_string(path)?;
        let raw = RawCatalog::from_json_str(&text)?;
        let normalized = normalize(&RawInput::Nested(raw), Provenance::Static);
        for rejected in &normalized.rejected {
            warn!(
                path = %path.display(),
                question = rejected.record.question.as_deref().unwrap_or("<missing>"),
                reason = %rejected.reason,
                "skipping invalid catalog record"
            );
        }
        Ok(QuestionCatalog::from(normalized))
    }

    /// Write `catalog` in the nested `category -> difficulty -> [record]` format.
    ///
    /// # Errors
    ///
    /// Returns `SourceError` if serialization or the write fails.
    pub fn save_catalog(path: &Path, catalog: &QuestionCatalog) -> Result<(), SourceError> {
        let document = RawCatalog::from_questions(catalog.iter()).to_value();
        let text = serde_json::to_string_pretty(&document)?;
        fs::write(path, text)?;
        debug!(path = %path.display(), questions = catalog.len(), "catalog saved");
        Ok(())
    }
}

#[async_trait]
impl QuestionSource for StaticSource {
    fn load_default(&self) -> QuestionCatalog {
        let Some(path) = self.path.as_deref() else {
            return default_catalog();
        };
        match Self::load_from_path(path) {
            Ok(catalog) if !catalog.is_empty() => catalog,
            Ok(_) => {
                warn!(
                    path = %path.display(),
                    "catalog file has no valid questions, using built-in set"
                );
                default_catalog()
            }
            Err(err) => {
                debug!(
                    path = %path.display(),
                    error = %err,
                    "catalog file unavailable, using built-in set"
                );
                default_catalog()
            }
        }
    }

    async fn generate(
        &self,
        _topic: &str,
        _count: usize,
    ) -> Result<Vec<RawQuestion>, GenerationError> {
        Err(GenerationError::Unavailable)
    }
}
