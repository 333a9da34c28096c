//! Environment-driven configuration.
//!
//! Every reader has a `*_from` form taking a lookup function so tests can
//! supply variables without touching the process environment.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::Duration;

pub const CATALOG_PATH_VAR: &str = "QUIZ_CATALOG_PATH";
pub const API_KEY_VAR: &str = "QUIZ_AI_API_KEY";
pub const BASE_URL_VAR: &str = "QUIZ_AI_BASE_URL";
pub const MODEL_VAR: &str = "QUIZ_AI_MODEL";
pub const TIME_LIMIT_VAR: &str = "QUIZ_TIME_LIMIT_SECS";

pub const DEFAULT_CATALOG_PATH: &str = "quiz_questions.json";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_TIME_LIMIT_SECS: i64 = 15;

pub(crate) fn process_env(key: &str) -> Option<String> {
    env::var(key).ok()
}

/// Trimmed value of `key`, treating blank as unset.
pub(crate) fn text(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key)
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

/// `key` parsed as a number; unparseable values read as unset.
pub(crate) fn number<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Option<T> {
    text(lookup, key)?.parse().ok()
}

/// Catalog file location: `QUIZ_CATALOG_PATH`, else `quiz_questions.json`.
#[must_use]
pub fn catalog_path_from_env() -> PathBuf {
    catalog_path_from(process_env)
}

#[must_use]
pub fn catalog_path_from(lookup: impl Fn(&str) -> Option<String>) -> PathBuf {
    text(&lookup, CATALOG_PATH_VAR)
        .map_or_else(|| PathBuf::from(DEFAULT_CATALOG_PATH), PathBuf::from)
}

/// Per-question answer window: `QUIZ_TIME_LIMIT_SECS`, default 15 s; `0` turns it off.
#[must_use]
pub fn time_limit_from_env() -> Option<Duration> {
    time_limit_from(process_env)
}

#[must_use]
pub fn time_limit_from(lookup: impl Fn(&str) -> Option<String>) -> Option<Duration> {
    let secs = number::<i64>(&lookup, TIME_LIMIT_VAR)
        .filter(|s| *s >= 0)
        .unwrap_or(DEFAULT_TIME_LIMIT_SECS);
    (secs > 0).then(|| Duration::seconds(secs))
}

/// Connection settings for an OpenAI-compatible chat completions endpoint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GeneratorConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

impl GeneratorConfig {
    /// `None` when `QUIZ_AI_API_KEY` is unset or blank, which disables generation.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(process_env)
    }

    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        Some(Self {
            api_key: text(&lookup, API_KEY_VAR)?,
            base_url: text(&lookup, BASE_URL_VAR).unwrap_or_else(|| DEFAULT_BASE_URL.into()),
            model: text(&lookup, MODEL_VAR).unwrap_or_else(|| DEFAULT_MODEL.into()),
        })
    }

    #[must_use]
    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}
