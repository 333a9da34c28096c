#![forbid(unsafe_code)]

pub mod catalog;
pub mod defaults;
pub mod model;
pub mod time;

pub use catalog::{
    CatalogError, CategoryCount, Normalized, QuestionCatalog, RawCatalog, RawInput, Rejected,
    filter_questions, normalize,
};
pub use defaults::default_catalog;
pub use time::Clock;
