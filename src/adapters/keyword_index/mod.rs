//! [`crate::domain::ports::keyword_index::KeywordIndexProvider`] implementations.

mod substring;
#[cfg(feature = "catalog-postgres")]
mod postgres_fts;

pub use substring::SubstringKeywordIndexProvider;
#[cfg(feature = "catalog-postgres")]
pub use postgres_fts::{PostgresKeywordIndexConfig, PostgresKeywordIndexProvider};
