//! [`crate::domain::ports::embedding::EmbeddingProvider`] implementations.

mod mock;
mod openai;

pub use mock::MockEmbeddingProvider;
pub use openai::{OpenAiCompatibleConfig, OpenAiCompatibleProvider};
