//! Concrete implementations of the `domain::ports` traits.
//!
//! Application code never names a type from this module directly outside of startup wiring
//! (`application::context::AppContext::build`); everywhere else it depends on `Arc<dyn Trait>`.

pub mod cache;
pub mod catalog;
pub mod embedding;
pub mod keyword_index;
pub mod object_store;
pub mod queue;
pub mod rerank;
pub mod vector_store;
