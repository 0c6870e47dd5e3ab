//! [`crate::domain::ports::vector_store::VectorStoreProvider`] implementations.

mod memory;

#[cfg(feature = "vectorstore-http")]
mod http;

pub use memory::InMemoryVectorStoreProvider;

#[cfg(feature = "vectorstore-http")]
pub use http::{DistanceMetric, HttpVectorStoreConfig, HttpVectorStoreProvider};
