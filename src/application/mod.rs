//! The use-case layer: orchestrates the ports in [`crate::domain`] into the platform's external
//! operations. Nothing outside `application` constructs an adapter directly — everything goes
//! through [`context::AppContext`].

pub mod api;
pub mod cache;
pub mod context;
pub mod fusion;
pub mod pipeline;
pub mod queue_worker;
pub mod retrieval;

pub use api::KbCore;
pub use context::AppContext;
pub use pipeline::ProcessingPipeline;
pub use queue_worker::QueueWorker;
pub use retrieval::RetrievalPipeline;
