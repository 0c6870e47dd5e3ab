//! At-least-once processing task queue.

use crate::domain::error::Result;
use async_trait::async_trait;
use uuid::Uuid;

/// A unit of work: "process this document". The queue is intentionally ignorant of what
/// processing means — that's the application layer's job.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ProcessingTask {
    /// Unique task id, distinct from the document id (a document may be re-enqueued).
    pub id: Uuid,
    /// The document to process.
    pub document_id: Uuid,
    /// The document's owning KB, carried to avoid a catalog round trip on dequeue.
    pub kb_id: Uuid,
    /// True if this enqueue should bypass the `Completed`/`Failed` skip check and reprocess
    /// from scratch.
    pub force: bool,
    /// Number of times this task has been redelivered after a missed ack.
    pub delivery_count: u32,
    /// When the task was first enqueued.
    pub enqueued_at: chrono::DateTime<chrono::Utc>,
}

/// A leased task handed to a worker, carrying the token needed to ack or nack it.
#[derive(Debug, Clone)]
pub struct LeasedTask {
    /// The underlying task.
    pub task: ProcessingTask,
    /// Opaque lease token; must be presented to [`TaskQueue::ack`] or [`TaskQueue::nack`].
    pub lease_token: Uuid,
}

/// An at-least-once delivery queue of [`ProcessingTask`]s with visibility timeouts: a leased
/// task becomes visible to other workers again if not acked within the timeout, and redelivery
/// increments `delivery_count`.
#[async_trait]
pub trait TaskQueue: Send + Sync {
    /// Enqueue a task for processing.
    async fn enqueue(&self, document_id: Uuid, kb_id: Uuid, force: bool) -> Result<Uuid>;

    /// Lease the next available task, making it invisible to other callers for `visibility_timeout`.
    /// Returns `Ok(None)` if the queue is empty.
    async fn lease(&self, visibility_timeout: std::time::Duration) -> Result<Option<LeasedTask>>;

    /// Acknowledge successful processing; removes the task permanently.
    async fn ack(&self, task_id: Uuid, lease_token: Uuid) -> Result<()>;

    /// Return a task to the queue immediately (explicit failure, as opposed to a lease timeout).
    async fn nack(&self, task_id: Uuid, lease_token: Uuid) -> Result<()>;

    /// Number of tasks neither acked nor currently leased.
    async fn depth(&self) -> Result<usize>;

    /// Number of tasks currently leased (in flight).
    async fn in_flight(&self) -> Result<usize>;
}
