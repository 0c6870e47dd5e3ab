//! Bounded worker pool draining the task queue into the processing pipeline.

use crate::application::pipeline::ProcessingPipeline;
use crate::domain::error::Result;
use crate::domain::ports::queue::TaskQueue;
use std::sync::Arc;
use std::time::Duration;

/// How long a worker sleeps after finding the queue empty before polling again.
const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Runs `worker_concurrency` independent polling loops against a [`TaskQueue`], handing each
/// leased task to a [`ProcessingPipeline`] and ack/nack-ing based on the outcome.
pub struct QueueWorker {
    queue: Arc<dyn TaskQueue>,
    pipeline: Arc<ProcessingPipeline>,
    visibility_timeout: Duration,
    concurrency: usize,
}

impl QueueWorker {
    /// Build a worker pool.
    pub fn new(queue: Arc<dyn TaskQueue>, pipeline: Arc<ProcessingPipeline>, visibility_timeout: Duration, concurrency: usize) -> Self {
        Self {
            queue,
            pipeline,
            visibility_timeout,
            concurrency: concurrency.max(1),
        }
    }

    /// Runs the worker pool until the process exits. Each worker loop runs on its own spawned
    /// task; this future resolves only if every worker task panics or is cancelled.
    pub async fn run(self: Arc<Self>) {
        let mut handles = Vec::with_capacity(self.concurrency);
        for worker_index in 0..self.concurrency {
            let worker = self.clone();
            handles.push(tokio::spawn(async move { worker.worker_loop(worker_index).await }));
        }
        for handle in handles {
            if let Err(err) = handle.await {
                tracing::error!(error = %err, "queue worker task panicked");
            }
        }
    }

    async fn worker_loop(&self, worker_index: usize) {
        loop {
            match self.queue.lease(self.visibility_timeout).await {
                Ok(Some(leased)) => {
                    let result = self.pipeline.process_document(leased.task.document_id, leased.task.force).await;
                    let ack_result = match result {
                        Ok(()) => self.queue.ack(leased.task.id, leased.lease_token).await,
                        Err(err) => {
                            tracing::warn!(worker_index, document_id = %leased.task.document_id, error = %err, "processing attempt failed, nacking");
                            self.queue.nack(leased.task.id, leased.lease_token).await
                        }
                    };
                    if let Err(err) = ack_result {
                        tracing::error!(worker_index, error = %err, "failed to ack/nack leased task");
                    }
                }
                Ok(None) => tokio::time::sleep(IDLE_POLL_INTERVAL).await,
                Err(err) => {
                    tracing::error!(worker_index, error = %err, "failed to lease from task queue");
                    tokio::time::sleep(IDLE_POLL_INTERVAL).await;
                }
            }
        }
    }
}

/// Drains every currently-available task synchronously, processing one at a time on the calling
/// task, and returns the number processed. Used by the `process_pending` operation for small
/// deployments and tests that would rather not wait on a background worker pool.
pub async fn drain_once(queue: &dyn TaskQueue, pipeline: &ProcessingPipeline, visibility_timeout: Duration) -> Result<usize> {
    let mut processed = 0;
    while let Some(leased) = queue.lease(visibility_timeout).await? {
        let result = pipeline.process_document(leased.task.document_id, leased.task.force).await;
        match result {
            Ok(()) => queue.ack(leased.task.id, leased.lease_token).await?,
            Err(err) => {
                tracing::warn!(document_id = %leased.task.document_id, error = %err, "processing attempt failed, nacking");
                queue.nack(leased.task.id, leased.lease_token).await?
            }
        }
        processed += 1;
    }
    Ok(processed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::context::AppContext;
    use crate::domain::types::{Document, DocumentStatus, KnowledgeBase, SourceType, Visibility};

    fn test_kb() -> KnowledgeBase {
        let now = chrono::Utc::now();
        KnowledgeBase {
            id: uuid::Uuid::new_v4(),
            name: "kb".to_string(),
            description: String::new(),
            owner_id: uuid::Uuid::new_v4(),
            visibility: Visibility::Private,
            embedding_provider: "mock".to_string(),
            embedding_model: "mock".to_string(),
            embedding_dimension: 8,
            tags: vec![],
            document_count: 0,
            chunk_count: 0,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn drain_once_processes_every_enqueued_task() {
        let config = crate::config::load_embedded_defaults().unwrap();
        let context = Arc::new(AppContext::build(config).unwrap());
        let kb = context.catalog.create_kb(test_kb()).await.unwrap();

        let blob_path = format!("{}doc.txt", kb.blob_prefix());
        context.object_store.put(&blob_path, b"some words to chunk and embed".to_vec()).await.unwrap();
        let now = chrono::Utc::now();
        let document = context
            .catalog
            .create_document(Document {
                id: uuid::Uuid::new_v4(),
                kb_id: kb.id,
                file_name: "doc.txt".to_string(),
                file_type: "txt".to_string(),
                byte_size: 29,
                blob_path,
                content_hash: "hash".to_string(),
                status: DocumentStatus::Pending,
                source_type: SourceType::Upload,
                chunk_count: 0,
                retry_count: 0,
                error_message: None,
                version: 0,
                created_at: now,
                updated_at: now,
                processed_at: None,
            })
            .await
            .unwrap();
        context.queue.enqueue(document.id, kb.id, false).await.unwrap();

        let pipeline = Arc::new(ProcessingPipeline::new(context.clone()));
        let processed = drain_once(context.queue.as_ref(), &pipeline, Duration::from_secs(30)).await.unwrap();
        assert_eq!(processed, 1);

        let reloaded = context.catalog.get_document(document.id).await.unwrap();
        assert_eq!(reloaded.status, DocumentStatus::Completed);
    }
}
