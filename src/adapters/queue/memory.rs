use crate::domain::error::{Error, Result};
use crate::domain::ports::queue::{LeasedTask, ProcessingTask, TaskQueue};
use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use uuid::Uuid;

struct LeasedEntry {
    task: ProcessingTask,
    lease_token: Uuid,
    expires_at: Instant,
}

/// In-memory at-least-once [`TaskQueue`]: a FIFO of ready tasks plus a table of leased-but-not-yet-acked
/// tasks. Every [`lease`](Self::lease) call first sweeps expired leases back onto the ready queue,
/// bumping `delivery_count`, which is what gives this queue its at-least-once guarantee without a
/// background reaper task: the deadline lives on each lease, and expiry is only checked lazily
/// on the next lease call.
#[derive(Default)]
pub struct InMemoryTaskQueue {
    ready: Mutex<VecDeque<ProcessingTask>>,
    leased: DashMap<Uuid, LeasedEntry>,
}

impl InMemoryTaskQueue {
    /// An empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    fn reclaim_expired(&self) {
        let now = Instant::now();
        let expired: Vec<Uuid> = self
            .leased
            .iter()
            .filter(|e| e.expires_at <= now)
            .map(|e| *e.key())
            .collect();

        if expired.is_empty() {
            return;
        }
        let mut ready = self.ready.lock().expect("queue mutex poisoned");
        for task_id in expired {
            if let Some((_, mut entry)) = self.leased.remove(&task_id) {
                entry.task.delivery_count += 1;
                ready.push_back(entry.task);
            }
        }
    }
}

#[async_trait]
impl TaskQueue for InMemoryTaskQueue {
    async fn enqueue(&self, document_id: Uuid, kb_id: Uuid, force: bool) -> Result<Uuid> {
        let task = ProcessingTask {
            id: Uuid::new_v4(),
            document_id,
            kb_id,
            force,
            delivery_count: 0,
            enqueued_at: chrono::Utc::now(),
        };
        let id = task.id;
        self.ready.lock().expect("queue mutex poisoned").push_back(task);
        Ok(id)
    }

    async fn lease(&self, visibility_timeout: Duration) -> Result<Option<LeasedTask>> {
        self.reclaim_expired();

        let task = {
            let mut ready = self.ready.lock().expect("queue mutex poisoned");
            ready.pop_front()
        };
        let Some(task) = task else {
            return Ok(None);
        };

        let lease_token = Uuid::new_v4();
        self.leased.insert(
            task.id,
            LeasedEntry {
                task: task.clone(),
                lease_token,
                expires_at: Instant::now() + visibility_timeout,
            },
        );

        Ok(Some(LeasedTask { task, lease_token }))
    }

    async fn ack(&self, task_id: Uuid, lease_token: Uuid) -> Result<()> {
        match self.leased.get(&task_id) {
            Some(entry) if entry.lease_token == lease_token => {
                drop(entry);
                self.leased.remove(&task_id);
                Ok(())
            }
            Some(_) => Err(Error::validation("lease token does not match in-flight task")),
            None => Err(Error::not_found(format!("leased task {task_id}"))),
        }
    }

    async fn nack(&self, task_id: Uuid, lease_token: Uuid) -> Result<()> {
        let matches = matches!(self.leased.get(&task_id), Some(entry) if entry.lease_token == lease_token);
        if !matches {
            return Err(Error::validation("lease token does not match in-flight task"));
        }
        if let Some((_, mut entry)) = self.leased.remove(&task_id) {
            entry.task.delivery_count += 1;
            self.ready.lock().expect("queue mutex poisoned").push_front(entry.task);
        }
        Ok(())
    }

    async fn depth(&self) -> Result<usize> {
        Ok(self.ready.lock().expect("queue mutex poisoned").len())
    }

    async fn in_flight(&self) -> Result<usize> {
        Ok(self.leased.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lease_then_ack_empties_queue() {
        let queue = InMemoryTaskQueue::new();
        queue.enqueue(Uuid::new_v4(), Uuid::new_v4(), false).await.unwrap();

        let leased = queue.lease(Duration::from_secs(60)).await.unwrap().unwrap();
        assert_eq!(queue.depth().await.unwrap(), 0);
        assert_eq!(queue.in_flight().await.unwrap(), 1);

        queue.ack(leased.task.id, leased.lease_token).await.unwrap();
        assert_eq!(queue.in_flight().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn expired_lease_is_redelivered() {
        let queue = InMemoryTaskQueue::new();
        queue.enqueue(Uuid::new_v4(), Uuid::new_v4(), false).await.unwrap();

        let first = queue.lease(Duration::from_millis(1)).await.unwrap().unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;

        let second = queue.lease(Duration::from_secs(60)).await.unwrap().unwrap();
        assert_eq!(second.task.id, first.task.id);
        assert_eq!(second.task.delivery_count, 1);
    }

    #[tokio::test]
    async fn nack_requeues_immediately() {
        let queue = InMemoryTaskQueue::new();
        queue.enqueue(Uuid::new_v4(), Uuid::new_v4(), false).await.unwrap();
        let leased = queue.lease(Duration::from_secs(60)).await.unwrap().unwrap();

        queue.nack(leased.task.id, leased.lease_token).await.unwrap();
        assert_eq!(queue.depth().await.unwrap(), 1);

        let redelivered = queue.lease(Duration::from_secs(60)).await.unwrap().unwrap();
        assert_eq!(redelivered.task.delivery_count, 1);
    }
}
