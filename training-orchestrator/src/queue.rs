//! Bounded task queue.
//!
//! Holds `(job_id, task_id)` pairs — weak handles into Tasks already owned
//! by their Job in the registry, never the Task itself. Built on `flume` rather than
//! `tokio::sync::mpsc` because `AssignTask` is a multi-consumer pull: many
//! concurrent workers race to receive from the same queue, which a plain
//! `mpsc::Receiver` cannot support without external serialization.

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct QueuedTask {
    pub job_id: String,
    pub task_id: String,
}

#[derive(Clone)]
pub struct TaskQueue {
    sender: flume::Sender<QueuedTask>,
    receiver: flume::Receiver<QueuedTask>,
}

impl TaskQueue {
    pub fn bounded(capacity: usize) -> Self {
        let (sender, receiver) = flume::bounded(capacity);
        Self { sender, receiver }
    }

    /// Enqueues a task, suspending if the queue is at capacity. Never called from the RPC handler itself — the
    /// caller spawns this onto a detached task so `CreateTrainingJob`
    /// returns as soon as the Job is registered.
    pub async fn enqueue(&self, task: QueuedTask) {
        // An error here means every receiver was dropped, which only
        // happens at process shutdown; nothing useful to do but drop the
        // task.
        let _ = self.sender.send_async(task).await;
    }

    /// Blocks until a task is available or `timeout` elapses.
    pub async fn try_lease(&self, timeout: Duration) -> Option<QueuedTask> {
        tokio::time::timeout(timeout, self.receiver.recv_async())
            .await
            .ok()
            .and_then(Result::ok)
    }

    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lease_returns_none_on_timeout_when_empty() {
        let queue = TaskQueue::bounded(4);
        let leased = queue.try_lease(Duration::from_millis(20)).await;
        assert!(leased.is_none());
    }

    #[tokio::test]
    async fn enqueue_then_lease_round_trips_fifo() {
        let queue = TaskQueue::bounded(4);
        queue
            .enqueue(QueuedTask {
                job_id: "j".into(),
                task_id: "t1".into(),
            })
            .await;
        queue
            .enqueue(QueuedTask {
                job_id: "j".into(),
                task_id: "t2".into(),
            })
            .await;

        let first = queue.try_lease(Duration::from_millis(100)).await.unwrap();
        let second = queue.try_lease(Duration::from_millis(100)).await.unwrap();
        assert_eq!(first.task_id, "t1");
        assert_eq!(second.task_id, "t2");
    }
}
