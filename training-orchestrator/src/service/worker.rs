//! Worker registry and the `AssignTask` lease. Entries are created lazily on first `AssignTask` and never
//! garbage-collected during process lifetime.

use crate::metrics::Metrics;
use crate::model::{Job, WorkerActivity, WorkerStatus};
use crate::queue::TaskQueue;
use crate::state::Registry;
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;

/// The task handed back to a worker that successfully leased one.
pub struct LeasedTask {
    pub task_id: String,
    pub job_id: String,
    pub model_type: String,
    pub dataset_path: String,
    pub hyperparameters: std::collections::HashMap<String, String>,
    pub epoch: u32,
    pub batch_start: u32,
    pub batch_end: u32,
}

#[async_trait]
pub trait WorkerActivityService: Send + Sync {
    async fn assign_task(&self, worker_id: &str) -> Option<LeasedTask>;
    async fn list_workers(&self) -> Vec<WorkerActivity>;
}

pub struct WorkerActivityServiceDefault {
    registry: Arc<Registry>,
    queue: TaskQueue,
    metrics: Arc<Metrics>,
    lease_timeout: Duration,
}

impl WorkerActivityServiceDefault {
    pub fn new(
        registry: Arc<Registry>,
        queue: TaskQueue,
        metrics: Arc<Metrics>,
        lease_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            queue,
            metrics,
            lease_timeout,
        }
    }
}

#[async_trait]
impl WorkerActivityService for WorkerActivityServiceDefault {
    async fn assign_task(&self, worker_id: &str) -> Option<LeasedTask> {
        let wait_start = Instant::now();
        let queued = self.queue.try_lease(self.lease_timeout).await;
        self.metrics
            .task_assignment_wait
            .observe(wait_start.elapsed().as_secs_f64());
        let queued = queued?;

        let mut state = self.registry.write().await;

        // The owning Job may have been evicted from the in-memory map only
        // by process restart, which also drops the queue — so a queued
        // task always has a live Job.
        let job = state.jobs.get_mut(&queued.job_id)?;
        let task = job.tasks.iter_mut().find(|t| t.task_id == queued.task_id)?;
        task.status = crate::model::TaskStatus::Assigned;
        task.worker_id = Some(worker_id.to_string());

        let leased = LeasedTask {
            task_id: task.task_id.clone(),
            job_id: job.job_id.clone(),
            model_type: job.model_type.clone(),
            dataset_path: job.dataset_path.clone(),
            hyperparameters: job.hyperparameters.clone(),
            epoch: task.epoch,
            batch_start: task.batch_start,
            batch_end: task.batch_end,
        };

        let now = Utc::now();
        state
            .workers
            .entry(worker_id.to_string())
            .and_modify(|w| {
                w.status = WorkerStatus::Busy;
                w.current_task_id = Some(leased.task_id.clone());
                w.current_job_id = Some(leased.job_id.clone());
                w.last_activity_time = now;
            })
            .or_insert_with(|| WorkerActivity {
                worker_id: worker_id.to_string(),
                status: WorkerStatus::Busy,
                current_task_id: Some(leased.task_id.clone()),
                current_job_id: Some(leased.job_id.clone()),
                tasks_completed: 0,
                last_activity_time: now,
            });

        info!(worker_id, task_id = %leased.task_id, job_id = %leased.job_id, "task leased");
        Some(leased)
    }

    async fn list_workers(&self) -> Vec<WorkerActivity> {
        self.registry.read().await.workers.values().cloned().collect()
    }
}

/// Worker-side bookkeeping applied inside `ReportTaskCompletion`'s critical
/// section: `tasks_completed += 1`, `status = Idle`.
/// Kept as a free function (not a trait method) because it must run under
/// the same write-lock guard the job-completion update holds.
pub fn record_worker_completion(job: &Job, worker_id: &str, registry_workers: &mut std::collections::HashMap<String, WorkerActivity>) {
    let now = Utc::now();
    registry_workers
        .entry(worker_id.to_string())
        .and_modify(|w| {
            w.tasks_completed += 1;
            w.status = WorkerStatus::Idle;
            w.last_activity_time = now;
        })
        .or_insert_with(|| WorkerActivity {
            worker_id: worker_id.to_string(),
            status: WorkerStatus::Idle,
            current_task_id: None,
            current_job_id: Some(job.job_id.clone()),
            tasks_completed: 1,
            last_activity_time: now,
        });
}
