//! Domain model: Job, Task and WorkerActivity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::{Display, Formatter};

/// Number of batches a single epoch is split into. Documented design
/// constant; parameterizable per Open Question 2.
pub const DEFAULT_BATCHES_PER_EPOCH: u32 = 10;

/// Batch index stride used to compute `(batch_start, batch_end)` ranges.
pub const DEFAULT_BATCH_STRIDE: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }
}

impl Display for JobStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            JobStatus::Pending => "PENDING",
            JobStatus::Running => "RUNNING",
            JobStatus::Completed => "COMPLETED",
            JobStatus::Failed => "FAILED",
            JobStatus::Cancelled => "CANCELLED",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskStatus {
    Pending,
    Assigned,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub task_id: String,
    pub job_id: String,
    pub worker_id: Option<String>,
    pub status: TaskStatus,
    pub epoch: u32,
    pub batch_start: u32,
    pub batch_end: u32,
    pub loss: Option<f64>,
    pub accuracy: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub job_id: String,
    pub user_id: String,
    pub model_type: String,
    pub dataset_path: String,
    pub hyperparameters: HashMap<String, String>,
    pub num_workers: u32,
    pub epochs: u32,
    pub status: JobStatus,
    pub tasks: Vec<Task>,
    pub total_tasks: u32,
    pub completed_tasks: u32,
    pub current_loss: f64,
    pub current_accuracy: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// Progress in whole percent.
    pub fn progress(&self) -> u32 {
        if self.total_tasks == 0 {
            0
        } else {
            (100 * self.completed_tasks) / self.total_tasks
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkerStatus {
    Idle,
    Busy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerActivity {
    pub worker_id: String,
    pub status: WorkerStatus,
    pub current_task_id: Option<String>,
    pub current_job_id: Option<String>,
    pub tasks_completed: u64,
    pub last_activity_time: DateTime<Utc>,
}

/// Cross-product decomposition of a job into its task set.
///
/// `total_tasks = epochs * batches_per_epoch`; tasks are ordered
/// lexicographically by `(epoch, batch)`, matching per-job enqueue order.
pub fn decompose(
    job_id: &str,
    epochs: u32,
    batches_per_epoch: u32,
    batch_stride: u32,
    now: DateTime<Utc>,
) -> Vec<Task> {
    let mut tasks = Vec::with_capacity((epochs * batches_per_epoch) as usize);
    for epoch in 0..epochs {
        for batch in 0..batches_per_epoch {
            tasks.push(Task {
                task_id: format!("{job_id}-task-{epoch}-{batch}"),
                job_id: job_id.to_string(),
                worker_id: None,
                status: TaskStatus::Pending,
                epoch,
                batch_start: batch * batch_stride,
                batch_end: (batch + 1) * batch_stride,
                loss: None,
                accuracy: None,
                created_at: now,
                completed_at: None,
            });
        }
    }
    tasks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decompose_produces_expected_task_count_and_order() {
        let now = Utc::now();
        let tasks = decompose("j1", 2, DEFAULT_BATCHES_PER_EPOCH, DEFAULT_BATCH_STRIDE, now);
        assert_eq!(tasks.len(), 20);
        assert_eq!(tasks[0].epoch, 0);
        assert_eq!(tasks[0].batch_start, 0);
        assert_eq!(tasks[0].batch_end, 100);
        assert_eq!(tasks[9].epoch, 0);
        assert_eq!(tasks[9].batch_start, 900);
        assert_eq!(tasks[10].epoch, 1);
        assert_eq!(tasks[10].batch_start, 0);
    }

    #[test]
    fn progress_is_zero_for_empty_job() {
        let job = Job {
            job_id: "j".into(),
            user_id: "u".into(),
            model_type: "m".into(),
            dataset_path: "d".into(),
            hyperparameters: HashMap::new(),
            num_workers: 1,
            epochs: 0,
            status: JobStatus::Running,
            tasks: vec![],
            total_tasks: 0,
            completed_tasks: 0,
            current_loss: 0.0,
            current_accuracy: 0.0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert_eq!(job.progress(), 0);
    }
}
