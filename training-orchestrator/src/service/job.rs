//! Job registry, task queue producer and completion pipeline — the critical section of the orchestrator.

use crate::error::JobServiceError;
use crate::metrics::Metrics;
use crate::model::{decompose, Job, JobStatus, TaskStatus};
use crate::queue::{QueuedTask, TaskQueue};
use crate::service::autosave::AutoSaveClient;
use crate::service::durable::{put_best_effort, DurableStore};
use crate::service::worker::record_worker_completion;
use crate::state::Registry;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub struct CreateJobOutcome {
    pub job_id: String,
    pub status: JobStatus,
    pub num_tasks: u32,
    pub message: String,
}

pub struct JobStatusView {
    pub status: JobStatus,
    pub progress: u32,
    pub completed_tasks: u32,
    pub total_tasks: u32,
    pub current_loss: f64,
    pub current_accuracy: f64,
    pub message: String,
}

pub struct CancelOutcome {
    pub success: bool,
    pub message: String,
    pub previous_status: JobStatus,
}

pub struct CompletionOutcome {
    pub acknowledged: bool,
    pub message: String,
}

#[async_trait]
pub trait JobService: Send + Sync {
    #[allow(clippy::too_many_arguments)]
    async fn create_job(
        &self,
        job_id: String,
        user_id: String,
        model_type: String,
        dataset_path: String,
        hyperparameters: HashMap<String, String>,
        num_workers: u32,
        epochs: u32,
    ) -> Result<CreateJobOutcome, JobServiceError>;

    async fn get_job_status(&self, job_id: &str) -> Result<JobStatusView, JobServiceError>;

    async fn report_task_completion(
        &self,
        task_id: &str,
        job_id: &str,
        worker_id: &str,
        success: bool,
        loss: f64,
        accuracy: f64,
    ) -> Result<CompletionOutcome, JobServiceError>;

    async fn update_job_metrics(&self, job_id: &str, loss: f64, accuracy: f64) -> bool;

    async fn cancel_job(&self, job_id: &str) -> Result<CancelOutcome, JobServiceError>;
}

pub struct JobServiceDefault {
    registry: Arc<Registry>,
    queue: TaskQueue,
    durable_store: Arc<dyn DurableStore>,
    autosave_client: Arc<dyn AutoSaveClient>,
    metrics: Arc<Metrics>,
    batches_per_epoch: u32,
    batch_stride: u32,
    snapshot_ttl: Duration,
}

fn snapshot_key(job_id: &str) -> String {
    format!("job:{job_id}")
}

fn serialize_job(job: &Job) -> Result<String, JobServiceError> {
    serde_json::to_string(job).map_err(|e| JobServiceError::Internal(e.to_string()))
}

impl JobServiceDefault {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        registry: Arc<Registry>,
        queue: TaskQueue,
        durable_store: Arc<dyn DurableStore>,
        autosave_client: Arc<dyn AutoSaveClient>,
        metrics: Arc<Metrics>,
        batches_per_epoch: u32,
        batch_stride: u32,
        snapshot_ttl: Duration,
    ) -> Self {
        Self {
            registry,
            queue,
            durable_store,
            autosave_client,
            metrics,
            batches_per_epoch,
            batch_stride,
            snapshot_ttl,
        }
    }

    async fn snapshot(&self, job: &Job) {
        match serialize_job(job) {
            Ok(value) => {
                put_best_effort(
                    self.durable_store.as_ref(),
                    &snapshot_key(&job.job_id),
                    value,
                    self.snapshot_ttl,
                )
                .await;
            }
            Err(error) => warn!(job_id = %job.job_id, %error, "snapshot serialization failed"),
        }
    }

    /// Attempts to rehydrate a Job from the durable store on registry miss.
    /// Does not restore task queue position — a rehydrated job
    /// can only answer status queries, never execute further.
    async fn rehydrate(&self, job_id: &str) -> Option<Job> {
        let raw = self.durable_store.get(&snapshot_key(job_id)).await.ok()??;
        serde_json::from_str(&raw).ok()
    }
}

#[async_trait]
impl JobService for JobServiceDefault {
    async fn create_job(
        &self,
        job_id: String,
        user_id: String,
        model_type: String,
        dataset_path: String,
        hyperparameters: HashMap<String, String>,
        num_workers: u32,
        epochs: u32,
    ) -> Result<CreateJobOutcome, JobServiceError> {
        if epochs < 1 {
            return Err(JobServiceError::InvalidEpochs(epochs));
        }
        if num_workers < 1 {
            return Err(JobServiceError::InvalidNumWorkers(num_workers));
        }

        let now = Utc::now();
        let tasks = decompose(&job_id, epochs, self.batches_per_epoch, self.batch_stride, now);
        let total_tasks = tasks.len() as u32;

        let job = Job {
            job_id: job_id.clone(),
            user_id,
            model_type,
            dataset_path,
            hyperparameters,
            num_workers,
            epochs,
            // The job moves directly from PENDING to RUNNING before RPC
            // return; no client ever observes PENDING.
            status: JobStatus::Running,
            tasks,
            total_tasks,
            completed_tasks: 0,
            current_loss: 0.0,
            current_accuracy: 0.0,
            created_at: now,
            updated_at: now,
        };

        {
            let mut state = self.registry.write().await;
            if state.jobs.contains_key(&job_id) {
                return Err(JobServiceError::DuplicateJobId(job_id));
            }
            state.jobs.insert(job_id.clone(), job.clone());
        }

        // The initial snapshot must succeed or no tasks are admitted, unlike every later snapshot which is best-effort (§4.5).
        if let Err(error) = self
            .durable_store
            .put(&snapshot_key(&job_id), serialize_job(&job)?, self.snapshot_ttl)
            .await
        {
            self.registry.write().await.jobs.remove(&job_id);
            return Err(JobServiceError::Internal(format!(
                "initial snapshot write failed: {error}"
            )));
        }

        let queue = self.queue.clone();
        let task_ids: Vec<String> = job.tasks.iter().map(|t| t.task_id.clone()).collect();
        let enqueue_job_id = job_id.clone();
        // Enqueueing must not block the RPC return; the queue is bounded
        // and a slow consumer could otherwise stall job creation.
        tokio::spawn(async move {
            for task_id in task_ids {
                queue
                    .enqueue(QueuedTask {
                        job_id: enqueue_job_id.clone(),
                        task_id,
                    })
                    .await;
            }
        });

        self.metrics.jobs_created.inc();
        self.metrics.active_jobs.inc();

        info!(job_id = %job_id, total_tasks, "training job created");

        Ok(CreateJobOutcome {
            job_id,
            status: JobStatus::Running,
            num_tasks: total_tasks,
            message: "job created".to_string(),
        })
    }

    async fn get_job_status(&self, job_id: &str) -> Result<JobStatusView, JobServiceError> {
        if let Some(job) = self.registry.read().await.jobs.get(job_id) {
            return Ok(JobStatusView {
                status: job.status,
                progress: job.progress(),
                completed_tasks: job.completed_tasks,
                total_tasks: job.total_tasks,
                current_loss: job.current_loss,
                current_accuracy: job.current_accuracy,
                message: String::new(),
            });
        }

        match self.rehydrate(job_id).await {
            Some(job) => {
                let view = JobStatusView {
                    status: job.status,
                    progress: job.progress(),
                    completed_tasks: job.completed_tasks,
                    total_tasks: job.total_tasks,
                    current_loss: job.current_loss,
                    current_accuracy: job.current_accuracy,
                    message: "rehydrated from durable store".to_string(),
                };
                self.registry.write().await.jobs.insert(job_id.to_string(), job);
                Ok(view)
            }
            None => Err(JobServiceError::JobNotFound(job_id.to_string())),
        }
    }

    async fn report_task_completion(
        &self,
        task_id: &str,
        job_id: &str,
        worker_id: &str,
        success: bool,
        loss: f64,
        accuracy: f64,
    ) -> Result<CompletionOutcome, JobServiceError> {
        self.metrics
            .task_completions
            .with_label_values(&[if success { "true" } else { "false" }])
            .inc();

        let (snapshot_job, just_completed) = {
            let mut state_guard = self.registry.write().await;
            let state = &mut *state_guard;
            let job = state
                .jobs
                .get_mut(job_id)
                .ok_or_else(|| JobServiceError::JobNotFound(job_id.to_string()))?;

            // A completion arriving for a terminal job must not re-open its
            // status.
            if job.status.is_terminal() {
                return Ok(CompletionOutcome {
                    acknowledged: true,
                    message: format!("job already {}, completion ignored", job.status),
                });
            }

            let now = Utc::now();
            if let Some(task) = job.tasks.iter_mut().find(|t| t.task_id == task_id) {
                task.status = if success {
                    TaskStatus::Completed
                } else {
                    TaskStatus::Failed
                };
                task.loss = Some(loss);
                task.accuracy = Some(accuracy);
                task.completed_at = Some(now);
            }

            let mut just_completed = false;
            if success {
                job.completed_tasks += 1;
                job.current_loss = loss;
                job.current_accuracy = accuracy;
                job.updated_at = now;

                if job.completed_tasks >= job.total_tasks {
                    job.status = JobStatus::Completed;
                    just_completed = true;
                }

                record_worker_completion(job, worker_id, &mut state.workers);
            }
            // success=false: aggregate counters are not advanced and the
            // task is not automatically re-queued.

            (job.clone(), just_completed)
        };

        self.snapshot(&snapshot_job).await;

        if just_completed {
            self.metrics.jobs_completed.inc();
            self.metrics.active_jobs.dec();

            let autosave_client = self.autosave_client.clone();
            let job_for_autosave = snapshot_job.clone();
            tokio::spawn(async move {
                autosave_client.auto_save(&job_for_autosave).await;
            });
        }

        Ok(CompletionOutcome {
            acknowledged: true,
            message: "completion recorded".to_string(),
        })
    }

    async fn update_job_metrics(&self, job_id: &str, loss: f64, accuracy: f64) -> bool {
        let updated_job = {
            let mut state = self.registry.write().await;
            match state.jobs.get_mut(job_id) {
                Some(job) => {
                    job.current_loss = loss;
                    job.current_accuracy = accuracy;
                    job.updated_at = Utc::now();
                    Some(job.clone())
                }
                None => None,
            }
        };

        match updated_job {
            Some(job) => {
                self.snapshot(&job).await;
                true
            }
            // Reporting endpoint, not authoritative: unknown job fails
            // quietly.
            None => false,
        }
    }

    async fn cancel_job(&self, job_id: &str) -> Result<CancelOutcome, JobServiceError> {
        let result = {
            let mut state = self.registry.write().await;
            let job = state
                .jobs
                .get_mut(job_id)
                .ok_or_else(|| JobServiceError::JobNotFound(job_id.to_string()))?;

            let previous_status = job.status;
            if job.status.is_terminal() {
                return Ok(CancelOutcome {
                    success: false,
                    message: format!("job already {previous_status}"),
                    previous_status,
                });
            }

            job.status = JobStatus::Cancelled;
            job.updated_at = Utc::now();
            (job.clone(), previous_status)
        };

        let (job, previous_status) = result;
        self.snapshot(&job).await;

        self.metrics.jobs_cancelled.inc();
        self.metrics.active_jobs.dec();

        Ok(CancelOutcome {
            success: true,
            message: "job cancelled".to_string(),
            previous_status,
        })
    }
}
