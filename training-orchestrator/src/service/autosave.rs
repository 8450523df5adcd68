//! Auto-save emitter: a one-shot HTTP POST to the storage
//! collaborator on successful job completion. Fire-and-forget: failures are
//! logged and dropped, never retried.

use crate::model::{Job, JobStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug, Serialize)]
pub struct AutoSavePayload {
    pub job_id: String,
    /// Set equal to `job_id` in the current design.
    pub job_name: String,
    pub model_type: String,
    pub dataset_path: String,
    pub hyperparameters: std::collections::HashMap<String, String>,
    pub current_accuracy: f64,
    pub current_loss: f64,
    pub completed_tasks: u32,
    pub total_tasks: u32,
    pub epochs: u32,
    pub num_workers: u32,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Job> for AutoSavePayload {
    fn from(job: &Job) -> Self {
        Self {
            job_id: job.job_id.clone(),
            job_name: job.job_id.clone(),
            model_type: job.model_type.clone(),
            dataset_path: job.dataset_path.clone(),
            hyperparameters: job.hyperparameters.clone(),
            current_accuracy: job.current_accuracy,
            current_loss: job.current_loss,
            completed_tasks: job.completed_tasks,
            total_tasks: job.total_tasks,
            epochs: job.epochs,
            num_workers: job.num_workers,
            status: job.status.to_string(),
            created_at: job.created_at,
            updated_at: job.updated_at,
        }
    }
}

#[async_trait]
pub trait AutoSaveClient: Send + Sync {
    async fn auto_save(&self, job: &Job);
}

pub struct HttpAutoSaveClient {
    client: reqwest::Client,
    storage_service_url: String,
}

impl HttpAutoSaveClient {
    pub fn new(storage_service_url: String, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("reqwest client builder should not fail for a plain timeout config");
        Self {
            client,
            storage_service_url,
        }
    }
}

#[async_trait]
impl AutoSaveClient for HttpAutoSaveClient {
    async fn auto_save(&self, job: &Job) {
        debug_assert_eq!(job.status, JobStatus::Completed);

        let url = format!(
            "{}/api/v1/jobs/{}/auto-save-model",
            self.storage_service_url.trim_end_matches('/'),
            job.job_id
        );
        let payload = AutoSavePayload::from(job);

        let response = match self.client.post(&url).json(&payload).send().await {
            Ok(response) => response,
            Err(error) => {
                warn!(job_id = %job.job_id, %error, "auto-save POST failed, dropping (no retry)");
                return;
            }
        };

        match response.status().as_u16() {
            201 => info!(job_id = %job.job_id, "auto-save succeeded"),
            200 => info!(job_id = %job.job_id, "auto-save already existed on collaborator"),
            status => warn!(job_id = %job.job_id, status, "auto-save returned unexpected status, dropping"),
        }
    }
}

/// Test double recording every payload it was asked to save.
#[derive(Default)]
pub struct RecordingAutoSaveClient {
    pub calls: tokio::sync::Mutex<Vec<AutoSavePayload>>,
}

#[async_trait]
impl AutoSaveClient for RecordingAutoSaveClient {
    async fn auto_save(&self, job: &Job) {
        self.calls.lock().await.push(AutoSavePayload::from(job));
    }
}
