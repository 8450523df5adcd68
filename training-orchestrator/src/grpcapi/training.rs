//! Adapts the tonic-generated `TrainingOrchestrator` trait onto
//! `JobService`/`WorkerActivityService`, returning plain `tonic::Status`
//! errors rather than an embedded error payload.

use crate::model::{JobStatus as ModelJobStatus, WorkerActivity, WorkerStatus as ModelWorkerStatus};
use crate::service::job::JobService;
use crate::service::worker::WorkerActivityService;
use std::sync::Arc;
use tonic::{Request, Response, Status};
use tracing::instrument;
use training_orchestrator_grpc::proto::training::v1::training_orchestrator_server::TrainingOrchestrator;
use training_orchestrator_grpc::proto::training::v1::{
    AssignTaskRequest, AssignTaskResponse, CancelJobRequest, CancelJobResponse,
    CreateTrainingJobRequest, CreateTrainingJobResponse, GetJobStatusRequest, GetJobStatusResponse,
    GetWorkerActivityRequest, GetWorkerActivityResponse, JobStatus as ProtoJobStatus,
    ReportTaskCompletionRequest, ReportTaskCompletionResponse, UpdateJobMetricsRequest,
    UpdateJobMetricsResponse, WorkerActivityEntry, WorkerStatus as ProtoWorkerStatus,
};

fn to_proto_job_status(status: ModelJobStatus) -> ProtoJobStatus {
    match status {
        ModelJobStatus::Pending => ProtoJobStatus::Pending,
        ModelJobStatus::Running => ProtoJobStatus::Running,
        ModelJobStatus::Completed => ProtoJobStatus::Completed,
        ModelJobStatus::Failed => ProtoJobStatus::Failed,
        ModelJobStatus::Cancelled => ProtoJobStatus::Cancelled,
    }
}

fn to_proto_worker_status(status: ModelWorkerStatus) -> ProtoWorkerStatus {
    match status {
        ModelWorkerStatus::Idle => ProtoWorkerStatus::Idle,
        ModelWorkerStatus::Busy => ProtoWorkerStatus::Busy,
    }
}

fn to_worker_activity_entry(activity: WorkerActivity) -> WorkerActivityEntry {
    WorkerActivityEntry {
        worker_id: activity.worker_id,
        status: to_proto_worker_status(activity.status) as i32,
        current_task_id: activity.current_task_id,
        current_job_id: activity.current_job_id,
        tasks_completed: activity.tasks_completed,
        last_activity_time: activity.last_activity_time.to_rfc3339(),
    }
}

pub struct TrainingOrchestratorGrpcApi {
    pub job_service: Arc<dyn JobService>,
    pub worker_service: Arc<dyn WorkerActivityService>,
}

#[tonic::async_trait]
impl TrainingOrchestrator for TrainingOrchestratorGrpcApi {
    #[instrument(skip(self, request), fields(job_id = %request.get_ref().job_id))]
    async fn create_training_job(
        &self,
        request: Request<CreateTrainingJobRequest>,
    ) -> Result<Response<CreateTrainingJobResponse>, Status> {
        let r = request.into_inner();

        let outcome = self
            .job_service
            .create_job(
                r.job_id,
                r.user_id,
                r.model_type,
                r.dataset_path,
                r.hyperparameters,
                r.num_workers,
                r.epochs,
            )
            .await?;

        Ok(Response::new(CreateTrainingJobResponse {
            job_id: outcome.job_id,
            status: to_proto_job_status(outcome.status) as i32,
            num_tasks: outcome.num_tasks,
            message: outcome.message,
        }))
    }

    #[instrument(skip(self, request), fields(job_id = %request.get_ref().job_id))]
    async fn get_job_status(
        &self,
        request: Request<GetJobStatusRequest>,
    ) -> Result<Response<GetJobStatusResponse>, Status> {
        let r = request.into_inner();
        let view = self.job_service.get_job_status(&r.job_id).await?;

        Ok(Response::new(GetJobStatusResponse {
            status: to_proto_job_status(view.status) as i32,
            progress: view.progress,
            completed_tasks: view.completed_tasks,
            total_tasks: view.total_tasks,
            current_loss: view.current_loss,
            current_accuracy: view.current_accuracy,
            message: view.message,
        }))
    }

    #[instrument(skip(self, request), fields(worker_id = %request.get_ref().worker_id))]
    async fn assign_task(
        &self,
        request: Request<AssignTaskRequest>,
    ) -> Result<Response<AssignTaskResponse>, Status> {
        let r = request.into_inner();

        match self.worker_service.assign_task(&r.worker_id).await {
            Some(leased) => Ok(Response::new(AssignTaskResponse {
                task_id: leased.task_id,
                job_id: leased.job_id,
                model_type: leased.model_type,
                dataset_path: leased.dataset_path,
                hyperparameters: leased.hyperparameters,
                epoch: leased.epoch,
                batch_start: leased.batch_start,
                batch_end: leased.batch_end,
            })),
            // No task became available before the lease timeout elapsed
            // — the caller is expected to poll again.
            None => Err(Status::unavailable("no task available")),
        }
    }

    #[instrument(skip(self, request), fields(task_id = %request.get_ref().task_id, job_id = %request.get_ref().job_id))]
    async fn report_task_completion(
        &self,
        request: Request<ReportTaskCompletionRequest>,
    ) -> Result<Response<ReportTaskCompletionResponse>, Status> {
        let r = request.into_inner();

        let outcome = self
            .job_service
            .report_task_completion(&r.task_id, &r.job_id, &r.worker_id, r.success, r.loss, r.accuracy)
            .await?;

        Ok(Response::new(ReportTaskCompletionResponse {
            acknowledged: outcome.acknowledged,
            message: outcome.message,
        }))
    }

    #[instrument(skip(self, request), fields(job_id = %request.get_ref().job_id))]
    async fn update_job_metrics(
        &self,
        request: Request<UpdateJobMetricsRequest>,
    ) -> Result<Response<UpdateJobMetricsResponse>, Status> {
        let r = request.into_inner();
        let success = self
            .job_service
            .update_job_metrics(&r.job_id, r.loss, r.accuracy)
            .await;

        Ok(Response::new(UpdateJobMetricsResponse { success }))
    }

    #[instrument(skip(self, request), fields(job_id = %request.get_ref().job_id))]
    async fn cancel_job(
        &self,
        request: Request<CancelJobRequest>,
    ) -> Result<Response<CancelJobResponse>, Status> {
        let r = request.into_inner();
        let outcome = self.job_service.cancel_job(&r.job_id).await?;

        Ok(Response::new(CancelJobResponse {
            success: outcome.success,
            message: outcome.message,
            previous_status: to_proto_job_status(outcome.previous_status) as i32,
        }))
    }

    #[instrument(skip(self, _request))]
    async fn get_worker_activity(
        &self,
        _request: Request<GetWorkerActivityRequest>,
    ) -> Result<Response<GetWorkerActivityResponse>, Status> {
        let workers = self.worker_service.list_workers().await;
        let total_workers = workers.len() as u32;

        Ok(Response::new(GetWorkerActivityResponse {
            workers: workers.into_iter().map(to_worker_activity_entry).collect(),
            total_workers,
        }))
    }
}
