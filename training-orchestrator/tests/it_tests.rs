//! End-to-end scenarios covering the job lifecycle. No live Redis or HTTP
//! collaborator is required: an in-memory `DurableStore` and a recording
//! `AutoSaveClient` stand in for them.

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::time::Duration;

    use training_orchestrator::metrics;
    use training_orchestrator::model::JobStatus;
    use training_orchestrator::queue::TaskQueue;
    use training_orchestrator::service::autosave::RecordingAutoSaveClient;
    use training_orchestrator::service::durable::InMemoryDurableStore;
    use training_orchestrator::service::job::{JobService, JobServiceDefault};
    use training_orchestrator::service::worker::{WorkerActivityService, WorkerActivityServiceDefault};
    use training_orchestrator::state::Registry;

    const LEASE_TIMEOUT: Duration = Duration::from_millis(200);

    struct Harness {
        job_service: JobServiceDefault,
        worker_service: WorkerActivityServiceDefault,
        autosave: Arc<RecordingAutoSaveClient>,
    }

    fn harness() -> Harness {
        let registry = Arc::new(Registry::new());
        let queue = TaskQueue::bounded(256);
        let durable_store = Arc::new(InMemoryDurableStore::default());
        let autosave = Arc::new(RecordingAutoSaveClient::default());
        let (_, metrics) = metrics::register_all();
        let metrics = Arc::new(metrics);

        let job_service = JobServiceDefault::new(
            registry.clone(),
            queue.clone(),
            durable_store,
            autosave.clone(),
            metrics.clone(),
            10,
            100,
            Duration::from_secs(3600),
        );
        let worker_service =
            WorkerActivityServiceDefault::new(registry, queue, metrics, LEASE_TIMEOUT);

        Harness {
            job_service,
            worker_service,
            autosave,
        }
    }

    async fn wait_for_enqueue() {
        // CreateTrainingJob enqueues tasks on a detached background task so
        // the RPC itself never blocks on a full queue; give it a scheduling
        // tick before leasing.
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    #[tokio::test]
    async fn s1_happy_path() {
        let h = harness();

        let outcome = h
            .job_service
            .create_job(
                "j1".to_string(),
                "u1".to_string(),
                "resnet50".to_string(),
                "/data/train".to_string(),
                HashMap::new(),
                1,
                2,
            )
            .await
            .unwrap();
        assert_eq!(outcome.num_tasks, 20);
        wait_for_enqueue().await;

        let mut leased = Vec::new();
        for _ in 0..20 {
            let task = h.worker_service.assign_task("w1").await.expect("task available");
            leased.push(task);
        }
        assert!(h.worker_service.assign_task("w1").await.is_none());

        for task in leased {
            h.job_service
                .report_task_completion(&task.task_id, &task.job_id, "w1", true, 0.5, 0.9)
                .await
                .unwrap();
        }

        let status = h.job_service.get_job_status("j1").await.unwrap();
        assert_eq!(status.status, JobStatus::Completed);
        assert_eq!(status.progress, 100);
        assert_eq!(status.completed_tasks, 20);
        assert_eq!(status.current_loss, 0.5);
        assert_eq!(status.current_accuracy, 0.9);

        // the auto-save spawn is detached; give it a tick to land.
        tokio::time::sleep(Duration::from_millis(20)).await;
        let calls = h.autosave.calls.lock().await;
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].job_id, "j1");
    }

    #[tokio::test]
    async fn s2_cancel_mid_flight() {
        let h = harness();

        h.job_service
            .create_job(
                "j2".to_string(),
                "u1".to_string(),
                "bert".to_string(),
                "/data/j2".to_string(),
                HashMap::new(),
                1,
                3,
            )
            .await
            .unwrap();
        wait_for_enqueue().await;

        let mut leased = Vec::new();
        for _ in 0..10 {
            leased.push(h.worker_service.assign_task("w1").await.unwrap());
        }

        for task in &leased[0..5] {
            h.job_service
                .report_task_completion(&task.task_id, &task.job_id, "w1", true, 0.1, 0.2)
                .await
                .unwrap();
        }

        let cancel = h.job_service.cancel_job("j2").await.unwrap();
        assert!(cancel.success);
        assert_eq!(cancel.previous_status, JobStatus::Running);

        for task in &leased[5..10] {
            h.job_service
                .report_task_completion(&task.task_id, &task.job_id, "w1", true, 0.1, 0.2)
                .await
                .unwrap();
        }

        let status = h.job_service.get_job_status("j2").await.unwrap();
        assert_eq!(status.status, JobStatus::Cancelled);
        assert_eq!(status.completed_tasks, 5);

        let second_cancel = h.job_service.cancel_job("j2").await.unwrap();
        assert!(!second_cancel.success);
        assert_eq!(second_cancel.previous_status, JobStatus::Cancelled);
    }

    #[tokio::test]
    async fn s3_unknown_job() {
        let h = harness();
        let result = h.job_service.get_job_status("nope").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn s4_assign_without_jobs_times_out() {
        let h = harness();
        let started = tokio::time::Instant::now();
        let leased = h.worker_service.assign_task("w1").await;
        assert!(leased.is_none());
        assert!(started.elapsed() >= LEASE_TIMEOUT);
    }

    #[tokio::test]
    async fn s5_worker_bookkeeping() {
        let h = harness();

        h.job_service
            .create_job(
                "j3".to_string(),
                "u1".to_string(),
                "gpt".to_string(),
                "/data/j3".to_string(),
                HashMap::new(),
                1,
                1,
            )
            .await
            .unwrap();
        wait_for_enqueue().await;

        for _ in 0..3 {
            let task = h.worker_service.assign_task("wA").await.unwrap();
            h.job_service
                .report_task_completion(&task.task_id, &task.job_id, "wA", true, 0.3, 0.7)
                .await
                .unwrap();
        }

        let workers = h.worker_service.list_workers().await;
        let wa = workers.iter().find(|w| w.worker_id == "wA").unwrap();
        assert_eq!(wa.tasks_completed, 3);
        assert_eq!(wa.current_job_id.as_deref(), Some("j3"));
    }

    #[tokio::test]
    async fn s6_duplicate_job_id() {
        let h = harness();

        h.job_service
            .create_job(
                "j4".to_string(),
                "u1".to_string(),
                "resnet50".to_string(),
                "/data/j4".to_string(),
                HashMap::new(),
                1,
                1,
            )
            .await
            .unwrap();

        let second = h
            .job_service
            .create_job(
                "j4".to_string(),
                "u2".to_string(),
                "other".to_string(),
                "/data/other".to_string(),
                HashMap::new(),
                1,
                5,
            )
            .await;
        assert!(second.is_err());

        let status = h.job_service.get_job_status("j4").await.unwrap();
        assert_eq!(status.total_tasks, 10);
    }

    #[tokio::test]
    async fn invariant_total_tasks_equals_epochs_times_batches_per_epoch() {
        let h = harness();
        let outcome = h
            .job_service
            .create_job(
                "j5".to_string(),
                "u1".to_string(),
                "m".to_string(),
                "/data/j5".to_string(),
                HashMap::new(),
                2,
                4,
            )
            .await
            .unwrap();
        assert_eq!(outcome.num_tasks, 40);
    }

    #[tokio::test]
    async fn invariant_terminal_job_ignores_further_completions() {
        let h = harness();
        h.job_service
            .create_job(
                "j6".to_string(),
                "u1".to_string(),
                "m".to_string(),
                "/data/j6".to_string(),
                HashMap::new(),
                1,
                1,
            )
            .await
            .unwrap();
        wait_for_enqueue().await;

        for _ in 0..10 {
            let task = h.worker_service.assign_task("w1").await.unwrap();
            h.job_service
                .report_task_completion(&task.task_id, &task.job_id, "w1", true, 1.0, 1.0)
                .await
                .unwrap();
        }

        let status = h.job_service.get_job_status("j6").await.unwrap();
        assert_eq!(status.status, JobStatus::Completed);
        assert_eq!(status.completed_tasks, 10);

        let late = h
            .job_service
            .report_task_completion("j6-task-0-0", "j6", "w1", true, 0.0, 0.0)
            .await
            .unwrap();
        assert!(late.acknowledged);

        let status = h.job_service.get_job_status("j6").await.unwrap();
        assert_eq!(status.status, JobStatus::Completed);
        assert_eq!(status.completed_tasks, 10);
    }
}
