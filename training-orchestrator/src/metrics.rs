//! Process-wide Prometheus registry and counters. No HTTP exporter is wired
//! up here: the front door that would expose `/metrics` over HTTP is out of
//! scope for this service.

use prometheus::{Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry};

pub struct Metrics {
    pub jobs_created: IntCounter,
    pub jobs_completed: IntCounter,
    pub jobs_cancelled: IntCounter,
    pub task_completions: IntCounterVec,
    pub active_jobs: IntGauge,
    pub task_assignment_wait: Histogram,
}

impl Metrics {
    pub fn register(registry: &Registry) -> Self {
        let jobs_created = IntCounter::new(
            "training_orchestrator_jobs_created_total",
            "Number of training jobs accepted by CreateTrainingJob",
        )
        .unwrap();

        let jobs_completed = IntCounter::new(
            "training_orchestrator_jobs_completed_total",
            "Number of training jobs that reached COMPLETED",
        )
        .unwrap();

        let jobs_cancelled = IntCounter::new(
            "training_orchestrator_jobs_cancelled_total",
            "Number of training jobs cancelled via CancelJob",
        )
        .unwrap();

        let task_completions = IntCounterVec::new(
            Opts::new(
                "training_orchestrator_task_completions_total",
                "Number of ReportTaskCompletion calls, labeled by outcome",
            ),
            &["success"],
        )
        .unwrap();

        let active_jobs = IntGauge::new(
            "training_orchestrator_active_jobs",
            "Number of jobs currently in the RUNNING state",
        )
        .unwrap();

        let task_assignment_wait = Histogram::with_opts(HistogramOpts::new(
            "training_orchestrator_task_assignment_wait_seconds",
            "Time an AssignTask call spent waiting on the task queue before leasing or timing out",
        ))
        .unwrap();

        registry.register(Box::new(jobs_created.clone())).unwrap();
        registry.register(Box::new(jobs_completed.clone())).unwrap();
        registry.register(Box::new(jobs_cancelled.clone())).unwrap();
        registry.register(Box::new(task_completions.clone())).unwrap();
        registry.register(Box::new(active_jobs.clone())).unwrap();
        registry.register(Box::new(task_assignment_wait.clone())).unwrap();

        Self {
            jobs_created,
            jobs_completed,
            jobs_cancelled,
            task_completions,
            active_jobs,
            task_assignment_wait,
        }
    }
}

pub fn register_all() -> (Registry, Metrics) {
    let registry = Registry::new();
    let metrics = Metrics::register(&registry);
    (registry, metrics)
}
