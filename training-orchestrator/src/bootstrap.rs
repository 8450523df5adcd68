//! Wires concrete implementations behind the service traits and hands back
//! a ready-to-serve bundle for the gRPC layer to mount.

use crate::config::OrchestratorConfig;
use crate::metrics::{self, Metrics};
use crate::queue::TaskQueue;
use crate::service::autosave::{AutoSaveClient, HttpAutoSaveClient};
use crate::service::durable::{DurableStore, RedisDurableStore};
use crate::service::job::{JobService, JobServiceDefault};
use crate::service::worker::{WorkerActivityService, WorkerActivityServiceDefault};
use crate::state::Registry;
use prometheus::Registry as PrometheusRegistry;
use std::sync::Arc;

#[derive(Clone)]
pub struct Services {
    pub job_service: Arc<dyn JobService>,
    pub worker_service: Arc<dyn WorkerActivityService>,
    pub durable_store: Arc<dyn DurableStore>,
    pub autosave_client: Arc<dyn AutoSaveClient>,
    pub prometheus_registry: PrometheusRegistry,
    pub metrics: Arc<Metrics>,
}

impl Services {
    pub fn new(config: &OrchestratorConfig) -> Result<Self, anyhow::Error> {
        let (prometheus_registry, metrics) = metrics::register_all();
        let metrics = Arc::new(metrics);

        let registry = Arc::new(Registry::new());
        let queue = TaskQueue::bounded(config.constants.task_queue_capacity);

        let durable_store: Arc<dyn DurableStore> =
            Arc::new(RedisDurableStore::connect(&config.redis_addr)?);

        let autosave_client: Arc<dyn AutoSaveClient> = Arc::new(HttpAutoSaveClient::new(
            config.storage_service_url.clone(),
            config.constants.autosave_client_timeout,
        ));

        let job_service: Arc<dyn JobService> = Arc::new(JobServiceDefault::new(
            registry.clone(),
            queue.clone(),
            durable_store.clone(),
            autosave_client.clone(),
            metrics.clone(),
            config.constants.batches_per_epoch,
            config.constants.batch_stride,
            config.constants.snapshot_ttl,
        ));

        let worker_service: Arc<dyn WorkerActivityService> =
            Arc::new(WorkerActivityServiceDefault::new(
                registry,
                queue,
                metrics.clone(),
                config.constants.assign_task_lease_timeout,
            ));

        Ok(Self {
            job_service,
            worker_service,
            durable_store,
            autosave_client,
            prometheus_registry,
            metrics,
        })
    }
}
