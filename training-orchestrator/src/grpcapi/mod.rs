//! gRPC server wiring: health checks, reflection and the single
//! `TrainingOrchestrator` service.

mod training;

pub use training::TrainingOrchestratorGrpcApi;

use crate::bootstrap::Services;
use std::net::SocketAddr;
use tonic::transport::{Error, Server};
use training_orchestrator_grpc::proto::training::v1::training_orchestrator_server::TrainingOrchestratorServer;
use training_orchestrator_grpc::proto::FILE_DESCRIPTOR_SET;

pub async fn start_grpc_server(addr: SocketAddr, services: &Services) -> Result<(), Error> {
    let (mut health_reporter, health_service) = tonic_health::server::health_reporter();
    health_reporter
        .set_serving::<TrainingOrchestratorServer<TrainingOrchestratorGrpcApi>>()
        .await;

    let reflection_service = tonic_reflection::server::Builder::configure()
        .register_encoded_file_descriptor_set(FILE_DESCRIPTOR_SET)
        .build_v1()
        .unwrap();

    let api = TrainingOrchestratorGrpcApi {
        job_service: services.job_service.clone(),
        worker_service: services.worker_service.clone(),
    };

    Server::builder()
        .add_service(reflection_service)
        .add_service(health_service)
        .add_service(TrainingOrchestratorServer::new(api))
        .serve(addr)
        .await
}
