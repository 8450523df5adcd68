use std::net::{Ipv4Addr, SocketAddrV4};
use std::process::ExitCode;

use tokio::select;
use tracing::{error, info};
use training_orchestrator::bootstrap::Services;
use training_orchestrator::config::make_config_loader;
use training_orchestrator::{grpcapi, init_tracing};

fn main() -> ExitCode {
    let config = match make_config_loader().load() {
        Ok(config) => config,
        Err(error) => {
            eprintln!("Configuration error: {error}");
            return ExitCode::FAILURE;
        }
    };

    init_tracing();

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            eprintln!("Failed to start the async runtime: {error}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(async_main(config)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            error!(%error, "training-orchestrator exited with an error");
            ExitCode::FAILURE
        }
    }
}

async fn async_main(config: training_orchestrator::config::OrchestratorConfig) -> Result<(), anyhow::Error> {
    info!("starting training-orchestrator with config:\n{}", config.to_safe_string());

    let services = Services::new(&config)?;
    let addr = SocketAddrV4::new(Ipv4Addr::new(0, 0, 0, 0), config.port).into();

    let grpc_server = tokio::spawn(async move { grpcapi::start_grpc_server(addr, &services).await });

    select! {
        result = grpc_server => {
            result??;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("received shutdown signal, stopping");
        }
    }

    Ok(())
}
