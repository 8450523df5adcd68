pub mod bootstrap;
pub mod config;
pub mod error;
pub mod grpcapi;
pub mod metrics;
pub mod model;
pub mod queue;
pub mod service;
pub mod state;

#[cfg(test)]
test_r::enable!();

use tracing_subscriber::EnvFilter;

/// Initializes the global `tracing` subscriber from `RUST_LOG`, defaulting
/// to `info` when unset.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .init();
}
