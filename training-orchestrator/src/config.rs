//! Process configuration, loaded via `figment` with environment overrides.
//!
//! A plain `serde`-deserializable struct with a `Default` impl supplying
//! sensible defaults, loaded from an optional TOML file merged with
//! `ORCHESTRATOR_`-prefixed environment variables.

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// gRPC listen port. Env `PORT`, default 50051.
    pub port: u16,
    /// Durable key-value store address (`host:port`). Env `REDIS_ADDR`.
    pub redis_addr: String,
    /// Base URL of the storage collaborator. Env `STORAGE_SERVICE_URL`.
    pub storage_service_url: String,
    pub constants: DesignConstants,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DesignConstants {
    pub batches_per_epoch: u32,
    pub batch_stride: u32,
    pub task_queue_capacity: usize,
    #[serde(with = "humantime_serde")]
    pub assign_task_lease_timeout: Duration,
    #[serde(with = "humantime_serde")]
    pub snapshot_ttl: Duration,
    #[serde(with = "humantime_serde")]
    pub autosave_client_timeout: Duration,
}

impl Default for DesignConstants {
    fn default() -> Self {
        Self {
            batches_per_epoch: crate::model::DEFAULT_BATCHES_PER_EPOCH,
            batch_stride: crate::model::DEFAULT_BATCH_STRIDE,
            task_queue_capacity: 1000,
            assign_task_lease_timeout: Duration::from_secs(5),
            snapshot_ttl: Duration::from_secs(24 * 60 * 60),
            autosave_client_timeout: Duration::from_secs(30),
        }
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            port: 50051,
            redis_addr: "redis:6379".to_string(),
            storage_service_url: "http://storage:8081".to_string(),
            constants: DesignConstants::default(),
        }
    }
}

impl OrchestratorConfig {
    /// Human-readable summary written to the log on startup. Nothing in
    /// this config is a secret, so this prints in full.
    pub fn to_safe_string(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(&mut out, "port: {}", self.port);
        let _ = writeln!(&mut out, "redis_addr: {}", self.redis_addr);
        let _ = writeln!(&mut out, "storage_service_url: {}", self.storage_service_url);
        let _ = writeln!(
            &mut out,
            "constants: batches_per_epoch={} batch_stride={} queue_capacity={} lease_timeout={:?} snapshot_ttl={:?} autosave_timeout={:?}",
            self.constants.batches_per_epoch,
            self.constants.batch_stride,
            self.constants.task_queue_capacity,
            self.constants.assign_task_lease_timeout,
            self.constants.snapshot_ttl,
            self.constants.autosave_client_timeout,
        );
        out
    }
}

/// Loads `OrchestratorConfig` from an optional TOML file merged with
/// `ORCHESTRATOR_`-prefixed env vars, falling back to `Default` values for
/// anything unset. A missing config file is not an error.
pub struct ConfigLoader {
    config_file: PathBuf,
}

impl ConfigLoader {
    pub fn new(config_file: &Path) -> Self {
        Self {
            config_file: config_file.to_path_buf(),
        }
    }

    pub fn load(&self) -> figment::Result<OrchestratorConfig> {
        Figment::from(Serialized::defaults(OrchestratorConfig::default()))
            .merge(Toml::file(&self.config_file).nested())
            .merge(Env::prefixed("ORCHESTRATOR_").split("_"))
            .extract()
    }
}

pub fn make_config_loader() -> ConfigLoader {
    let path = std::env::var("ORCHESTRATOR_CONFIG")
        .unwrap_or_else(|_| "config/orchestrator.toml".to_string());
    ConfigLoader::new(&PathBuf::from(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_load_without_a_config_file() {
        let loader = ConfigLoader::new(&PathBuf::from("/nonexistent/orchestrator.toml"));
        let config = loader.load().expect("defaults should always load");
        assert_eq!(config.port, 50051);
        assert_eq!(config.constants.batches_per_epoch, 10);
    }

    #[test]
    fn toml_file_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "port = 9000\nredis_addr = \"cache:6380\"").unwrap();

        let loader = ConfigLoader::new(file.path());
        let config = loader.load().expect("file-backed config should load");
        assert_eq!(config.port, 9000);
        assert_eq!(config.redis_addr, "cache:6380");
        // unset fields keep their defaults
        assert_eq!(config.constants.batch_stride, 100);
    }
}
