//! The Job registry and Worker registry, sharing a single readers-writer
//! lock so that `ReportTaskCompletion` can atomically cross-mutate both a
//! Job's counters and a Worker's tally, and so that a completion arriving
//! for a terminal job can be safely rejected after re-reading status under
//! the same lock.

use crate::model::{Job, WorkerActivity};
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Default)]
pub struct OrchestratorState {
    pub jobs: HashMap<String, Job>,
    pub workers: HashMap<String, WorkerActivity>,
}

pub struct Registry {
    inner: RwLock<OrchestratorState>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(OrchestratorState::default()),
        }
    }

    pub async fn read(&self) -> tokio::sync::RwLockReadGuard<'_, OrchestratorState> {
        self.inner.read().await
    }

    pub async fn write(&self) -> tokio::sync::RwLockWriteGuard<'_, OrchestratorState> {
        self.inner.write().await
    }
}
