//! Registry of processes spawned by the executor and still running

use super::Command;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunningProcess {
    pub pid: u32,
    pub program: String,
    pub args: Vec<String>,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct ProcessRegistry {
    inner: Arc<Mutex<BTreeMap<u32, RunningProcess>>>,
}

impl ProcessRegistry {
    /// Record `pid` until the returned guard is dropped
    pub fn track(&self, pid: u32, command: &Command) -> TrackedProcess {
        self.lock().insert(
            pid,
            RunningProcess {
                pid,
                program: command.program.clone(),
                args: command.args.clone(),
                started_at: Utc::now(),
            },
        );
        TrackedProcess {
            registry: self.clone(),
            pid,
        }
    }

    pub fn snapshot(&self) -> Vec<RunningProcess> {
        self.lock().values().cloned().collect()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<u32, RunningProcess>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Removes its pid from the registry on drop
pub struct TrackedProcess {
    registry: ProcessRegistry,
    pid: u32,
}

impl Drop for TrackedProcess {
    fn drop(&mut self) {
        self.registry.lock().remove(&self.pid);
    }
}
