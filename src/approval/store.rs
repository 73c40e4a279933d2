//! Durable approval store.
//!
//! The JSON file is the single source of truth. Every mutation persists the
//! complete updated mapping before touching the in-memory cache, and the whole
//! read-modify-persist-refresh sequence runs under one lock. Async callers
//! use the `*_async` variants so the fsync happens on the blocking pool.

use super::identity::CommandIdentity;
use crate::{GatewayError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

/// Approval state of a stored record
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    #[default]
    Approved,
}

/// Persistent grant of trust for one identity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApprovalRecord {
    #[serde(default)]
    pub status: ApprovalStatus,
    pub approved_at: DateTime<Utc>,
}

impl ApprovalRecord {
    /// A fresh approval stamped with the current time
    pub fn approved_now() -> Self {
        Self {
            status: ApprovalStatus::Approved,
            approved_at: Utc::now(),
        }
    }
}

pub type ApprovalMap = BTreeMap<CommandIdentity, ApprovalRecord>;

pub struct ApprovalStore {
    path: PathBuf,
    records: Mutex<ApprovalMap>,
}

impl ApprovalStore {
    /// Open the store backed by `path`.
    ///
    /// A missing, unreadable or corrupt file yields an empty store; the fault
    /// is logged rather than returned.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let records = load_records(&path);
        debug!(
            "Loaded {} approval(s) from {}",
            records.len(),
            path.display()
        );
        Self {
            path,
            records: Mutex::new(records),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, identity: &CommandIdentity) -> Option<ApprovalRecord> {
        self.lock().get(identity).cloned()
    }

    /// Insert or wholly replace the record for `identity`
    pub fn put(&self, identity: CommandIdentity, record: ApprovalRecord) -> Result<()> {
        let mut records = self.lock();
        let mut updated = records.clone();
        updated.insert(identity.clone(), record);

        persist_records(&self.path, &updated)?;
        *records = updated;

        info!(target: "security", "Approved command '{}'", identity);
        Ok(())
    }

    /// Remove the record for `identity`; `false` when there was none
    pub fn remove(&self, identity: &CommandIdentity) -> Result<bool> {
        let mut records = self.lock();
        if !records.contains_key(identity) {
            return Ok(false);
        }

        let mut updated = records.clone();
        updated.remove(identity);

        persist_records(&self.path, &updated)?;
        *records = updated;

        info!(target: "security", "Revoked approval for '{}'", identity);
        Ok(true)
    }

    pub fn list(&self) -> ApprovalMap {
        self.lock().clone()
    }

    /// [`put`](Self::put) on the blocking pool, for callers on the async runtime
    pub async fn put_async(
        self: &Arc<Self>,
        identity: CommandIdentity,
        record: ApprovalRecord,
    ) -> Result<()> {
        let store = Arc::clone(self);
        self.run_blocking(move || store.put(identity, record)).await
    }

    /// [`remove`](Self::remove) on the blocking pool
    pub async fn remove_async(self: &Arc<Self>, identity: CommandIdentity) -> Result<bool> {
        let store = Arc::clone(self);
        self.run_blocking(move || store.remove(&identity)).await
    }

    async fn run_blocking<T, F>(&self, mutation: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T> + Send + 'static,
    {
        tokio::task::spawn_blocking(mutation)
            .await
            .map_err(|e| GatewayError::Store {
                path: self.path.clone(),
                source: std::io::Error::other(e),
            })?
    }

    fn lock(&self) -> MutexGuard<'_, ApprovalMap> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn load_records(path: &Path) -> ApprovalMap {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return ApprovalMap::new(),
        Err(e) => {
            warn!(
                "Failed to read approvals from {}: {}; starting empty",
                path.display(),
                e
            );
            return ApprovalMap::new();
        }
    };

    match serde_json::from_str(&content) {
        Ok(records) => records,
        Err(e) => {
            warn!(
                "Approvals file {} is corrupt ({}); starting empty",
                path.display(),
                e
            );
            ApprovalMap::new()
        }
    }
}

/// Atomically replace the approvals file with `records`
fn persist_records(path: &Path, records: &ApprovalMap) -> Result<()> {
    let store_err = |source: std::io::Error| GatewayError::Store {
        path: path.to_path_buf(),
        source,
    };

    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent).map_err(store_err)?;

    let json = serde_json::to_string_pretty(records)?;

    let mut tmp = tempfile::NamedTempFile::new_in(parent).map_err(store_err)?;
    tmp.write_all(json.as_bytes()).map_err(store_err)?;
    tmp.write_all(b"\n").map_err(store_err)?;
    tmp.as_file().sync_all().map_err(store_err)?;
    tmp.persist(path).map_err(|e| store_err(e.error))?;

    Ok(())
}
