//! Audit logging module for command execution
//!
//! Every execution attempt is appended as one JSON line. The trail is
//! write-only from the gateway's point of view: nothing here is read back to
//! make decisions, and a failed write never fails the request.

use super::command_executor::ExecutionResult;
use crate::approval::Decision;
use crate::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs::{create_dir_all, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::warn;
use uuid::Uuid;

/// Summary of an execution; output bodies are reduced to their sizes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeSummary {
    pub exit_code: Option<i32>,
    pub timed_out: bool,
    #[serde(default)]
    pub signal: Option<i32>,
    pub error: Option<String>,
    pub stdout_bytes: usize,
    pub stderr_bytes: usize,
}

impl From<&ExecutionResult> for OutcomeSummary {
    fn from(result: &ExecutionResult) -> Self {
        Self {
            exit_code: result.exit_code,
            timed_out: result.timed_out,
            signal: result.signal,
            error: result.error.clone(),
            stdout_bytes: result.stdout.len(),
            stderr_bytes: result.stderr.len(),
        }
    }
}

impl OutcomeSummary {
    /// Nothing ran; only an error message to report
    pub fn not_run(error: impl Into<String>) -> Self {
        Self {
            exit_code: None,
            timed_out: false,
            signal: None,
            error: Some(error.into()),
            stdout_bytes: 0,
            stderr_bytes: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub command: String,
    pub args: Vec<String>,
    pub decision: Decision,
    pub outcome: Option<OutcomeSummary>,
}

impl AuditEntry {
    pub fn new(
        command: impl Into<String>,
        args: &[String],
        decision: Decision,
        outcome: Option<OutcomeSummary>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            command: command.into(),
            args: args.to_vec(),
            decision,
            outcome,
        }
    }
}

/// Trait for audit log sinks
pub trait AuditSink: Send + Sync {
    /// Write one audit record
    async fn write(&self, entry: &AuditEntry) -> Result<()>;
}

/// Appends JSONL records to a single file
pub struct FileSink {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileSink {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AuditSink for FileSink {
    async fn write(&self, entry: &AuditEntry) -> Result<()> {
        let mut line = serde_json::to_string(entry)?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;

        if let Some(parent) = self.path.parent() {
            create_dir_all(parent).await?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;

        // One write per record keeps lines whole under O_APPEND
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;

        Ok(())
    }
}

/// Discards records (audit logging disabled)
pub struct NullSink;

impl AuditSink for NullSink {
    async fn write(&self, _entry: &AuditEntry) -> Result<()> {
        Ok(())
    }
}

/// Enum wrapper for audit sinks to enable dynamic dispatch with async methods
pub enum AuditSinkImpl {
    File(FileSink),
    Null(NullSink),
}

impl AuditSinkImpl {
    pub fn file(path: PathBuf) -> Self {
        AuditSinkImpl::File(FileSink::new(path))
    }

    /// Best-effort write: failures are logged and swallowed
    pub async fn record(&self, entry: &AuditEntry) {
        let written = match self {
            AuditSinkImpl::File(sink) => sink.write(entry).await,
            AuditSinkImpl::Null(sink) => sink.write(entry).await,
        };

        if let Err(e) = written {
            warn!("Failed to write audit entry for '{}': {}", entry.command, e);
        }
    }
}

/// Read audit entries back for display, skipping malformed lines
pub fn read_entries(path: &Path) -> Result<Vec<AuditEntry>> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    Ok(content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| match serde_json::from_str(line) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Skipping malformed audit line: {}", e);
                None
            }
        })
        .collect())
}
