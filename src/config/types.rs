use crate::io::GatewayPaths;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default wall-clock bound for a spawned command
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 300;

/// Which collaborator answers approval requests for unknown commands
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PromptMode {
    /// Ask the human on the controlling terminal
    #[default]
    Tty,
    /// Answer "deny" to everything not already approved
    Deny,
}

/// Gateway settings, loaded from config.yml
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Default execution timeout in seconds
    pub timeout_seconds: u64,

    /// Write the JSONL audit trail
    pub audit_logging: bool,

    /// Approval collaborator used by the server
    pub approval_prompt: PromptMode,

    /// Override for the approvals file location
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approvals_file: Option<PathBuf>,

    /// Override for the audit log location
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audit_file: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            audit_logging: true,
            approval_prompt: PromptMode::default(),
            approvals_file: None,
            audit_file: None,
        }
    }
}

impl Settings {
    pub fn approvals_path(&self, paths: &GatewayPaths) -> PathBuf {
        self.approvals_file
            .clone()
            .unwrap_or_else(|| paths.approvals_file())
    }

    pub fn audit_path(&self, paths: &GatewayPaths) -> PathBuf {
        self.audit_file.clone().unwrap_or_else(|| paths.audit_file())
    }
}
