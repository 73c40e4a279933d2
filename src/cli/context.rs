//! Startup wiring shared by every subcommand

use crate::approval::{ApprovalPrompter, ApprovalStore, DenyPrompter, TerminalPrompter};
use crate::config::{PromptMode, Settings, SettingsLoader};
use crate::engine::Gateway;
use crate::io::GatewayPaths;
use crate::{GatewayError, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Resolved paths and settings for one invocation
#[derive(Debug, Clone)]
pub struct GatewayContext {
    pub paths: GatewayPaths,
    pub settings: Settings,
}

impl GatewayContext {
    /// Resolve the config directory, create it, and load settings.
    ///
    /// Any failure here is a startup failure.
    pub fn load(
        config_dir: Option<&Path>,
        config_file: Option<&Path>,
        timeout: Option<u64>,
    ) -> Result<Self> {
        let paths = GatewayPaths::resolve(config_dir)?;
        paths.ensure_directories()?;

        let mut settings = SettingsLoader::load(&paths, config_file)?;
        if let Some(secs) = timeout {
            if secs == 0 {
                return Err(GatewayError::Config(
                    "--timeout must be greater than zero".to_string(),
                ));
            }
            settings.timeout_seconds = secs;
        }

        debug!(
            "Using config directory {} (timeout {}s)",
            paths.config_dir.display(),
            settings.timeout_seconds
        );
        Ok(Self { paths, settings })
    }

    pub fn approvals_file(&self) -> PathBuf {
        self.settings.approvals_path(&self.paths)
    }

    pub fn audit_file(&self) -> PathBuf {
        self.settings.audit_path(&self.paths)
    }

    pub fn store(&self) -> ApprovalStore {
        ApprovalStore::open(self.approvals_file())
    }

    pub fn prompter(&self) -> Arc<dyn ApprovalPrompter> {
        match self.settings.approval_prompt {
            PromptMode::Tty => Arc::new(TerminalPrompter::new()),
            PromptMode::Deny => Arc::new(DenyPrompter),
        }
    }

    pub fn gateway(&self) -> Gateway {
        Gateway::from_settings(&self.paths, &self.settings, self.prompter())
    }
}
