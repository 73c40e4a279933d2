use crate::{GatewayError, Result};
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

const APPROVALS_FILE: &str = "approved_commands.json";
const AUDIT_FILE: &str = "audit.log";
const CONFIG_FILE: &str = "config.yml";

/// Path management for the gateway's per-user state
#[derive(Debug, Clone)]
pub struct GatewayPaths {
    /// Configuration directory holding approvals, audit log and settings
    pub config_dir: PathBuf,
}

impl GatewayPaths {
    /// Create new paths instance using standard directories
    pub fn new() -> Result<Self> {
        let dirs = ProjectDirs::from("", "", "execgate").ok_or_else(|| {
            GatewayError::Path("Failed to determine project directories".to_string())
        })?;

        Ok(Self {
            config_dir: dirs.config_dir().to_path_buf(),
        })
    }

    /// Create paths rooted at an explicit directory
    pub fn for_dir(config_dir: &Path) -> Self {
        Self {
            config_dir: config_dir.to_path_buf(),
        }
    }

    /// Resolve from an optional CLI override, falling back to platform directories
    pub fn resolve(override_dir: Option<&Path>) -> Result<Self> {
        match override_dir {
            Some(dir) => Ok(Self::for_dir(dir)),
            None => Self::new(),
        }
    }

    /// JSON file mapping command identity to approval record
    pub fn approvals_file(&self) -> PathBuf {
        self.config_dir.join(APPROVALS_FILE)
    }

    /// Append-only JSONL audit trail
    pub fn audit_file(&self) -> PathBuf {
        self.config_dir.join(AUDIT_FILE)
    }

    /// Optional YAML settings file
    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE)
    }

    /// Ensure the config directory exists
    pub fn ensure_directories(&self) -> Result<()> {
        std::fs::create_dir_all(&self.config_dir).map_err(|e| {
            GatewayError::Path(format!(
                "Failed to create config directory {}: {}",
                self.config_dir.display(),
                e
            ))
        })
    }
}
