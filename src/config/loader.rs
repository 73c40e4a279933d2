use super::types::Settings;
use crate::io::GatewayPaths;
use crate::{GatewayError, Result};
use std::path::Path;
use tracing::debug;

/// Loads gateway settings from YAML
pub struct SettingsLoader;

impl SettingsLoader {
    /// Load settings for the given paths.
    ///
    /// An explicit file must exist and parse. The default `config.yml` is optional;
    /// when absent the built-in defaults apply.
    pub fn load(paths: &GatewayPaths, explicit: Option<&Path>) -> Result<Settings> {
        let settings = match explicit {
            Some(path) => Self::load_file(path)?,
            None => {
                let default_path = paths.config_file();
                if default_path.exists() {
                    Self::load_file(&default_path)?
                } else {
                    debug!("No config file at {}, using defaults", default_path.display());
                    Settings::default()
                }
            }
        };

        Self::validate(&settings)?;
        Ok(settings)
    }

    /// Parse a single settings file
    pub fn load_file(path: &Path) -> Result<Settings> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            GatewayError::Config(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        // An empty file is a valid "all defaults" config
        if contents.trim().is_empty() {
            return Ok(Settings::default());
        }

        let settings: Settings = serde_yaml_ng::from_str(&contents).map_err(|e| {
            GatewayError::Config(format!(
                "Failed to parse config file {}: {}",
                path.display(),
                e
            ))
        })?;

        debug!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    fn validate(settings: &Settings) -> Result<()> {
        if settings.timeout_seconds == 0 {
            return Err(GatewayError::Config(
                "timeout_seconds must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
