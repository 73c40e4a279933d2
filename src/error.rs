use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    JsonSerialization(#[from] serde_json::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    #[error("Path error: {0}")]
    Path(String),

    #[error("Configuration error: {0}")]
    Config(String),

    /// Persisting the approval store failed. The in-memory view is left untouched.
    #[error("Failed to persist approvals to {path}: {source}")]
    Store {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Approval could not be obtained: {0}")]
    Prompt(String),

    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    /// The MCP session could not be established or ended abnormally
    #[error("MCP transport error: {0}")]
    Transport(String),
}

pub type Result<T> = std::result::Result<T, GatewayError>;
