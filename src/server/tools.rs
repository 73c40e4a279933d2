//! Tool and resource surface exposed to MCP clients

use rmcp::model::{object, JsonObject, RawResource, Resource, Tool};
use rmcp::ErrorData as McpError;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::borrow::Cow;
use std::sync::Arc;
use std::time::Duration;

pub const EXECUTE_COMMAND: &str = "execute_command";
pub const REVOKE_COMMAND_APPROVAL: &str = "revoke_command_approval";
pub const RUN_IN_VENV: &str = "run_in_venv";

pub const APPROVED_COMMANDS_URI: &str = "commands://approved";
pub const PROCESS_STATUS_URI: &str = "process://status";

#[derive(Debug, Deserialize, PartialEq)]
pub struct ExecuteCommandArgs {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    /// Seconds; overrides the configured default
    #[serde(default)]
    pub timeout: Option<u64>,
}

#[derive(Debug, Deserialize, PartialEq)]
pub struct RevokeCommandApprovalArgs {
    pub command: String,
}

#[derive(Debug, Deserialize, PartialEq)]
pub struct RunInVenvArgs {
    pub venv_path: String,
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub timeout: Option<u64>,
}

/// Decode tool arguments; absent arguments decode like an empty object
pub fn parse_arguments<T: DeserializeOwned>(
    tool: &str,
    arguments: Option<JsonObject>,
) -> Result<T, McpError> {
    serde_json::from_value(Value::Object(arguments.unwrap_or_default())).map_err(|e| {
        McpError::invalid_params(format!("invalid arguments for {tool}: {e}"), None)
    })
}

/// Validate an optional timeout argument
pub fn timeout_from_secs(timeout: Option<u64>) -> Result<Option<Duration>, McpError> {
    match timeout {
        Some(0) => Err(McpError::invalid_params(
            "timeout must be greater than zero",
            Some(json!({ "timeout": 0 })),
        )),
        Some(secs) => Ok(Some(Duration::from_secs(secs))),
        None => Ok(None),
    }
}

fn tool(name: &'static str, description: &'static str, schema: Value) -> Tool {
    Tool::new(
        Cow::Borrowed(name),
        Cow::Borrowed(description),
        Arc::new(object(schema)),
    )
}

pub fn tool_definitions() -> Vec<Tool> {
    vec![
        tool(
            EXECUTE_COMMAND,
            "Run a program with arguments after user approval. The program is started directly, never through a shell.",
            json!({
                "type": "object",
                "properties": {
                    "command": { "type": "string", "description": "Program to run, optionally followed by leading arguments" },
                    "args": { "type": "array", "items": { "type": "string" }, "default": [] },
                    "timeout": { "type": "integer", "minimum": 1, "description": "Timeout in seconds" }
                },
                "required": ["command"]
            }),
        ),
        tool(
            REVOKE_COMMAND_APPROVAL,
            "Forget a remembered approval so the command prompts again.",
            json!({
                "type": "object",
                "properties": {
                    "command": { "type": "string" }
                },
                "required": ["command"]
            }),
        ),
        tool(
            RUN_IN_VENV,
            "Run a program inside a Python virtual environment after user approval.",
            json!({
                "type": "object",
                "properties": {
                    "venv_path": { "type": "string", "description": "Path to the virtual environment" },
                    "command": { "type": "string" },
                    "args": { "type": "array", "items": { "type": "string" }, "default": [] },
                    "timeout": { "type": "integer", "minimum": 1 }
                },
                "required": ["venv_path", "command"]
            }),
        ),
    ]
}

fn resource(uri: &str, name: &str, description: &str, mime_type: &str) -> Resource {
    Resource::new(
        RawResource {
            uri: uri.to_string(),
            name: name.to_string(),
            title: None,
            description: Some(description.to_string()),
            mime_type: Some(mime_type.to_string()),
            size: None,
            icons: None,
            meta: None,
        },
        None,
    )
}

pub fn resource_definitions() -> Vec<Resource> {
    vec![
        resource(
            APPROVED_COMMANDS_URI,
            "Approved commands",
            "Commands approved with \"allow and remember\" and when they were approved",
            "application/json",
        ),
        resource(
            PROCESS_STATUS_URI,
            "Process status",
            "Commands currently running",
            "text/plain",
        ),
    ]
}
