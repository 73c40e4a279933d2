//! MCP server over stdio
//!
//! Framing, the initialize handshake and request ids are handled by `rmcp`.
//! This module maps tool calls and resource reads onto the [`Gateway`].
//! Requests may be in flight concurrently; a call waiting on the approval
//! prompt does not hold up resource reads.

pub mod tools;

use crate::engine::gateway::{ExecutionRequest, Gateway, VenvRequest};
use crate::engine::response::{format_approvals, format_outcome, format_running, revoke_message};
use crate::engine::ToolOutput;
use crate::{GatewayError, Result};
use rmcp::model::{
    CallToolRequestParam, CallToolResult, Content, Implementation, JsonObject,
    ListResourcesResult, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
    ReadResourceRequestParam, ReadResourceResult, ResourceContents, ServerCapabilities,
    ServerInfo,
};
use rmcp::service::RequestContext;
use rmcp::transport::stdio;
use rmcp::{ErrorData as McpError, RoleServer, ServerHandler, ServiceExt};
use serde_json::json;
use std::path::PathBuf;
use tools::{ExecuteCommandArgs, RevokeCommandApprovalArgs, RunInVenvArgs};
use tracing::{debug, info};

pub const SERVER_NAME: &str = "execgate";

pub struct McpServer {
    gateway: Gateway,
}

impl McpServer {
    pub fn new(gateway: Gateway) -> Self {
        Self { gateway }
    }

    /// Serve on the process's stdin/stdout until the client disconnects
    pub async fn run_stdio(self) -> Result<()> {
        info!("MCP server listening on stdio");
        let running = self
            .serve(stdio())
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        running
            .waiting()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        info!("Client closed the connection");
        Ok(())
    }

    async fn call(
        &self,
        name: &str,
        arguments: Option<JsonObject>,
    ) -> std::result::Result<ToolOutput, McpError> {
        match name {
            tools::EXECUTE_COMMAND => {
                let args: ExecuteCommandArgs = tools::parse_arguments(name, arguments)?;
                let timeout = tools::timeout_from_secs(args.timeout)?;
                let outcome = self
                    .gateway
                    .execute(ExecutionRequest {
                        command: args.command,
                        args: args.args,
                        timeout,
                    })
                    .await;
                Ok(format_outcome(&outcome))
            }
            tools::REVOKE_COMMAND_APPROVAL => {
                let args: RevokeCommandApprovalArgs = tools::parse_arguments(name, arguments)?;
                Ok(match self.gateway.revoke(&args.command).await {
                    Ok((identity, removed)) => ToolOutput::ok(revoke_message(&identity, removed)),
                    Err(e) => ToolOutput::error(format!("Error: {e}")),
                })
            }
            tools::RUN_IN_VENV => {
                let args: RunInVenvArgs = tools::parse_arguments(name, arguments)?;
                let timeout = tools::timeout_from_secs(args.timeout)?;
                let outcome = self
                    .gateway
                    .run_in_venv(VenvRequest {
                        venv_path: PathBuf::from(args.venv_path),
                        command: args.command,
                        args: args.args,
                        timeout,
                    })
                    .await;
                Ok(format_outcome(&outcome))
            }
            other => Err(McpError::invalid_params(
                format!("unknown tool: {other}"),
                None,
            )),
        }
    }

    fn read(&self, uri: &str) -> std::result::Result<ResourceContents, McpError> {
        let (mime_type, text) = match uri {
            tools::APPROVED_COMMANDS_URI => (
                "application/json",
                format_approvals(&self.gateway.approvals())
                    .map_err(|e| McpError::internal_error(e.to_string(), None))?,
            ),
            tools::PROCESS_STATUS_URI => ("text/plain", format_running(&self.gateway.running())),
            other => {
                return Err(McpError::resource_not_found(
                    "resource_not_found",
                    Some(json!({ "uri": other })),
                ))
            }
        };

        Ok(ResourceContents::TextResourceContents {
            uri: uri.to_string(),
            mime_type: Some(mime_type.to_string()),
            text,
            meta: None,
        })
    }
}

fn tool_result(output: ToolOutput) -> CallToolResult {
    let content = vec![Content::text(output.text)];
    if output.is_error {
        CallToolResult::error(content)
    } else {
        CallToolResult::success(content)
    }
}

impl ServerHandler for McpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_06_18,
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_resources()
                .build(),
            server_info: Implementation {
                name: SERVER_NAME.to_string(),
                title: Some("execgate command gateway".to_string()),
                version: env!("CARGO_PKG_VERSION").to_string(),
                description: None,
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Runs programs on this machine after a human approves them. Commands are never passed through a shell."
                    .to_string(),
            ),
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> std::result::Result<ListToolsResult, McpError> {
        Ok(ListToolsResult {
            tools: tools::tool_definitions(),
            next_cursor: None,
            meta: None,
        })
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> std::result::Result<CallToolResult, McpError> {
        debug!("tools/call {}", request.name);
        self.call(&request.name, request.arguments)
            .await
            .map(tool_result)
    }

    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> std::result::Result<ListResourcesResult, McpError> {
        Ok(ListResourcesResult {
            resources: tools::resource_definitions(),
            next_cursor: None,
            meta: None,
        })
    }

    async fn read_resource(
        &self,
        request: ReadResourceRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> std::result::Result<ReadResourceResult, McpError> {
        debug!("resources/read {}", request.uri);
        Ok(ReadResourceResult {
            contents: vec![self.read(&request.uri)?],
        })
    }
}
